//! GitHub App authentication: a short-lived RS256 assertion signed with
//! the app's RSA private key, exchanged for an installation token by the
//! client.

use std::fs;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey};
use openssl::sign::Signer;

use crate::error::{RemediationError, Result};
use crate::settings::GitHubSettings;

/// Allowance for clock skew between us and the provider.
const IAT_SKEW_SECS: i64 = 30;
/// Assertion lifetime counted from the skewed issued-at.
const VALIDITY_SECS: i64 = 570;

/// GitHub App identity: numeric app and installation ids plus the RSA
/// private key PEM (PKCS#1 or PKCS#8 container, both accepted).
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub installation_id: String,
    private_key_pem: String,
}

impl AppCredentials {
    pub fn new(
        app_id: impl Into<String>,
        installation_id: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            installation_id: installation_id.into(),
            private_key_pem: private_key_pem.into(),
        }
    }

    /// Build credentials from settings, reading the key file if the PEM
    /// is not configured inline. Fails when anything is missing or the
    /// ids are not numeric.
    pub fn from_settings(settings: &GitHubSettings) -> Result<Self> {
        let app_id = settings.app_id.trim().to_string();
        let installation_id = settings.installation_id.trim().to_string();

        let mut pem = settings.private_key_pem.clone();
        if pem.trim().is_empty() && !settings.private_key_path.trim().is_empty() {
            pem = fs::read_to_string(settings.private_key_path.trim()).map_err(|e| {
                RemediationError::AuthFailure(format!(
                    "cannot read private key file {}: {e}",
                    settings.private_key_path.trim()
                ))
            })?;
        }

        if app_id.is_empty() || installation_id.is_empty() || pem.trim().is_empty() {
            return Err(RemediationError::AuthFailure(
                "missing github app credentials (app id, installation id, private key)".to_string(),
            ));
        }
        if app_id.parse::<i64>().is_err() {
            return Err(RemediationError::AuthFailure(
                "github app id must be numeric".to_string(),
            ));
        }
        if installation_id.parse::<i64>().is_err() {
            return Err(RemediationError::AuthFailure(
                "github installation id must be numeric".to_string(),
            ));
        }

        Ok(Self {
            app_id,
            installation_id,
            private_key_pem: pem,
        })
    }
}

/// Build the signed app assertion `header.claims.signature`, every segment
/// base64url-encoded without padding, signed RSA-SHA256.
pub fn sign_app_jwt(creds: &AppCredentials) -> Result<String> {
    let key = PKey::private_key_from_pem(creds.private_key_pem.as_bytes())
        .map_err(|e| RemediationError::AuthFailure(format!("invalid private key pem: {e}")))?;
    if key.id() != Id::RSA {
        return Err(RemediationError::AuthFailure(
            "private key is not RSA".to_string(),
        ));
    }

    let now = Utc::now().timestamp();
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"iat":{},"exp":{},"iss":"{}"}}"#,
        now - IAT_SKEW_SECS,
        now - IAT_SKEW_SECS + VALIDITY_SECS,
        creds.app_id
    ));
    let signing_input = format!("{header}.{claims}");

    let mut signer = Signer::new(MessageDigest::sha256(), &key)
        .map_err(|e| RemediationError::AuthFailure(format!("signer init failed: {e}")))?;
    signer
        .update(signing_input.as_bytes())
        .map_err(|e| RemediationError::AuthFailure(format!("signing failed: {e}")))?;
    let signature = signer
        .sign_to_vec()
        .map_err(|e| RemediationError::AuthFailure(format!("signing failed: {e}")))?;

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}
