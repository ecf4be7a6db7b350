//! GitHub integration: repository URL policy, App authentication and the
//! REST client used to open pull requests.

pub mod app_auth;
pub mod client;

use crate::error::{RemediationError, Result};

const ALLOWED_PREFIX: &str = "https://github.com/";

/// Policy gate: remediation only touches HTTPS `github.com` repositories
/// whose URL ends in `.git`.
pub fn ensure_allowed_url(url: &str) -> Result<()> {
    let lower = url.trim().to_lowercase();
    if !lower.starts_with(ALLOWED_PREFIX) || !lower.ends_with(".git") {
        return Err(RemediationError::PolicyViolation(format!(
            "only https github.com repositories ending in .git are supported, got {}",
            url.trim()
        )));
    }
    Ok(())
}

/// Split a repository URL into its owner and repository name.
pub fn parse_owner_repo(url: &str) -> Result<(String, String)> {
    let rest = url
        .trim()
        .strip_prefix(ALLOWED_PREFIX)
        .ok_or_else(|| invalid_url(url))?;
    let mut parts = rest.split('/');
    let owner = parts.next().unwrap_or("").trim();
    let repo = parts.next().unwrap_or("").trim();
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return Err(invalid_url(url));
    }
    Ok((owner.to_string(), repo.to_string()))
}

fn invalid_url(url: &str) -> RemediationError {
    RemediationError::PolicyViolation(format!("invalid github repository url: {}", url.trim()))
}
