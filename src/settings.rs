//! Runtime configuration, layered: built-in defaults, then an optional
//! `fixlink.toml` next to the working directory, then `FIXLINK_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `FIXLINK_GITHUB__APP_ID`).

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub github: GitHubSettings,
    pub limits: Limits,
    pub store: StoreSettings,
}

/// GitHub App identity. All fields default to empty; a dry-run never reads
/// them, a confirmed run fails with an auth error if they are missing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSettings {
    pub app_id: String,
    pub installation_id: String,
    /// RSA private key in PEM form (PKCS#1 or PKCS#8).
    pub private_key_pem: String,
    /// Alternative to `private_key_pem`: path to a PEM file on disk.
    pub private_key_path: String,
    /// REST API base URL. Only overridden in tests.
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    /// Abort when the clone's regular files exceed this many megabytes.
    pub max_repo_mb: u64,
    pub clone_timeout_secs: u64,
    pub http_timeout_secs: u64,
    /// Diff bytes included in a pull request body before truncation.
    pub pr_diff_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let default_data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fixlink");

        let cfg = Config::builder()
            .set_default("github.app_id", "")?
            .set_default("github.installation_id", "")?
            .set_default("github.private_key_pem", "")?
            .set_default("github.private_key_path", "")?
            .set_default("github.api_base", "https://api.github.com")?
            .set_default("limits.max_repo_mb", 350u64)?
            .set_default("limits.clone_timeout_secs", 180u64)?
            .set_default("limits.http_timeout_secs", 25u64)?
            .set_default("limits.pr_diff_limit", 8000u64)?
            .set_default("store.data_dir", default_data_dir.to_string_lossy().to_string())?
            .add_source(File::with_name("fixlink").required(false))
            .add_source(Environment::with_prefix("FIXLINK").separator("__"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}
