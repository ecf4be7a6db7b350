//! Error taxonomy for the remediation pipeline.

/// Errors surfaced by the remediation pipeline. Every failing step aborts
/// the whole request with one of these; callers never receive a partial
/// response.
#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    /// A safety policy rejected the request (disallowed repository URL,
    /// oversized clone).
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("repository not found: {0}")]
    NotFound(String),

    /// Missing or invalid GitHub App credentials, or a failed token
    /// exchange.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// A GitHub API call returned a non-success response.
    #[error("github api call failed: {0}")]
    ProviderApi(String),

    /// A local git operation (clone, commit, push, diff) failed.
    #[error("git operation failed: {0}")]
    LocalGit(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for remediation operations.
pub type Result<T> = std::result::Result<T, RemediationError>;
