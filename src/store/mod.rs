//! Storage seam for the pipeline. Findings are consumed read-only from a
//! store; one remediation record is persisted per request regardless of
//! outcome. Backends: a JSON-file store for the CLI and an in-memory fake
//! for tests.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::patch::Finding;

/// A repository registered for remediation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub id: String,
    pub url: String,
    pub added_at: DateTime<Utc>,
}

impl RepoRecord {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            added_at: Utc::now(),
        }
    }
}

/// A finding as persisted by the external scan adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFinding {
    pub tool: String,
    pub title: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub line_start: usize,
    pub recorded_at: DateTime<Utc>,
}

impl StoredFinding {
    pub fn to_finding(&self) -> Finding {
        Finding {
            tool: self.tool.clone(),
            title: self.title.clone(),
            file_path: self.file_path.clone(),
            line_start: self.line_start,
        }
    }
}

/// Outcome of one remediation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationRecord {
    pub repo_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    pub diff_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence used by the orchestrator.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a registered repository. `NotFound` when unknown.
    async fn repo(&self, repo_id: &str) -> Result<RepoRecord>;

    async fn add_repo(&self, record: RepoRecord) -> Result<()>;

    /// Most-recent-first findings for a repository, capped at `limit`.
    async fn recent_findings(&self, repo_id: &str, limit: usize) -> Result<Vec<StoredFinding>>;

    async fn add_finding(&self, repo_id: &str, finding: StoredFinding) -> Result<()>;

    /// Append the outcome of one remediation request.
    async fn record_remediation(&self, record: RemediationRecord) -> Result<()>;

    /// All remediation records for a repository, oldest first.
    async fn remediations(&self, repo_id: &str) -> Result<Vec<RemediationRecord>>;
}
