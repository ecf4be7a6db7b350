//! In-memory store fake. Satisfies the `Store` contract without touching
//! disk; used by the orchestrator tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{RemediationRecord, RepoRecord, Store, StoredFinding};
use crate::error::{RemediationError, Result};

#[derive(Debug, Default)]
struct Inner {
    repos: HashMap<String, RepoRecord>,
    findings: HashMap<String, Vec<StoredFinding>>,
    remediations: HashMap<String, Vec<RemediationRecord>>,
}

/// In-memory `Store` backed by hash maps behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn repo(&self, repo_id: &str) -> Result<RepoRecord> {
        let inner = self.inner.lock().unwrap();
        inner
            .repos
            .get(repo_id)
            .cloned()
            .ok_or_else(|| RemediationError::NotFound(repo_id.to_string()))
    }

    async fn add_repo(&self, record: RepoRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.repos.insert(record.id.clone(), record);
        Ok(())
    }

    async fn recent_findings(&self, repo_id: &str, limit: usize) -> Result<Vec<StoredFinding>> {
        let inner = self.inner.lock().unwrap();
        let mut findings = inner.findings.get(repo_id).cloned().unwrap_or_default();
        findings.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        findings.truncate(limit);
        Ok(findings)
    }

    async fn add_finding(&self, repo_id: &str, finding: StoredFinding) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .findings
            .entry(repo_id.to_string())
            .or_default()
            .push(finding);
        Ok(())
    }

    async fn record_remediation(&self, record: RemediationRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .remediations
            .entry(record.repo_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn remediations(&self, repo_id: &str) -> Result<Vec<RemediationRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.remediations.get(repo_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn finding_at(title: &str, offset_secs: i64) -> StoredFinding {
        StoredFinding {
            tool: "gitleaks".to_string(),
            title: title.to_string(),
            file_path: "app.env".to_string(),
            line_start: 1,
            recorded_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn unknown_repo_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.repo("missing").await,
            Err(RemediationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn findings_come_back_most_recent_first_and_capped() {
        let store = MemoryStore::new();
        store
            .add_repo(RepoRecord::new("r1", "https://github.com/acme/demo.git"))
            .await
            .unwrap();
        for (i, title) in ["oldest", "middle", "newest"].iter().enumerate() {
            store
                .add_finding("r1", finding_at(title, i as i64))
                .await
                .unwrap();
        }

        let findings = store.recent_findings("r1", 2).await.unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].title, "newest");
        assert_eq!(findings[1].title, "middle");
    }
}
