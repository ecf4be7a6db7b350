//! JSON-file-backed store for the CLI. One file per collection under the
//! configured data directory, pretty-printed so the files stay inspectable.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{RemediationRecord, RepoRecord, Store, StoredFinding};
use crate::error::{RemediationError, Result};

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("findings"))?;
        fs::create_dir_all(root.join("remediations"))?;
        Ok(Self { root })
    }

    fn repos_path(&self) -> PathBuf {
        self.root.join("repos.json")
    }

    fn findings_path(&self, repo_id: &str) -> PathBuf {
        self.root.join("findings").join(format!("{repo_id}.json"))
    }

    fn remediations_path(&self, repo_id: &str) -> PathBuf {
        self.root.join("remediations").join(format!("{repo_id}.json"))
    }
}

fn load_vec<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn save_vec<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json)?;
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn repo(&self, repo_id: &str) -> Result<RepoRecord> {
        let repos: Vec<RepoRecord> = load_vec(&self.repos_path())?;
        repos
            .into_iter()
            .find(|r| r.id == repo_id)
            .ok_or_else(|| RemediationError::NotFound(repo_id.to_string()))
    }

    async fn add_repo(&self, record: RepoRecord) -> Result<()> {
        let mut repos: Vec<RepoRecord> = load_vec(&self.repos_path())?;
        repos.retain(|r| r.id != record.id);
        repos.push(record);
        save_vec(&self.repos_path(), &repos)
    }

    async fn recent_findings(&self, repo_id: &str, limit: usize) -> Result<Vec<StoredFinding>> {
        let mut findings: Vec<StoredFinding> = load_vec(&self.findings_path(repo_id))?;
        findings.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        findings.truncate(limit);
        Ok(findings)
    }

    async fn add_finding(&self, repo_id: &str, finding: StoredFinding) -> Result<()> {
        let path = self.findings_path(repo_id);
        let mut findings: Vec<StoredFinding> = load_vec(&path)?;
        findings.push(finding);
        save_vec(&path, &findings)
    }

    async fn record_remediation(&self, record: RemediationRecord) -> Result<()> {
        let path = self.remediations_path(&record.repo_id);
        let mut records: Vec<RemediationRecord> = load_vec(&path)?;
        records.push(record);
        save_vec(&path, &records)
    }

    async fn remediations(&self, repo_id: &str) -> Result<Vec<RemediationRecord>> {
        load_vec(&self.remediations_path(repo_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn round_trips_repos_and_findings() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store
            .add_repo(RepoRecord::new("acme", "https://github.com/acme/demo.git"))
            .await
            .unwrap();
        let repo = store.repo("acme").await.unwrap();
        assert_eq!(repo.url, "https://github.com/acme/demo.git");

        store
            .add_finding(
                "acme",
                StoredFinding {
                    tool: "gitleaks".to_string(),
                    title: "Secret detected".to_string(),
                    file_path: "app.env".to_string(),
                    line_start: 1,
                    recorded_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        let findings = store.recent_findings("acme", 10).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file_path, "app.env");
    }

    #[tokio::test]
    async fn remediation_records_append() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let record = RemediationRecord {
            repo_id: "acme".to_string(),
            status: "dry-run".to_string(),
            branch: None,
            pr_url: None,
            diff_text: "# No safe automatic changes available\n".to_string(),
            requested_by: Some("ops".to_string()),
            created_at: Utc::now(),
        };
        store.record_remediation(record.clone()).await.unwrap();
        store.record_remediation(record).await.unwrap();

        let records = store.remediations("acme").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, "dry-run");
    }
}
