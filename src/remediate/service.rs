//! The remediation orchestrator: strictly sequential, fail-fast, with the
//! working directory removed on every exit path. No step is retried, and
//! remote side effects created before a later failure are not rolled back
//! (a ref can be left behind if the push or PR call fails) — callers own
//! that cleanup today. Concurrent confirmed requests against the same
//! repository are not serialized here either.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use walkdir::WalkDir;

use super::{dry_run_diff, Mode, RemediationRequest, RemediationResponse, SENTINEL_DIFF};
use crate::error::{RemediationError, Result};
use crate::git::Vcs;
use crate::github;
use crate::github::app_auth::AppCredentials;
use crate::github::client::GitHubClient;
use crate::patch::{Finding, ManualItem};
use crate::settings::Settings;
use crate::store::{RemediationRecord, Store};

const DEFAULT_MAX_FIXES: usize = 10;
const DEFAULT_TITLE: &str = "fixlink: fix findings";

pub struct Remediator<S, V> {
    store: S,
    vcs: V,
    settings: Settings,
}

impl<S: Store, V: Vcs> Remediator<S, V> {
    pub fn new(store: S, vcs: V, settings: Settings) -> Self {
        Self {
            store,
            vcs,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Run one remediation request end-to-end and persist its record.
    /// Errors abort the whole request; the caller never sees a partial
    /// response.
    pub async fn remediate(&self, req: RemediationRequest) -> Result<RemediationResponse> {
        let max_fixes = if req.max_fixes == 0 {
            DEFAULT_MAX_FIXES
        } else {
            req.max_fixes
        };

        let repo = self.store.repo(&req.repo_id).await?;
        github::ensure_allowed_url(&repo.url)?;

        let stored = self.store.recent_findings(&req.repo_id, max_fixes).await?;
        let mut findings: Vec<Finding> = stored.iter().map(|f| f.to_finding()).collect();
        if findings.is_empty() {
            // The pipeline is never handed an empty input; fall back to
            // the baseline hygiene fix.
            findings.push(Finding {
                tool: "policy".to_string(),
                title: "Ensure .env ignored".to_string(),
                file_path: ".gitignore".to_string(),
                line_start: 0,
            });
        }

        // Unique working directory, removed on every exit path when the
        // handle drops.
        let workdir = tempfile::Builder::new().prefix("fixlink-pr-").tempdir()?;
        let repo_dir = workdir.path().join("repo");

        tracing::info!(repo_id = %req.repo_id, url = %repo.url, "cloning repository");
        self.vcs.clone_shallow(&repo.url, &repo_dir).await?;
        enforce_size_cap(&repo_dir, self.settings.limits.max_repo_mb)?;

        let (mut diff, _plan, applied) =
            dry_run_diff(&self.vcs, &repo_dir, &findings, max_fixes).await?;
        if diff.trim().is_empty() {
            diff = SENTINEL_DIFF.to_string();
        }
        tracing::info!(
            repo_id = %req.repo_id,
            applied = applied.applied.len(),
            manual = applied.manual.len(),
            "plan applied"
        );

        let mut mode = Mode::DryRun;
        let mut pr_url = None;
        let mut branch = None;

        if req.confirm {
            let (url, name) = self
                .open_pull_request(&req, &repo.url, &repo_dir, &diff, &applied.manual)
                .await?;
            mode = Mode::Created;
            pr_url = Some(url);
            branch = Some(name);
        }

        self.store
            .record_remediation(RemediationRecord {
                repo_id: req.repo_id.clone(),
                status: mode.to_string(),
                branch: branch.clone(),
                pr_url: pr_url.clone(),
                diff_text: diff.clone(),
                requested_by: req.requested_by.clone(),
                created_at: Utc::now(),
            })
            .await?;

        Ok(RemediationResponse {
            mode,
            diff,
            pr_url,
            branch,
        })
    }

    /// The confirmed path: authenticate, create the remote ref, publish
    /// the local branch and open the pull request. Returns (pr_url,
    /// branch).
    async fn open_pull_request(
        &self,
        req: &RemediationRequest,
        repo_url: &str,
        repo_dir: &Path,
        diff: &str,
        manual: &[ManualItem],
    ) -> Result<(String, String)> {
        let creds = AppCredentials::from_settings(&self.settings.github)?;
        let client = GitHubClient::new(Duration::from_secs(
            self.settings.limits.http_timeout_secs,
        ))?
        .with_base_url(self.settings.github.api_base.clone());

        let token = client.installation_token(&creds).await?;
        let (owner, name) = github::parse_owner_repo(repo_url)?;

        let base = match req.base_branch.as_deref().map(str::trim) {
            Some(b) if !b.is_empty() => b.to_string(),
            _ => client.default_branch(&owner, &name, &token).await?,
        };
        let sha = client.branch_sha(&owner, &name, &base, &token).await?;

        let branch = format!("fixlink/fix-{}", branch_token());
        client
            .create_ref(&owner, &name, &format!("refs/heads/{branch}"), &sha, &token)
            .await?;
        self.vcs
            .publish_branch(repo_dir, repo_url, &branch, &token)
            .await?;

        let title = if req.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            req.title.trim()
        };
        let body = build_pr_body(diff, manual, self.settings.limits.pr_diff_limit);
        let pr_url = client
            .create_pull_request(&owner, &name, title, &branch, &base, &body, &token)
            .await?;

        tracing::info!(pr_url = %pr_url, branch = %branch, base = %base, "pull request created");
        Ok((pr_url, branch))
    }
}

fn branch_token() -> String {
    let token = Uuid::new_v4().simple().to_string();
    token[..12].to_string()
}

/// Sum the size of every regular file in the clone and reject oversized
/// repositories before any patch or diff work happens.
fn enforce_size_cap(repo_dir: &Path, max_mb: u64) -> Result<()> {
    let total: u64 = WalkDir::new(repo_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum();

    if total > max_mb * 1024 * 1024 {
        return Err(RemediationError::PolicyViolation(format!(
            "repository exceeds size cap of {max_mb} MB"
        )));
    }
    Ok(())
}

/// Pull-request body: the diff (truncated past the limit) plus a JSON
/// listing of the items left to humans.
fn build_pr_body(diff: &str, manual: &[ManualItem], diff_limit: usize) -> String {
    let manual_text = if manual.is_empty() {
        String::new()
    } else {
        let listing = serde_json::to_string_pretty(manual).unwrap_or_default();
        format!("\n\n## Manual items\n```json\n{listing}\n```")
    };

    let shown = if diff.len() > diff_limit {
        let mut end = diff_limit;
        while end > 0 && !diff.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n... (truncated)", &diff[..end])
    } else {
        diff.to_string()
    };

    format!(
        "Automated safe fixes generated by fixlink.{manual_text}\n\n## Diff preview\n```diff\n{shown}\n```"
    )
}
