//! The remediation pipeline: request/response contract plus the
//! orchestrator sequencing clone → plan → apply → diff → pull request.

pub mod service;

pub use service::Remediator;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::git::Vcs;
use crate::patch::applier::apply_plan;
use crate::patch::planner::build_plan;
use crate::patch::{ApplyResult, Finding, Plan};

/// Substituted whenever a remediation produced no textual change, so
/// callers never receive a blank payload.
pub const SENTINEL_DIFF: &str = "# No safe automatic changes available\n";

/// One remediation request. `confirm = false` stops at the dry-run diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationRequest {
    pub repo_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub confirm: bool,
    /// 0 falls back to the default of 10.
    #[serde(default)]
    pub max_fixes: usize,
    #[serde(default)]
    pub requested_by: Option<String>,
}

impl RemediationRequest {
    pub fn dry_run(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            title: String::new(),
            base_branch: None,
            confirm: false,
            max_fixes: 0,
            requested_by: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    DryRun,
    Created,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::DryRun => write!(f, "dry-run"),
            Mode::Created => write!(f, "created"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemediationResponse {
    pub mode: Mode,
    pub diff: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Plan, apply and diff against an already-cloned working copy. This is
/// the provider-free core of the pipeline; the service wraps it with
/// policy checks and the pull-request protocol.
pub async fn dry_run_diff<V: Vcs>(
    vcs: &V,
    repo_dir: &Path,
    findings: &[Finding],
    max_fixes: usize,
) -> Result<(String, Plan, ApplyResult)> {
    let plan = build_plan(findings, max_fixes);
    let applied = apply_plan(repo_dir, &plan)?;
    let diff = vcs.diff_head(repo_dir).await?;
    Ok((diff, plan, applied))
}
