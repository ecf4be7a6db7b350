//! Patch planning and application: classify findings into safely
//! automatable fix actions vs. manual items, then mutate a working copy
//! accordingly.

pub mod applier;
pub mod planner;

use serde::{Deserialize, Serialize};

/// One issue reported by an external scanning adapter. Read-only input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub tool: String,
    pub title: String,
    pub file_path: String,
    pub line_start: usize,
}

/// The allowlisted kinds of automatic change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    SecretRedaction,
    GitIgnoreEnv,
}

/// One concrete mutation of the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAction {
    pub kind: FixKind,
    pub file_path: String,
    pub line_start: usize,
    pub description: String,
}

/// A finding or action excluded from automation, with the reason it needs
/// a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualItem {
    pub reason: String,
    pub title: String,
    pub file: String,
}

/// Ordered automatic actions plus the items left to humans. Ephemeral:
/// derived per request and discarded once the response is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<FixAction>,
    pub manual: Vec<ManualItem>,
}

/// What actually happened when a plan was applied: the subset of actions
/// that mutated the working copy, plus everything deferred to humans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub applied: Vec<FixAction>,
    pub manual: Vec<ManualItem>,
}
