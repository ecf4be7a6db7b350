//! Applies a plan to a working copy. A single action that cannot be
//! applied safely degrades to a manual item; real I/O errors abort the
//! whole batch.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ApplyResult, FixKind, ManualItem, Plan};
use crate::error::Result;

/// Fixed placeholder written in place of a redacted value.
pub const REDACTION_PLACEHOLDER: &str = "\"${SECRET_FROM_ENV}\"";

/// Credential-style assignment: optional token/secret/password/api-key
/// identifier, `:` / `=` / whitespace separator, then a quoted value or a
/// bare value of at least 12 characters. Capture groups: prefix, keyword,
/// value, trailing text.
static SECRET_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^([ \t]*[A-Z0-9_\-\.]*?(token|secret|password|apikey|api_key)[A-Z0-9_\-\.]*(?:[ \t]*[:=][ \t]*|[ \t]+))("[^"]*"|'[^']*'|[A-Za-z0-9_\-]{12,})(.*)$"#,
    )
    .unwrap()
});

/// Mutate the working copy under `root` according to `plan`. Returns the
/// actions actually applied plus the plan's manual items and any action
/// that had to be deferred.
pub fn apply_plan(root: &Path, plan: &Plan) -> Result<ApplyResult> {
    let mut result = ApplyResult {
        applied: Vec::new(),
        manual: plan.manual.clone(),
    };

    for action in &plan.actions {
        match action.kind {
            FixKind::GitIgnoreEnv => {
                if ensure_env_ignored(&root.join(".gitignore"))? {
                    result.applied.push(action.clone());
                }
            }
            FixKind::SecretRedaction => {
                let Some(target) = resolve_under_root(root, &action.file_path) else {
                    tracing::warn!(file = %action.file_path, "redaction target escapes working copy");
                    result.manual.push(ManualItem {
                        reason: "manual fix required: invalid target path".to_string(),
                        title: action.description.clone(),
                        file: action.file_path.clone(),
                    });
                    continue;
                };
                if redact_secret_line(&target, action.line_start)? {
                    result.applied.push(action.clone());
                } else {
                    result.manual.push(ManualItem {
                        reason: "manual fix required: no safe redaction match found".to_string(),
                        title: action.description.clone(),
                        file: action.file_path.clone(),
                    });
                }
            }
        }
    }

    Ok(result)
}

/// Resolve a plan-relative path under `root`, rejecting anything that
/// could escape it (absolute paths, `..` traversal, path prefixes).
fn resolve_under_root(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return None;
    }
    let mut depth: i32 = 0;
    for comp in rel_path.components() {
        match comp {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => return None,
        }
    }
    Some(root.join(rel_path))
}

/// Append `.env` to the gitignore unless a line already equals it.
/// Returns whether the file was changed.
fn ensure_env_ignored(path: &Path) -> Result<bool> {
    let mut content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    if content
        .replace("\r\n", "\n")
        .split('\n')
        .any(|line| line.trim() == ".env")
    {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(".env\n");
    fs::write(path, content)?;
    Ok(true)
}

/// Redact the first credential-style value in the file, preferring the
/// declared line. Returns false when the file is missing, unreadable as
/// text, or contains no safe match.
fn redact_secret_line(path: &Path, line_start: usize) -> Result<bool> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidData) => {
            return Ok(false)
        }
        Err(e) => return Err(e.into()),
    };

    let mut lines: Vec<String> = content
        .replace("\r\n", "\n")
        .split('\n')
        .map(str::to_string)
        .collect();

    if line_start > 0 && line_start <= lines.len() {
        if let Some(repl) = redact_line(&lines[line_start - 1]) {
            lines[line_start - 1] = repl;
            fs::write(path, lines.join("\n"))?;
            return Ok(true);
        }
    }

    for i in 0..lines.len() {
        if let Some(repl) = redact_line(&lines[i]) {
            lines[i] = repl;
            fs::write(path, lines.join("\n"))?;
            return Ok(true);
        }
    }

    Ok(false)
}

fn redact_line(line: &str) -> Option<String> {
    let caps = SECRET_ASSIGN.captures(line)?;
    Some(format!(
        "{}{}{}",
        &caps[1],
        REDACTION_PLACEHOLDER,
        &caps[4]
    ))
}
