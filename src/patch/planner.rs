//! Pure, deterministic planning: findings in, ordered fix actions out.

use super::{FixAction, FixKind, Finding, ManualItem, Plan};

const DEFAULT_MAX_FIXES: usize = 10;

const REASON_UNSAFE: &str =
    "manual fix required: ambiguous or potentially unsafe automatic change";
const REASON_CAPPED: &str = "manual fix required: fix limit reached";

/// Walk findings in order and classify each one. Secret-style findings
/// with a file path become redaction actions; the first remaining finding
/// funds a single `.env` gitignore action; everything else is a manual
/// item. At most `max_fixes` actions are planned (0 falls back to 10);
/// findings seen after the cap is hit are still classified, as manual
/// items, so nothing silently disappears from the report. Every plan ends
/// with the baseline gitignore action if room remains and none was added.
pub fn build_plan(findings: &[Finding], max_fixes: usize) -> Plan {
    let max_fixes = if max_fixes == 0 { DEFAULT_MAX_FIXES } else { max_fixes };
    let mut plan = Plan {
        actions: Vec::new(),
        manual: Vec::new(),
    };
    let mut seen_gitignore = false;

    for f in findings {
        let file_path = f.file_path.trim().replace('\\', "/");
        let title = f.title.trim().to_lowercase();
        let tool = f.tool.trim().to_lowercase();

        if plan.actions.len() >= max_fixes {
            plan.manual.push(ManualItem {
                reason: REASON_CAPPED.to_string(),
                title: f.title.clone(),
                file: f.file_path.clone(),
            });
            continue;
        }

        if (tool == "gitleaks" || title.contains("secret")) && !file_path.is_empty() {
            plan.actions.push(FixAction {
                kind: FixKind::SecretRedaction,
                file_path,
                line_start: f.line_start,
                description: "Replace hardcoded credential-like value with environment placeholder"
                    .to_string(),
            });
            continue;
        }

        if !seen_gitignore {
            plan.actions.push(gitignore_action());
            seen_gitignore = true;
            continue;
        }

        plan.manual.push(ManualItem {
            reason: REASON_UNSAFE.to_string(),
            title: f.title.clone(),
            file: f.file_path.clone(),
        });
    }

    if !seen_gitignore && plan.actions.len() < max_fixes {
        plan.actions.push(gitignore_action());
    }

    plan
}

fn gitignore_action() -> FixAction {
    FixAction {
        kind: FixKind::GitIgnoreEnv,
        file_path: ".gitignore".to_string(),
        line_start: 0,
        description: "Ensure .env is ignored".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret_finding(file: &str, line: usize) -> Finding {
        Finding {
            tool: "gitleaks".to_string(),
            title: "Secret detected".to_string(),
            file_path: file.to_string(),
            line_start: line,
        }
    }

    fn other_finding(title: &str) -> Finding {
        Finding {
            tool: "semgrep".to_string(),
            title: title.to_string(),
            file_path: "src/db.rs".to_string(),
            line_start: 4,
        }
    }

    #[test]
    fn actions_never_exceed_cap() {
        let findings: Vec<Finding> = (0..40).map(|i| secret_finding("a.env", i)).collect();
        for cap in 1..=12 {
            let plan = build_plan(&findings, cap);
            assert!(plan.actions.len() <= cap, "cap {} exceeded", cap);
        }
    }

    #[test]
    fn at_most_one_gitignore_action() {
        let findings = vec![
            other_finding("SQL injection"),
            other_finding("Open redirect"),
            other_finding("XSS"),
        ];
        let plan = build_plan(&findings, 10);
        let gitignore = plan
            .actions
            .iter()
            .filter(|a| a.kind == FixKind::GitIgnoreEnv)
            .count();
        assert_eq!(gitignore, 1);
        // The two findings after the first get deferred to humans.
        assert_eq!(plan.manual.len(), 2);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let findings = vec![
            secret_finding("app.env", 1),
            other_finding("SQL injection"),
            secret_finding("conf/keys.py", 7),
        ];
        assert_eq!(build_plan(&findings, 5), build_plan(&findings, 5));
    }

    #[test]
    fn secret_finding_plus_baseline_gitignore() {
        let plan = build_plan(&[secret_finding("app.env", 1)], 10);
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[0].kind, FixKind::SecretRedaction);
        assert_eq!(plan.actions[0].file_path, "app.env");
        assert_eq!(plan.actions[0].line_start, 1);
        assert_eq!(plan.actions[1].kind, FixKind::GitIgnoreEnv);
        assert!(plan.manual.is_empty());
    }

    #[test]
    fn secret_title_without_gitleaks_tool_still_matches() {
        let f = Finding {
            tool: "trufflehog".to_string(),
            title: "Hardcoded SECRET in config".to_string(),
            file_path: "config.yml".to_string(),
            line_start: 3,
        };
        let plan = build_plan(&[f], 10);
        assert_eq!(plan.actions[0].kind, FixKind::SecretRedaction);
    }

    #[test]
    fn secret_finding_without_path_is_not_a_redaction() {
        let f = Finding {
            tool: "gitleaks".to_string(),
            title: "Secret detected".to_string(),
            file_path: "  ".to_string(),
            line_start: 0,
        };
        let plan = build_plan(&[f], 10);
        // Pathless finding funds the gitignore action instead.
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind, FixKind::GitIgnoreEnv);
    }

    #[test]
    fn findings_beyond_cap_become_manual_items() {
        let findings: Vec<Finding> = (1..=5).map(|i| secret_finding("a.env", i)).collect();
        let plan = build_plan(&findings, 2);
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.manual.len(), 3);
        assert!(plan.manual.iter().all(|m| m.reason.contains("fix limit")));
    }

    #[test]
    fn zero_cap_falls_back_to_default() {
        let findings: Vec<Finding> = (0..20).map(|i| secret_finding("a.env", i)).collect();
        let plan = build_plan(&findings, 0);
        assert_eq!(plan.actions.len(), 10);
    }
}
