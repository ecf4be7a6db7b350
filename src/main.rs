use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use fixlink::git::GitCli;
use fixlink::remediate::RemediationRequest;
use fixlink::store::file::FileStore;
use fixlink::store::{RepoRecord, Store, StoredFinding};
use fixlink::{Remediator, Settings};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> fixlink::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let settings = Settings::load()?;
    let store = FileStore::open(settings.store.data_dir.clone())?;

    match args.get(1).map(String::as_str) {
        // ==============================
        // Repository registration
        // ==============================
        Some("repo") if args.get(2).map(String::as_str) == Some("add") => {
            let (Some(id), Some(url)) = (args.get(3), args.get(4)) else {
                usage();
                return Ok(());
            };
            store
                .add_repo(RepoRecord::new(id.clone(), url.clone()))
                .await?;
            println!("registered {id} -> {url}");
        }

        // ==============================
        // Finding seeding (stands in for the scan adapters)
        // ==============================
        Some("finding") if args.get(2).map(String::as_str) == Some("add") => {
            let (Some(repo_id), Some(tool), Some(title)) =
                (args.get(3), args.get(4), args.get(5))
            else {
                usage();
                return Ok(());
            };
            let finding = StoredFinding {
                tool: tool.clone(),
                title: title.clone(),
                file_path: flag_value(&args, "--file").unwrap_or_default(),
                line_start: flag_value(&args, "--line")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
                recorded_at: Utc::now(),
            };
            store.add_finding(repo_id, finding).await?;
            println!("finding recorded for {repo_id}");
        }

        // ==============================
        // The pipeline itself
        // ==============================
        Some("remediate") => {
            let Some(repo_id) = args.get(2) else {
                usage();
                return Ok(());
            };
            let request = RemediationRequest {
                repo_id: repo_id.clone(),
                title: flag_value(&args, "--title").unwrap_or_default(),
                base_branch: flag_value(&args, "--base"),
                confirm: args.iter().any(|a| a == "--confirm"),
                max_fixes: flag_value(&args, "--max-fixes")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0),
                requested_by: flag_value(&args, "--requested-by"),
            };

            let git = GitCli::new(Duration::from_secs(settings.limits.clone_timeout_secs));
            let remediator = Remediator::new(store, git, settings);
            let response = remediator.remediate(request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Some("history") => {
            let Some(repo_id) = args.get(2) else {
                usage();
                return Ok(());
            };
            let records = store.remediations(repo_id).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        _ => usage(),
    }

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn usage() {
    println!("fixlink — automated remediation pipeline");
    println!();
    println!("Usage:");
    println!("  fixlink repo add <id> <url>");
    println!("  fixlink finding add <repo-id> <tool> <title> [--file PATH] [--line N]");
    println!("  fixlink remediate <repo-id> [--confirm] [--title T] [--base BRANCH]");
    println!("                    [--max-fixes N] [--requested-by USER]");
    println!("  fixlink history <repo-id>");
}
