//! Local version-control operations behind a narrow capability trait, so
//! the orchestrator can run against an in-memory fake in tests. The real
//! implementation shells out to the `git` binary.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{RemediationError, Result};

const BOT_NAME: &str = "fixlink[bot]";
const BOT_EMAIL: &str = "fixlink[bot]@users.noreply.github.com";
const COMMIT_MESSAGE: &str = "fixlink: apply safe automatic fixes";

/// The version-control capabilities the pipeline needs.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Shallow, blob-filtered, tag-free clone of `url` into `dest`,
    /// bounded by the implementation's timeout. Never prompts for
    /// credentials.
    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()>;

    /// Textual diff of the working tree against HEAD.
    async fn diff_head(&self, repo_dir: &Path) -> Result<String>;

    /// Create-and-switch to `branch`, configure the bot identity, stage
    /// everything, commit (an empty commit set is fine) and push the
    /// branch upstream with `token` embedded as URL credentials.
    async fn publish_branch(
        &self,
        repo_dir: &Path,
        remote_url: &str,
        branch: &str,
        token: &str,
    ) -> Result<()>;
}

/// `Vcs` implementation driving the system `git` binary.
pub struct GitCli {
    clone_timeout: Duration,
}

impl GitCli {
    pub fn new(clone_timeout: Duration) -> Self {
        Self { clone_timeout }
    }

    async fn run(&self, args: &[&str], timeout: Option<Duration>) -> Result<String> {
        let verb = if args[0] == "-C" { args[2] } else { args[0] };
        let mut cmd = Command::new("git");
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        let output = match timeout {
            Some(t) => tokio::time::timeout(t, cmd.output())
                .await
                .map_err(|_| {
                    RemediationError::LocalGit(format!("git {verb} timed out after {t:?}"))
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| RemediationError::LocalGit(format!("failed to run git: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            // git splits diagnostics across both streams ("nothing to
            // commit" lands on stdout), so keep both in the error.
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemediationError::LocalGit(format!(
                "git {verb} failed: {} {}",
                stderr.trim(),
                stdout.trim()
            )));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        self.run(
            &[
                "clone",
                "--depth",
                "1",
                "--filter=blob:none",
                "--no-tags",
                url,
                &dest,
            ],
            Some(self.clone_timeout),
        )
        .await?;
        Ok(())
    }

    async fn diff_head(&self, repo_dir: &Path) -> Result<String> {
        let repo = repo_dir.to_string_lossy();
        self.run(&["-C", &repo, "diff", "--", "."], None).await
    }

    async fn publish_branch(
        &self,
        repo_dir: &Path,
        remote_url: &str,
        branch: &str,
        token: &str,
    ) -> Result<()> {
        let repo = repo_dir.to_string_lossy();
        let auth_url = remote_url.replacen("https://", &format!("https://x-access-token:{token}@"), 1);
        let refspec = format!("HEAD:{branch}");

        let steps: Vec<Vec<&str>> = vec![
            vec!["-C", &repo, "checkout", "-b", branch],
            vec!["-C", &repo, "config", "user.email", BOT_EMAIL],
            vec!["-C", &repo, "config", "user.name", BOT_NAME],
            vec!["-C", &repo, "add", "-A"],
            vec!["-C", &repo, "commit", "-m", COMMIT_MESSAGE],
            vec!["-C", &repo, "push", &auth_url, &refspec],
        ];

        for args in &steps {
            if let Err(err) = self.run(args, None).await {
                // Some remediations only touch files already in their
                // desired state; an empty commit set is not a failure.
                if args.contains(&"commit") && err.to_string().contains("nothing to commit") {
                    continue;
                }
                // The auth URL carries the token; never echo step output.
                return Err(RemediationError::LocalGit(format!(
                    "git {} failed while publishing branch {branch}",
                    args[2]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn run_git(dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        run_git(dir.path(), &["add", "."]);
        run_git(dir.path(), &["commit", "-m", "initial"]);
        dir
    }

    #[tokio::test]
    async fn diff_head_reports_worktree_changes() {
        let repo = make_repo();
        std::fs::write(repo.path().join("README.md"), "changed\n").unwrap();

        let git = GitCli::new(Duration::from_secs(30));
        let diff = git.diff_head(repo.path()).await.unwrap();
        assert!(diff.contains("-hello"));
        assert!(diff.contains("+changed"));
    }

    #[tokio::test]
    async fn diff_head_is_empty_when_clean() {
        let repo = make_repo();
        let git = GitCli::new(Duration::from_secs(30));
        let diff = git.diff_head(repo.path()).await.unwrap();
        assert!(diff.trim().is_empty());
    }

    #[tokio::test]
    async fn clone_then_publish_creates_remote_branch() {
        let remote = tempfile::tempdir().unwrap();
        run_git(remote.path(), &["init", "--bare"]);

        let seed = make_repo();
        // Cover either default branch name for the bare remote's HEAD.
        run_git(
            seed.path(),
            &["push", remote.path().to_str().unwrap(), "HEAD:main", "HEAD:master"],
        );

        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("repo");
        let git = GitCli::new(Duration::from_secs(60));
        git.clone_shallow(remote.path().to_str().unwrap(), &dest)
            .await
            .unwrap();

        std::fs::write(dest.join("fix.txt"), "patched\n").unwrap();
        git.publish_branch(
            &dest,
            remote.path().to_str().unwrap(),
            "fixlink/fix-test",
            "unused-token",
        )
        .await
        .unwrap();

        let check = StdCommand::new("git")
            .args(["-C", remote.path().to_str().unwrap(), "rev-parse", "refs/heads/fixlink/fix-test"])
            .output()
            .unwrap();
        assert!(check.status.success());
    }

    #[tokio::test]
    async fn publish_with_no_changes_still_succeeds() {
        let remote = tempfile::tempdir().unwrap();
        run_git(remote.path(), &["init", "--bare"]);

        let seed = make_repo();
        // Cover either default branch name for the bare remote's HEAD.
        run_git(
            seed.path(),
            &["push", remote.path().to_str().unwrap(), "HEAD:main", "HEAD:master"],
        );

        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("repo");
        let git = GitCli::new(Duration::from_secs(60));
        git.clone_shallow(remote.path().to_str().unwrap(), &dest)
            .await
            .unwrap();

        // Worktree already matches the desired state; commit is a no-op.
        git.publish_branch(
            &dest,
            remote.path().to_str().unwrap(),
            "fixlink/fix-noop",
            "unused-token",
        )
        .await
        .unwrap();
    }
}
