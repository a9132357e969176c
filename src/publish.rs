use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

const BOT_EMAIL: &str = "bot@dailybrief.local";
const BOT_NAME: &str = "Daily Brief Bot";

#[derive(Debug, PartialEq, Eq)]
enum CommitOutcome {
    Committed,
    NothingToCommit,
    Failed,
}

pub fn token_from_env() -> Result<String> {
    std::env::var("GITHUB_TOKEN")
        .map_err(|_| anyhow!("GITHUB_TOKEN environment variable is not set"))
}

/// Stage, commit, and push the dashboard checkout. A commit that finds
/// nothing to commit still pushes; the token reaches git through its
/// askpass mechanism, never the command line.
pub fn publish(repo_dir: &Path, branch: &str, message: &str, token: &str) -> Result<()> {
    // Bot identity; harmless when the checkout already has one.
    let _ = git(repo_dir).args(["config", "user.email", BOT_EMAIL]).output();
    let _ = git(repo_dir).args(["config", "user.name", BOT_NAME]).output();

    let add = git(repo_dir)
        .args(["add", "-A"])
        .output()
        .context("Failed to run git add")?;
    if !add.status.success() {
        bail!("git add failed: {}", String::from_utf8_lossy(&add.stderr).trim());
    }

    let commit = git(repo_dir)
        .args(["commit", "-m", message])
        .output()
        .context("Failed to run git commit")?;
    let stdout = String::from_utf8_lossy(&commit.stdout);
    let stderr = String::from_utf8_lossy(&commit.stderr);
    match classify_commit(commit.status.success(), &stdout, &stderr) {
        CommitOutcome::Committed => debug!("Committed dashboard update"),
        CommitOutcome::NothingToCommit => debug!("Nothing to commit, pushing anyway"),
        CommitOutcome::Failed => bail!("git commit failed: {}", stderr.trim()),
    }

    let push = git(repo_dir)
        .args(["push", "origin", branch])
        .env("GIT_ASKPASS", "echo")
        .env("GIT_USERNAME", "x-access-token")
        .env("GIT_PASSWORD", token)
        .output()
        .context("Failed to run git push")?;
    if !push.status.success() {
        bail!(
            "git push failed: {}",
            String::from_utf8_lossy(&push.stderr).trim()
        );
    }
    Ok(())
}

fn git(repo_dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(repo_dir);
    cmd
}

/// An unchanged tree makes `git commit` exit non-zero; that outcome is not
/// a failure. Depending on the git version the notice lands on stdout or
/// stderr, so both are checked.
fn classify_commit(success: bool, stdout: &str, stderr: &str) -> CommitOutcome {
    if success {
        return CommitOutcome::Committed;
    }
    if stdout.to_lowercase().contains("nothing to commit")
        || stderr.to_lowercase().contains("nothing to commit")
    {
        return CommitOutcome::NothingToCommit;
    }
    CommitOutcome::Failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_commit() {
        assert_eq!(
            classify_commit(true, "[main 1a2b3c4] update\n", ""),
            CommitOutcome::Committed
        );
    }

    #[test]
    fn unchanged_tree_is_not_a_failure() {
        assert_eq!(
            classify_commit(false, "nothing to commit, working tree clean\n", ""),
            CommitOutcome::NothingToCommit
        );
        assert_eq!(
            classify_commit(false, "", "Nothing to commit\n"),
            CommitOutcome::NothingToCommit
        );
    }

    #[test]
    fn other_non_zero_exits_fail() {
        assert_eq!(
            classify_commit(false, "", "fatal: not a git repository\n"),
            CommitOutcome::Failed
        );
    }
}
