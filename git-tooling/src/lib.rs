//! Thin wrappers over the `git` and `gh` command line tools.
//!
//! Every call is synchronous; async callers are expected to move them onto a
//! blocking thread.

mod command;
mod errors;

use std::path::Path;
use std::path::PathBuf;

use tracing::info;

use crate::command::ensure_program;
use crate::command::run;
use crate::command::run_checked;
pub use crate::errors::GitToolingError;
pub use crate::errors::Result;

const NOTHING_TO_COMMIT_MARKERS: &[&str] = &["nothing to commit", "no changes added to commit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Created,
    /// The working tree had no staged changes; not an error.
    NothingToCommit,
}

/// Returns the top level of the work tree containing `path`.
pub fn repository_root(path: &Path) -> Result<PathBuf> {
    ensure_program("git")?;
    let output = run("git", path, ["rev-parse", "--show-toplevel"])?;
    if !output.success {
        return Err(GitToolingError::NotARepository {
            path: path.to_path_buf(),
        });
    }
    Ok(PathBuf::from(output.stdout.trim()))
}

/// `git add -A` in `repo`.
pub fn stage_all(repo: &Path) -> Result<()> {
    ensure_program("git")?;
    run_checked("git", repo, ["add", "-A"])?;
    Ok(())
}

/// Commits whatever is staged. A clean index yields
/// [`CommitOutcome::NothingToCommit`] instead of an error.
pub fn commit(repo: &Path, message: &str) -> Result<CommitOutcome> {
    ensure_program("git")?;
    let output = run("git", repo, ["commit", "-m", message])?;
    if output.success {
        info!(repo = %repo.display(), "created commit");
        return Ok(CommitOutcome::Created);
    }
    let combined = output.combined();
    if NOTHING_TO_COMMIT_MARKERS
        .iter()
        .any(|marker| combined.contains(marker))
    {
        info!(repo = %repo.display(), "nothing to commit");
        return Ok(CommitOutcome::NothingToCommit);
    }
    Err(GitToolingError::CommandFailed {
        command: "git commit".to_string(),
        status: output.status,
        stderr: combined.trim().to_string(),
    })
}

/// Pushes `HEAD` to `remote`, setting the upstream of the current branch.
pub fn push(repo: &Path, remote: &str) -> Result<()> {
    ensure_program("git")?;
    run_checked("git", repo, ["push", "--set-upstream", remote, "HEAD"])?;
    Ok(())
}

/// Name of the checked-out branch, `None` on a detached head.
pub fn current_branch(repo: &Path) -> Result<Option<String>> {
    ensure_program("git")?;
    let output = run_checked("git", repo, ["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.stdout.trim();
    Ok((branch != "HEAD" && !branch.is_empty()).then(|| branch.to_string()))
}

/// Opens a pull request with `gh pr create` and returns what `gh` printed,
/// normally the PR URL.
pub fn create_pull_request(repo: &Path, base: &str, title: &str, body: &str) -> Result<String> {
    ensure_program("gh")?;
    let output = run_checked(
        "gh",
        repo,
        [
            "pr", "create", "--base", base, "--title", title, "--body", body,
        ],
    )?;
    Ok(output.stdout.trim().to_string())
}
