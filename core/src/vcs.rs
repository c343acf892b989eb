use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use covpilot_git_tooling::CommitOutcome;
use covpilot_git_tooling::GitToolingError;

use crate::error::PipelineError;
use crate::error::Result;

/// Version-control operations the pipeline needs, each reporting only
/// success or failure.
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn stage_all(&self, repo: &Path) -> Result<()>;

    async fn commit(&self, repo: &Path, message: &str) -> Result<CommitOutcome>;

    async fn push(&self, repo: &Path, remote: &str) -> Result<()>;

    /// Returns whatever identifies the new review request, usually its URL.
    async fn create_review_request(
        &self,
        repo: &Path,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String>;
}

/// `git` and `gh` on PATH, run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

async fn blocking<T, F>(repo: &Path, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(PathBuf) -> std::result::Result<T, GitToolingError> + Send + 'static,
{
    let repo = repo.to_path_buf();
    tokio::task::spawn_blocking(move || op(repo))
        .await
        .map_err(|err| PipelineError::Task(err.to_string()))?
        .map_err(PipelineError::from)
}

#[async_trait]
impl VersionControl for GitCli {
    async fn stage_all(&self, repo: &Path) -> Result<()> {
        blocking(repo, |repo| covpilot_git_tooling::stage_all(&repo)).await
    }

    async fn commit(&self, repo: &Path, message: &str) -> Result<CommitOutcome> {
        let message = message.to_string();
        blocking(repo, move |repo| covpilot_git_tooling::commit(&repo, &message)).await
    }

    async fn push(&self, repo: &Path, remote: &str) -> Result<()> {
        let remote = remote.to_string();
        blocking(repo, move |repo| covpilot_git_tooling::push(&repo, &remote)).await
    }

    async fn create_review_request(
        &self,
        repo: &Path,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        let (base, title, body) = (base.to_string(), title.to_string(), body.to_string());
        blocking(repo, move |repo| {
            covpilot_git_tooling::create_pull_request(&repo, &base, &title, &body)
        })
        .await
    }
}
