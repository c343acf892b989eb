use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use covpilot_core::config::PipelineConfig;
use covpilot_core::vcs::GitCli;
use covpilot_core::vcs::VersionControl;
use owo_colors::OwoColorize;

const DEFAULT_BODY: &str = "Tests generated for uncovered methods reported by JaCoCo.";

#[derive(Debug, Parser)]
pub struct PublishArgs {
    /// Pull request title; defaults to one naming the current branch.
    #[arg(long)]
    pub title: Option<String>,

    /// Pull request description.
    #[arg(long, default_value = DEFAULT_BODY)]
    pub body: String,

    /// Branch to merge into; defaults to `commit.base`.
    #[arg(long)]
    pub base: Option<String>,

    /// Remote to push to; defaults to `commit.remote`.
    #[arg(long)]
    pub remote: Option<String>,
}

pub(crate) async fn run(config: PipelineConfig, args: PublishArgs) -> Result<i32> {
    let repo = config.repo_dir();
    let remote = args.remote.unwrap_or(config.commit.remote);
    let base = args.base.unwrap_or(config.commit.base);
    let title = match args.title {
        Some(title) => title,
        None => {
            let branch = covpilot_git_tooling::current_branch(&repo)?;
            match branch {
                Some(branch) => format!("Add generated tests ({branch})"),
                None => "Add generated tests".to_string(),
            }
        }
    };

    let vcs = GitCli;
    vcs.push(&repo, &remote)
        .await
        .with_context(|| format!("failed to push to {remote}"))?;
    println!("{} Pushed to {remote}", "✓".bright_green());

    let url = vcs
        .create_review_request(&repo, &base, &title, &args.body)
        .await
        .context("failed to open a pull request")?;
    println!("{} {}", "✓".bright_green(), url.bright_cyan());
    Ok(0)
}
