#![cfg(unix)]

use anyhow::Result;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

use super::fixture::Workspace;

#[test]
fn dry_run_reports_next_gap_without_credentials() -> Result<()> {
    let workspace = Workspace::new()?;

    workspace
        .command()?
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(
            contains("build succeeded")
                .and(contains("Next gap:"))
                .and(contains("Parser.parse()V"))
                .and(contains("com.example.Parser")),
        );

    let history = workspace.read("docs/coverage_history.md")?;
    assert!(history.contains("| before Parser.parse()V |"), "{history}");
    assert!(!workspace.join("app/src/test/java").exists());

    Ok(())
}

#[test]
fn failing_build_prints_tail_and_exits_with_one() -> Result<()> {
    let workspace = Workspace::with_config(
        "codebase_root = \"app\"\nbuild_command = \"sh -c 'echo compiling; echo BUILD FAILURE; exit 3'\"\n",
    )?;

    workspace
        .command()?
        .args(["run", "--dry-run"])
        .assert()
        .code(1)
        .stdout(contains("compiling").and(contains("BUILD FAILURE")))
        .stderr(contains("failed (exit code Some(3))"));

    Ok(())
}

#[test]
fn missing_api_key_is_a_config_error() -> Result<()> {
    let workspace = Workspace::new()?;

    workspace
        .command()?
        .arg("run")
        .assert()
        .code(2)
        .stderr(contains("GEMINI_API_KEY"));

    Ok(())
}

#[test]
fn missing_config_is_a_usage_error() -> Result<()> {
    let workspace = Workspace::new()?;
    std::fs::remove_file(workspace.join("covpilot.toml"))?;

    workspace
        .command()?
        .args(["run", "--dry-run"])
        .assert()
        .code(2)
        .stderr(contains("covpilot.toml not found"));

    Ok(())
}

#[test]
fn unknown_flag_is_rejected_by_clap() -> Result<()> {
    let workspace = Workspace::new()?;

    workspace
        .command()?
        .args(["run", "--frobnicate"])
        .assert()
        .code(2);

    Ok(())
}
