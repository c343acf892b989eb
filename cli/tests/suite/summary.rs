use anyhow::Result;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use pretty_assertions::assert_eq;

use super::fixture::Workspace;

#[test]
fn appends_to_configured_trend_log() -> Result<()> {
    let workspace = Workspace::new()?;

    workspace
        .command()?
        .args(["summary", "--note", "baseline"])
        .assert()
        .success()
        .stdout(contains("83/313 (26.52%)").and(contains("2/8 (25.00%)")));

    workspace
        .command()?
        .arg("summary")
        .assert()
        .success();

    let history = workspace.read("docs/coverage_history.md")?;
    let lines: Vec<&str> = history.lines().collect();
    assert_eq!(lines.len(), 4, "{history}");
    assert_eq!(lines[0], "| Timestamp | Instruction | Branch | Note |");
    assert!(lines[2].ends_with("| 83/313 (26.52%) | 2/8 (25.00%) | baseline |"));
    assert!(lines[3].ends_with("| automated entry |"));

    Ok(())
}

#[test]
fn explicit_report_and_history_work_without_config() -> Result<()> {
    let workspace = Workspace::new()?;
    std::fs::remove_file(workspace.join("covpilot.toml"))?;

    workspace
        .command()?
        .args([
            "summary",
            "--report",
            "app/target/site/jacoco/jacoco.xml",
            "--history",
            "out/history.md",
        ])
        .assert()
        .success();

    let history = workspace.read("out/history.md")?;
    assert!(history.contains("| 83/313 (26.52%) | 2/8 (25.00%) | automated entry |"));

    Ok(())
}
