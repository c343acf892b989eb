use anyhow::Result;
use predicates::str::contains;
use pretty_assertions::assert_eq;

use super::fixture::Workspace;

const SCAFFOLD: &str = "app/src/test/java/com/example/ParserGeneratedTest.java";

#[test]
fn creates_generated_test_next_to_package() -> Result<()> {
    let workspace = Workspace::new()?;

    workspace
        .command()?
        .args(["scaffold", "app/src/main/java/com/example/Parser.java"])
        .assert()
        .success()
        .stdout(contains("ParserGeneratedTest.java"));

    assert_eq!(
        workspace.read(SCAFFOLD)?,
        "package com.example;\n\n\
         import static org.junit.jupiter.api.Assertions.*;\n\n\
         import org.junit.jupiter.api.Test;\n\n\
         public class ParserGeneratedTest {\n}\n"
    );

    Ok(())
}

#[test]
fn existing_scaffold_is_left_alone() -> Result<()> {
    let workspace = Workspace::new()?;
    workspace.write(SCAFFOLD, "// hand edited\n")?;

    workspace
        .command()?
        .args(["scaffold", "app/src/main/java/com/example/Parser.java"])
        .assert()
        .success();

    assert_eq!(workspace.read(SCAFFOLD)?, "// hand edited\n");
    Ok(())
}

#[test]
fn missing_source_fails() -> Result<()> {
    let workspace = Workspace::new()?;

    workspace
        .command()?
        .args(["scaffold", "app/src/main/java/com/example/Nope.java"])
        .assert()
        .code(1)
        .stderr(contains("failed to scaffold"));

    Ok(())
}
