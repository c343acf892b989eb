use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

pub(crate) const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="app">
  <sessioninfo id="s" start="1" dump="2"/>
  <package name="com/example">
    <class name="com/example/Parser" sourcefilename="Parser.java">
      <method name="&lt;init&gt;" desc="()V" line="3">
        <counter type="INSTRUCTION" missed="0" covered="3"/>
      </method>
      <method name="parse" desc="()V" line="5">
        <counter type="INSTRUCTION" missed="5" covered="0"/>
      </method>
      <counter type="INSTRUCTION" missed="90" covered="10"/>
      <counter type="BRANCH" missed="4" covered="0"/>
    </class>
    <class name="com/example/Parser$Inner" sourcefilename="Parser.java">
      <counter type="INSTRUCTION" missed="100" covered="0"/>
    </class>
    <class name="com/example/Lexer" sourcefilename="Lexer.java">
      <counter type="INSTRUCTION" missed="30" covered="70"/>
      <counter type="BRANCH" missed="2" covered="2"/>
    </class>
    <class name="com/example/Small" sourcefilename="Small.java">
      <counter type="INSTRUCTION" missed="10" covered="0"/>
    </class>
  </package>
  <counter type="INSTRUCTION" missed="230" covered="83"/>
  <counter type="BRANCH" missed="6" covered="2"/>
</report>
"#;

const CONFIG: &str = r#"codebase_root = "app"
build_command = "true"
verify_command = "true"
build_timeout = 30
trend_log = "docs/coverage_history.md"

[commit]
enabled = false
"#;

/// A project directory holding `covpilot.toml` and a Maven-shaped `app/`.
pub(crate) struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        Self::with_config(CONFIG)
    }

    pub fn with_config(config: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let workspace = Self { dir };
        workspace.write("covpilot.toml", config)?;
        workspace.write("app/target/site/jacoco/jacoco.xml", REPORT)?;
        workspace.write(
            "app/src/main/java/com/example/Parser.java",
            "package com.example;\n\npublic class Parser {\n    public void parse() {}\n}\n",
        )?;
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.join(relative))?)
    }

    /// `covpilot` running inside the workspace without credentials.
    pub fn command(&self) -> Result<assert_cmd::Command> {
        let mut cmd = assert_cmd::Command::cargo_bin("covpilot")?;
        cmd.current_dir(self.path())
            .env_remove("GEMINI_API_KEY")
            .env_remove("RUST_LOG");
        Ok(cmd)
    }
}
