use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use covpilot_core::Result;
use covpilot_core::config::PipelineConfig;
use covpilot_core::pipeline::Pipeline;
use covpilot_core::pipeline::RunOptions;
use covpilot_core::vcs::VersionControl;
use covpilot_git_tooling::CommitOutcome;
use covpilot_git_tooling::GitToolingError;
use covpilot_synthesis::BackendError;
use covpilot_synthesis::RetryPolicy;
use covpilot_synthesis::SynthesisBackend;
use covpilot_synthesis::SynthesisClient;
use tempfile::TempDir;

pub(crate) const GENERATED: &str = "@Test\nvoid barReturnsFortyTwo() {\n    assertEquals(42, new Foo().bar());\n}";

/// A throwaway Maven-shaped project with one class `com.example.Foo`.
pub(crate) struct Project {
    _dir: TempDir,
    pub config: PipelineConfig,
}

impl Project {
    pub fn new(bar_missed: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let codebase = dir.path().join("codebase");
        let config = PipelineConfig {
            codebase_root: codebase.clone(),
            build_command: "true".to_string(),
            verify_command: "true".to_string(),
            build_timeout: 30,
            trend_log: Some(dir.path().join("docs/coverage_history.md")),
            ..PipelineConfig::default()
        };

        write(
            &config.source_dir().join("com/example/Foo.java"),
            "package com.example;\n\npublic class Foo {\n    public int bar() { return 42; }\n}\n",
        );
        write(
            &config.test_dir().join("com/example/FooTest.java"),
            "package com.example;\n\nimport org.junit.jupiter.api.Test;\n\npublic class FooTest {}\n",
        );
        write(&config.report_file(), &report_xml(bar_missed));
        Self { _dir: dir, config }
    }

    pub fn test_file(&self) -> PathBuf {
        self.config.test_dir().join("com/example/FooTest.java")
    }

    pub fn pipeline(&self, backend: Arc<ScriptedBackend>, vcs: Arc<FakeVcs>) -> Pipeline {
        let synthesis = SynthesisClient::new(
            backend,
            RetryPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(1),
            },
        );
        Pipeline::new(self.config.clone(), synthesis, vcs)
    }

    pub fn pipeline_with(
        &self,
        backend: Arc<ScriptedBackend>,
        vcs: Arc<FakeVcs>,
        options: RunOptions,
    ) -> Pipeline {
        self.pipeline(backend, vcs).with_options(options)
    }
}

pub(crate) fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

pub(crate) fn report_xml(bar_missed: u64) -> String {
    let bar_covered = 4 - bar_missed.min(4);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="example">
  <sessioninfo id="s" start="1" dump="2"/>
  <package name="com/example">
    <class name="com/example/Foo" sourcefilename="Foo.java">
      <method name="&lt;init&gt;" desc="()V" line="3">
        <counter type="INSTRUCTION" missed="0" covered="3"/>
      </method>
      <method name="bar" desc="()I" line="4">
        <counter type="INSTRUCTION" missed="{bar_missed}" covered="{bar_covered}"/>
      </method>
      <counter type="INSTRUCTION" missed="{bar_missed}" covered="{}"/>
    </class>
    <sourcefile name="Foo.java">
      <counter type="INSTRUCTION" missed="{bar_missed}" covered="{}"/>
    </sourcefile>
  </package>
  <counter type="INSTRUCTION" missed="{bar_missed}" covered="{}"/>
</report>
"#,
        bar_covered + 3,
        bar_covered + 3,
        bar_covered + 3,
    )
}

/// Backend that gives the same answer to every prompt.
pub(crate) struct ScriptedBackend {
    reply: std::result::Result<String, BackendError>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

/// Records VCS calls instead of touching a repository.
#[derive(Default)]
pub(crate) struct FakeVcs {
    pub calls: Mutex<Vec<String>>,
    pub fail_commit: bool,
}

impl FakeVcs {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_commit: true,
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn stage_all(&self, repo: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("add {}", repo.display()));
        Ok(())
    }

    async fn commit(&self, _repo: &Path, message: &str) -> Result<CommitOutcome> {
        self.calls.lock().unwrap().push(format!("commit {message}"));
        if self.fail_commit {
            return Err(GitToolingError::CommandFailed {
                command: "git commit".to_string(),
                status: "exit status: 128".to_string(),
                stderr: "fatal: not a git repository".to_string(),
            }
            .into());
        }
        Ok(CommitOutcome::Created)
    }

    async fn push(&self, _repo: &Path, remote: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("push {remote}"));
        Ok(())
    }

    async fn create_review_request(
        &self,
        _repo: &Path,
        base: &str,
        title: &str,
        _body: &str,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("pr {base} {title}"));
        Ok("https://example.invalid/pr/1".to_string())
    }
}
