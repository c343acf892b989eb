use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use covpilot_coverage::SelectionOptions;
use covpilot_coverage::SelectionPolicy;
use covpilot_synthesis::DEFAULT_EXCERPT_LENGTH;
use covpilot_synthesis::DEFAULT_GEMINI_BASE_URL;
use covpilot_synthesis::DEFAULT_MODEL;
use covpilot_synthesis::RetryPolicy;
use serde::Deserialize;
use serde::Serialize;

use crate::error::PipelineError;
use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = "covpilot.toml";
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Everything one pipeline pass needs, loaded from `covpilot.toml`.
///
/// Relative paths are resolved against `codebase_root`, which is itself
/// resolved against the directory holding the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub codebase_root: PathBuf,
    pub source_root: PathBuf,
    pub test_root: PathBuf,
    pub report_path: PathBuf,
    pub build_command: String,
    pub verify_command: String,
    /// Seconds before an external command is killed.
    pub build_timeout: u64,
    /// Build output line worth echoing after verification.
    pub summary_marker: String,
    /// Working tree for commits; defaults to `codebase_root`.
    pub repo_root: Option<PathBuf>,
    /// Markdown table of coverage over time, appended on each selection.
    pub trend_log: Option<PathBuf>,
    /// Create a `<Class>GeneratedTest.java` when the companion test is absent.
    pub scaffold_missing: bool,
    pub synthesis: SynthesisConfig,
    pub selection: SelectionConfig,
    pub commit: CommitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            codebase_root: PathBuf::from("codebase"),
            source_root: PathBuf::from("src/main/java"),
            test_root: PathBuf::from("src/test/java"),
            report_path: PathBuf::from("target/site/jacoco/jacoco.xml"),
            build_command: "mvn clean verify".to_string(),
            verify_command: "mvn test".to_string(),
            build_timeout: 300,
            summary_marker: "Tests run:".to_string(),
            repo_root: None,
            trend_log: None,
            scaffold_missing: false,
            synthesis: SynthesisConfig::default(),
            selection: SelectionConfig::default(),
            commit: CommitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub base_url: String,
    /// Falls back to `GEMINI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub model: String,
    /// Total attempts, including the first.
    pub retry_count: u32,
    /// Seconds between attempts.
    pub retry_backoff: u64,
    pub excerpt_length: usize,
    pub language: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            retry_count: retry.max_attempts,
            retry_backoff: retry.backoff.as_secs(),
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            language: "java".to_string(),
        }
    }
}

impl SynthesisConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_count,
            backoff: Duration::from_secs(self.retry_backoff),
        }
    }

    /// The configured key, else the environment's.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: SelectionPolicy,
    #[serde(flatten)]
    pub options: SelectionOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitConfig {
    pub enabled: bool,
    pub remote: String,
    pub base: String,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: "origin".to_string(),
            base: "main".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Reads and validates `path`. Relative roots are anchored at the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(dir) = path.parent() {
            config.anchor(dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| PipelineError::Config(err.to_string()))
    }

    /// Makes `codebase_root` (and other root-relative paths outside it)
    /// absolute with respect to `dir`.
    pub fn anchor(&mut self, dir: &Path) {
        if self.codebase_root.is_relative() {
            self.codebase_root = dir.join(&self.codebase_root);
        }
        if let Some(repo_root) = self.repo_root.as_mut()
            && repo_root.is_relative()
        {
            *repo_root = dir.join(&*repo_root);
        }
        if let Some(trend_log) = self.trend_log.as_mut()
            && trend_log.is_relative()
        {
            *trend_log = dir.join(&*trend_log);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.build_command.trim().is_empty() {
            return Err(PipelineError::Config("build_command must not be empty".into()));
        }
        if self.verify_command.trim().is_empty() {
            return Err(PipelineError::Config("verify_command must not be empty".into()));
        }
        if self.build_timeout == 0 {
            return Err(PipelineError::Config("build_timeout must be greater than zero".into()));
        }
        if self.synthesis.retry_count == 0 {
            return Err(PipelineError::Config(
                "synthesis.retry_count must be greater than zero".into(),
            ));
        }
        if self.synthesis.excerpt_length == 0 {
            return Err(PipelineError::Config(
                "synthesis.excerpt_length must be greater than zero".into(),
            ));
        }
        let cutoff = self.selection.options.coverage_cutoff;
        if !(0.0..=100.0).contains(&cutoff) {
            return Err(PipelineError::Config(format!(
                "selection.coverage_cutoff must be within 0..=100, got {cutoff}"
            )));
        }
        Ok(())
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout)
    }

    pub fn report_file(&self) -> PathBuf {
        self.codebase_root.join(&self.report_path)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.codebase_root.join(&self.source_root)
    }

    pub fn test_dir(&self) -> PathBuf {
        self.codebase_root.join(&self.test_root)
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.repo_root
            .clone()
            .unwrap_or_else(|| self.codebase_root.clone())
    }
}
