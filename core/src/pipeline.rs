//! One pass of coverage-gap-driven test augmentation.
//!
//! `Build → Select → Synthesize → Mutate → Verify → Commit`. The first four
//! steps are fatal on failure; a failing verification is only a warning and
//! so is a failing commit, since the new test is already on disk by then.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use covpilot_coverage::CoverageGap;
use covpilot_coverage::CoverageReport;
use covpilot_coverage::select;
use covpilot_git_tooling::CommitOutcome;
use covpilot_synthesis::GeminiBackend;
use covpilot_synthesis::SynthesisClient;
use covpilot_synthesis::SynthesisRequest;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::build_runner;
use crate::build_runner::BuildOutcome;
use crate::build_runner::BuildStatus;
use crate::config::API_KEY_ENV_VAR;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::error::Result;
use crate::progress::Progress;
use crate::progress::Step;
use crate::progress::StepRecord;
use crate::progress::StepStatus;
use crate::progress::TracingProgress;
use crate::test_file;
use crate::test_file::InsertOutcome;
use crate::trend_log::TrendEntry;
use crate::trend_log::TrendLog;
use crate::vcs::GitCli;
use crate::vcs::VersionControl;

/// Lines of build output kept for a fatal build failure.
pub const BUILD_TAIL_LINES: usize = 50;
/// Characters of generated code echoed after synthesis.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Stop after selection and report the gap.
    pub dry_run: bool,
    /// Skip the commit step regardless of configuration.
    pub no_commit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CommitStatus {
    Created,
    NothingToCommit,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The coverage goal is met; nothing to do.
    NoGap,
    DryRun {
        gap: CoverageGap,
        source_file: PathBuf,
    },
    Completed {
        gap: CoverageGap,
        inserted: InsertOutcome,
        verified: bool,
        commit: CommitStatus,
    },
}

/// Every visited step, then how the run ended.
#[derive(Debug)]
pub struct PipelineReport {
    pub steps: Vec<StepRecord>,
    pub outcome: Result<PipelineOutcome>,
}

impl PipelineReport {
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Ok(_) => 0,
            Err(_) => 1,
        }
    }

    pub fn step(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.step == step)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    synthesis: SynthesisClient,
    vcs: Arc<dyn VersionControl>,
    progress: Arc<dyn Progress>,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        synthesis: SynthesisClient,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        Self {
            config,
            synthesis,
            vcs,
            progress: Arc::new(TracingProgress),
            options: RunOptions::default(),
        }
    }

    /// Wires the Gemini backend and the `git` CLI from `config`. A dry run
    /// never reaches the backend, so it does not need credentials.
    pub fn from_config(config: PipelineConfig, options: RunOptions) -> Result<Self> {
        let api_key = match config.synthesis.resolve_api_key() {
            Some(key) => key,
            None if options.dry_run => String::new(),
            None => {
                return Err(PipelineError::Config(format!(
                    "no API key: set synthesis.api_key or {API_KEY_ENV_VAR}"
                )));
            }
        };
        let backend = GeminiBackend::new(
            config.synthesis.base_url.clone(),
            api_key,
            config.synthesis.model.clone(),
        );
        let synthesis = SynthesisClient::new(Arc::new(backend), config.synthesis.retry_policy());
        Ok(Self::new(config, synthesis, Arc::new(GitCli)).with_options(options))
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self) -> PipelineReport {
        let mut steps = Vec::new();
        let outcome = self.drive(&mut steps).await;
        if let Err(err) = &outcome {
            debug!("pipeline stopped: {err}");
        }
        PipelineReport { steps, outcome }
    }

    async fn drive(&self, steps: &mut Vec<StepRecord>) -> Result<PipelineOutcome> {
        self.build(steps).await?;

        let Some((gap, source_file)) = self.select(steps)? else {
            return Ok(PipelineOutcome::NoGap);
        };
        if self.options.dry_run {
            return Ok(PipelineOutcome::DryRun { gap, source_file });
        }

        let source = read_source(&source_file)?;
        let code = self.synthesize(steps, &gap, &source).await?;
        let inserted = self.mutate(steps, &gap, &source, &code)?;
        let verified = self.verify(steps).await;
        let commit = self.commit(steps, &gap).await;

        Ok(PipelineOutcome::Completed {
            gap,
            inserted,
            verified,
            commit,
        })
    }

    fn begin(&self, step: Step, detail: &str) -> Instant {
        self.progress.step_started(step, detail);
        Instant::now()
    }

    fn finish(
        &self,
        steps: &mut Vec<StepRecord>,
        step: Step,
        started: Instant,
        status: StepStatus,
        detail: impl Into<String>,
    ) {
        let record = StepRecord {
            step,
            status,
            detail: detail.into(),
            duration: started.elapsed(),
        };
        self.progress.step_finished(&record);
        steps.push(record);
    }

    async fn build(&self, steps: &mut Vec<StepRecord>) -> Result<()> {
        let command = &self.config.build_command;
        let started = self.begin(Step::Build, command);
        let build = build_runner::run(
            command,
            &self.config.codebase_root,
            self.config.build_timeout(),
        )
        .await;
        if build.success() {
            self.finish(steps, Step::Build, started, StepStatus::Ok, "build succeeded");
            return Ok(());
        }

        let tail = build.tail(BUILD_TAIL_LINES);
        self.progress.message(Step::Build, &tail);
        let err = build_error(command, &build, tail, self.config.build_timeout);
        self.finish(steps, Step::Build, started, StepStatus::Failed, err.to_string());
        Err(err)
    }

    fn select(&self, steps: &mut Vec<StepRecord>) -> Result<Option<(CoverageGap, PathBuf)>> {
        let report_file = self.config.report_file();
        let started = self.begin(Step::Select, &report_file.display().to_string());
        let report = match CoverageReport::parse(&report_file) {
            Ok(report) => report,
            Err(err) => {
                self.finish(steps, Step::Select, started, StepStatus::Failed, err.to_string());
                return Err(err.into());
            }
        };
        let selection = &self.config.selection;
        let gap = select(&report, selection.policy, &selection.options);

        // The history is a side record; failing to write it never stops a run.
        let mut trend_warning = None;
        if let Some(path) = &self.config.trend_log {
            let note = match &gap {
                Some(gap) => format!("before {}", gap.describe()),
                None => "no gap".to_string(),
            };
            if let Err(err) = TrendLog::new(path).append(&TrendEntry::from_report(&report, note)) {
                warn!("coverage history not updated: {err}");
                self.progress
                    .message(Step::Select, &format!("coverage history not updated: {err}"));
                trend_warning = Some(err.to_string());
            }
        }
        let status = if trend_warning.is_some() {
            StepStatus::Warning
        } else {
            StepStatus::Ok
        };
        let with_warning = |detail: String| match &trend_warning {
            Some(warning) => format!("{detail}; coverage history not updated: {warning}"),
            None => detail,
        };

        let Some(gap) = gap else {
            self.finish(
                steps,
                Step::Select,
                started,
                status,
                with_warning("no coverage gap found".to_string()),
            );
            return Ok(None);
        };

        let source_file = test_file::source_file_path(
            &self.config.source_dir(),
            &gap.package,
            &gap.class_name,
            gap.source_file.as_deref(),
        );
        if !source_file.is_file() {
            let err = PipelineError::SourceMissing {
                class: gap.dotted_class_name(),
                path: source_file,
            };
            self.finish(steps, Step::Select, started, StepStatus::Failed, err.to_string());
            return Err(err);
        }

        self.finish(
            steps,
            Step::Select,
            started,
            status,
            with_warning(format!(
                "{} ({} missed, {:.2}% covered)",
                gap.describe(),
                gap.missed,
                gap.percent
            )),
        );
        Ok(Some((gap, source_file)))
    }

    async fn synthesize(
        &self,
        steps: &mut Vec<StepRecord>,
        gap: &CoverageGap,
        source: &str,
    ) -> Result<String> {
        let started = self.begin(Step::Synthesize, self.synthesis.model());
        let synthesis = &self.config.synthesis;
        let request = SynthesisRequest::new(
            gap.outer_class_name(),
            gap.method_signature()
                .unwrap_or_else(|| "any method with uncovered instructions".to_string()),
            source,
            synthesis.excerpt_length,
            synthesis.language.clone(),
        );
        match self.synthesis.synthesize(&request).await {
            Ok(result) => {
                self.progress.message(Step::Synthesize, &preview(&result.code));
                self.finish(
                    steps,
                    Step::Synthesize,
                    started,
                    StepStatus::Ok,
                    format!("received code after {} attempt(s)", result.attempts),
                );
                Ok(result.code)
            }
            Err(err) => {
                self.finish(steps, Step::Synthesize, started, StepStatus::Failed, err.to_string());
                Err(err.into())
            }
        }
    }

    fn mutate(
        &self,
        steps: &mut Vec<StepRecord>,
        gap: &CoverageGap,
        source: &str,
        code: &str,
    ) -> Result<InsertOutcome> {
        let package = test_file::declared_package(source).unwrap_or_else(|| gap.package.clone());
        let test_dir = self.config.test_dir();
        let companion = test_file::test_file_path(&test_dir, &package, &gap.class_name);
        let started = self.begin(Step::Mutate, &companion.display().to_string());

        let target = if !companion.is_file() && self.config.scaffold_missing {
            match test_file::scaffold(&test_dir, &package, &gap.class_name) {
                Ok(path) => path,
                Err(err) => {
                    self.finish(steps, Step::Mutate, started, StepStatus::Failed, err.to_string());
                    return Err(err.into());
                }
            }
        } else {
            companion
        };

        match test_file::insert(&target, code) {
            Ok(inserted) => {
                let mut detail = format!("added to {}", inserted.path.display());
                if let (Some(from), Some(to)) = (&inserted.renamed_from, &inserted.method_name) {
                    detail.push_str(&format!(" (renamed {from} to {to})"));
                }
                self.finish(steps, Step::Mutate, started, StepStatus::Ok, detail);
                Ok(inserted)
            }
            Err(err) => {
                self.finish(steps, Step::Mutate, started, StepStatus::Failed, err.to_string());
                Err(err.into())
            }
        }
    }

    async fn verify(&self, steps: &mut Vec<StepRecord>) -> bool {
        let command = &self.config.verify_command;
        let started = self.begin(Step::Verify, command);
        let build = build_runner::run(
            command,
            &self.config.codebase_root,
            self.config.build_timeout(),
        )
        .await;
        let summary = build
            .summary(&self.config.summary_marker)
            .map(str::to_string);
        if build.success() {
            let detail = summary.unwrap_or_else(|| "verification passed".to_string());
            self.finish(steps, Step::Verify, started, StepStatus::Ok, detail);
            true
        } else {
            self.progress.message(Step::Verify, &build.tail(BUILD_TAIL_LINES));
            let detail = match summary {
                Some(summary) => format!("verification failed, review manually: {summary}"),
                None => "verification failed, review manually".to_string(),
            };
            self.finish(steps, Step::Verify, started, StepStatus::Warning, detail);
            false
        }
    }

    async fn commit(&self, steps: &mut Vec<StepRecord>, gap: &CoverageGap) -> CommitStatus {
        let message = format!("Add test for {}", gap.describe());
        let started = self.begin(Step::Commit, &message);
        if !self.config.commit.enabled || self.options.no_commit {
            self.finish(steps, Step::Commit, started, StepStatus::Skipped, "commit disabled");
            return CommitStatus::Skipped;
        }

        let repo = self.config.repo_dir();
        let result = match self.vcs.stage_all(&repo).await {
            Ok(()) => self.vcs.commit(&repo, &message).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(CommitOutcome::Created) => {
                self.finish(steps, Step::Commit, started, StepStatus::Ok, message);
                CommitStatus::Created
            }
            Ok(CommitOutcome::NothingToCommit) => {
                self.finish(steps, Step::Commit, started, StepStatus::Ok, "nothing to commit");
                CommitStatus::NothingToCommit
            }
            Err(err) => {
                let detail = err.to_string();
                self.finish(steps, Step::Commit, started, StepStatus::Warning, detail.clone());
                CommitStatus::Failed(detail)
            }
        }
    }
}

fn build_error(command: &str, build: &BuildOutcome, tail: String, timeout: u64) -> PipelineError {
    match build.status {
        BuildStatus::TimedOut => PipelineError::BuildTimedOut {
            command: command.to_string(),
            seconds: timeout,
            tail,
        },
        BuildStatus::Failure | BuildStatus::Success => PipelineError::BuildFailed {
            command: command.to_string(),
            exit_code: build.exit_code,
            tail,
        },
    }
}

fn read_source(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn preview(code: &str) -> String {
    match code.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}\n...", &code[..cut]),
        None => code.to_string(),
    }
}
