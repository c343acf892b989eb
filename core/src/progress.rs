use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::info;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Build,
    Select,
    Synthesize,
    Mutate,
    Verify,
    Commit,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::Build => "build",
            Step::Select => "select",
            Step::Synthesize => "synthesize",
            Step::Mutate => "mutate",
            Step::Verify => "verify",
            Step::Commit => "commit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    /// Did not succeed but the run carried on.
    Warning,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    pub detail: String,
    pub duration: Duration,
}

/// Receives progress as the pipeline moves between steps.
pub trait Progress: Send + Sync {
    fn step_started(&self, step: Step, detail: &str);

    fn step_finished(&self, record: &StepRecord);

    /// Free-form operator output such as a code preview or an output tail.
    fn message(&self, step: Step, text: &str);
}

/// Routes progress into `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn step_started(&self, step: Step, detail: &str) {
        info!(%step, detail, "step started");
    }

    fn step_finished(&self, record: &StepRecord) {
        match record.status {
            StepStatus::Ok | StepStatus::Skipped => info!(
                step = %record.step,
                status = ?record.status,
                detail = %record.detail,
                "step finished"
            ),
            StepStatus::Warning | StepStatus::Failed => warn!(
                step = %record.step,
                status = ?record.status,
                detail = %record.detail,
                "step finished"
            ),
        }
    }

    fn message(&self, step: Step, text: &str) {
        info!(%step, "{text}");
    }
}
