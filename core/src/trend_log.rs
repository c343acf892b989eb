use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use covpilot_coverage::CounterKind;
use covpilot_coverage::CounterSummary;
use covpilot_coverage::CoverageReport;
use serde::Serialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::error::Result;

pub const DEFAULT_NOTE: &str = "automated entry";

const HEADER: &str = "| Timestamp | Instruction | Branch | Note |\n| --- | --- | --- | --- |\n";

/// One row of the coverage history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendEntry {
    pub timestamp: DateTime<Utc>,
    pub instruction: CounterSummary,
    pub branch: CounterSummary,
    pub note: String,
}

impl TrendEntry {
    pub fn from_report(report: &CoverageReport, note: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            instruction: report.aggregate(&CounterKind::Instruction),
            branch: report.aggregate(&CounterKind::Branch),
            note: note.into(),
        }
    }

    pub fn render(&self) -> String {
        let note = self.note.replace(['|', '\n', '\r'], " ");
        format!(
            "| {} | {} | {} | {} |\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.instruction,
            self.branch,
            note.trim()
        )
    }
}

/// Append-only markdown table at `path`.
#[derive(Debug, Clone)]
pub struct TrendLog {
    path: PathBuf,
}

impl TrendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &TrendEntry) -> Result<()> {
        let io_err = |source| PipelineError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let fresh = std::fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        if fresh {
            file.write_all(HEADER.as_bytes()).map_err(io_err)?;
        }
        file.write_all(entry.render().as_bytes()).map_err(io_err)?;
        debug!(path = %self.path.display(), note = %entry.note, "appended coverage trend row");
        Ok(())
    }
}
