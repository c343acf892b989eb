use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Coverage dimension a [`Counter`] measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Instruction,
    Branch,
    Line,
    Complexity,
    Method,
    Class,
    /// Any type attribute the report emits that we do not model explicitly.
    Other(String),
}

impl CounterKind {
    pub fn as_str(&self) -> &str {
        match self {
            CounterKind::Instruction => "INSTRUCTION",
            CounterKind::Branch => "BRANCH",
            CounterKind::Line => "LINE",
            CounterKind::Complexity => "COMPLEXITY",
            CounterKind::Method => "METHOD",
            CounterKind::Class => "CLASS",
            CounterKind::Other(raw) => raw.as_str(),
        }
    }
}

impl FromStr for CounterKind {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw.trim().to_ascii_uppercase().as_str() {
            "INSTRUCTION" => CounterKind::Instruction,
            "BRANCH" => CounterKind::Branch,
            "LINE" => CounterKind::Line,
            "COMPLEXITY" => CounterKind::Complexity,
            "METHOD" => CounterKind::Method,
            "CLASS" => CounterKind::Class,
            _ => CounterKind::Other(raw.trim().to_string()),
        })
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A missed/covered pair for one coverage dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub kind: CounterKind,
    pub missed: u64,
    pub covered: u64,
}

impl Counter {
    pub fn new(kind: CounterKind, missed: u64, covered: u64) -> Self {
        Self {
            kind,
            missed,
            covered,
        }
    }

    pub fn total(&self) -> u64 {
        self.missed + self.covered
    }

    /// Covered share in percent; `0.0` when nothing was instrumented.
    pub fn percent(&self) -> f64 {
        percent(self.covered, self.total())
    }

    pub fn summary(&self) -> CounterSummary {
        CounterSummary::new(self.missed, self.covered)
    }
}

/// Aggregated view of one counter kind over some subtree of the report.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CounterSummary {
    pub missed: u64,
    pub covered: u64,
    pub total: u64,
    pub percent: f64,
}

impl CounterSummary {
    pub fn new(missed: u64, covered: u64) -> Self {
        let total = missed + covered;
        Self {
            missed,
            covered,
            total,
            percent: percent(covered, total),
        }
    }

    pub fn add(self, other: CounterSummary) -> Self {
        Self::new(self.missed + other.missed, self.covered + other.covered)
    }
}

impl fmt::Display for CounterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.2}%)", self.covered, self.total, self.percent)
    }
}

pub(crate) fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 * 100.0 / total as f64
    }
}

pub(crate) fn find<'a>(counters: &'a [Counter], kind: &CounterKind) -> Option<&'a Counter> {
    counters.iter().find(|counter| &counter.kind == kind)
}
