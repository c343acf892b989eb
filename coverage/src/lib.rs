//! Coverage artifact model and gap selection.
//!
//! [`CoverageReport`] turns a JaCoCo XML report into packages, classes,
//! methods and counters. [`select`] and [`select_many`] pick remediation
//! targets out of it according to a [`SelectionPolicy`].

mod counter;
mod error;
mod report;
mod selector;

pub use counter::Counter;
pub use counter::CounterKind;
pub use counter::CounterSummary;
pub use error::CoverageError;
pub use error::Result;
pub use report::ClassCoverage;
pub use report::CoverageReport;
pub use report::MethodCoverage;
pub use report::PackageCoverage;
pub use selector::CoverageGap;
pub use selector::GapTarget;
pub use selector::SelectionOptions;
pub use selector::SelectionPolicy;
pub use selector::select;
pub use selector::select_many;
