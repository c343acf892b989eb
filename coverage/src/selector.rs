use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::counter::CounterKind;
use crate::report::ClassCoverage;
use crate::report::CoverageReport;
use crate::report::MethodCoverage;
use crate::report::PackageCoverage;

/// How the next remediation target is chosen from a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// First method in document order that satisfies the uncovered predicate.
    #[default]
    FirstFound,
    /// Large, poorly covered classes, lowest `min(instruction%, branch%)` first.
    WorstFirst,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "first-found" | "first" => Ok(SelectionPolicy::FirstFound),
            "worst-first" | "worst" => Ok(SelectionPolicy::WorstFirst),
            other => Err(format!(
                "unknown selection policy `{other}` (expected first-found or worst-first)"
            )),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::FirstFound => f.write_str("first-found"),
            SelectionPolicy::WorstFirst => f.write_str("worst-first"),
        }
    }
}

/// Thresholds and filters shared by both policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// Worst-first only considers classes with strictly more instructions.
    pub instruction_threshold: u64,
    /// Worst-first only keeps classes whose weaker ratio is below this percent.
    pub coverage_cutoff: f64,
    /// First-found treats a method as uncovered once it misses this many
    /// instructions.
    pub min_missed: u64,
    /// Restrict to packages whose name starts with this prefix, written
    /// dotted or slashed.
    pub package_prefix: Option<String>,
    pub skip_inner_classes: bool,
    pub skip_test_classes: bool,
    /// Upper bound on `select_many` results.
    pub limit: Option<usize>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            instruction_threshold: 50,
            coverage_cutoff: 90.0,
            min_missed: 1,
            package_prefix: None,
            skip_inner_classes: false,
            skip_test_classes: false,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapTarget {
    Method { name: String, descriptor: String },
    Class,
}

/// One candidate for remediation. Derived from a report, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageGap {
    /// Slashed package path.
    pub package: String,
    /// Fully-qualified slashed class name.
    pub class_name: String,
    pub source_file: Option<String>,
    pub target: GapTarget,
    pub missed: u64,
    pub covered: u64,
    /// Ratio the policy ranked on.
    pub percent: f64,
    pub instruction_percent: f64,
    pub branch_percent: f64,
    pub missed_branches: u64,
}

impl CoverageGap {
    pub fn simple_class_name(&self) -> &str {
        self.class_name.rsplit('/').next().unwrap_or(&self.class_name)
    }

    /// Top-level class that owns the gap; inner classes map to their outer
    /// class since they share its source and test files.
    pub fn outer_class_name(&self) -> &str {
        let simple = self.simple_class_name();
        simple.split('$').next().unwrap_or(simple)
    }

    pub fn dotted_class_name(&self) -> String {
        self.class_name.replace('/', ".")
    }

    pub fn method_signature(&self) -> Option<String> {
        match &self.target {
            GapTarget::Method { name, descriptor } => Some(format!("{name}{descriptor}")),
            GapTarget::Class => None,
        }
    }

    /// `Class.signature` for methods, `Class` for class-level gaps.
    pub fn describe(&self) -> String {
        match self.method_signature() {
            Some(signature) => format!("{}.{signature}", self.simple_class_name()),
            None => self.simple_class_name().to_string(),
        }
    }
}

/// Returns the single next gap to work on, or `None` when the coverage goal
/// is met.
pub fn select(
    report: &CoverageReport,
    policy: SelectionPolicy,
    options: &SelectionOptions,
) -> Option<CoverageGap> {
    match policy {
        SelectionPolicy::FirstFound => first_found(report, options).next(),
        SelectionPolicy::WorstFirst => worst_first(report, options).into_iter().next(),
    }
}

/// Every gap the policy accepts, in policy order, truncated to `limit`.
pub fn select_many(
    report: &CoverageReport,
    policy: SelectionPolicy,
    options: &SelectionOptions,
) -> Vec<CoverageGap> {
    let limit = options.limit.unwrap_or(usize::MAX);
    match policy {
        SelectionPolicy::FirstFound => first_found(report, options).take(limit).collect(),
        SelectionPolicy::WorstFirst => {
            let mut gaps = worst_first(report, options);
            gaps.truncate(limit);
            gaps
        }
    }
}

fn candidate_classes<'a>(
    report: &'a CoverageReport,
    options: &'a SelectionOptions,
) -> impl Iterator<Item = (&'a PackageCoverage, &'a ClassCoverage)> + 'a {
    report
        .packages()
        .iter()
        .filter(move |package| match &options.package_prefix {
            Some(prefix) => package
                .dotted_name()
                .starts_with(prefix.replace('/', ".").as_str()),
            None => true,
        })
        .flat_map(|package| package.classes().iter().map(move |class| (package, class)))
        .filter(move |(_, class)| !(options.skip_inner_classes && class.is_inner()))
        .filter(move |(_, class)| !(options.skip_test_classes && class.simple_name().contains("Test")))
}

fn first_found<'a>(
    report: &'a CoverageReport,
    options: &'a SelectionOptions,
) -> impl Iterator<Item = CoverageGap> + 'a {
    let min_missed = options.min_missed.max(1);
    candidate_classes(report, options).flat_map(move |(package, class)| {
        class.methods().iter().filter_map(move |method| {
            let instructions = method.counter(&CounterKind::Instruction)?;
            (instructions.missed >= min_missed).then(|| method_gap(package, class, method))
        })
    })
}

fn method_gap(
    package: &PackageCoverage,
    class: &ClassCoverage,
    method: &MethodCoverage,
) -> CoverageGap {
    let instructions = method
        .counter(&CounterKind::Instruction)
        .map(crate::Counter::summary)
        .unwrap_or_default();
    let branches = method
        .counter(&CounterKind::Branch)
        .map(crate::Counter::summary)
        .unwrap_or_default();
    CoverageGap {
        package: package.name().to_string(),
        class_name: class.name().to_string(),
        source_file: class.source_file().map(str::to_string),
        target: GapTarget::Method {
            name: method.name().to_string(),
            descriptor: method.descriptor().to_string(),
        },
        missed: instructions.missed,
        covered: instructions.covered,
        percent: instructions.percent,
        instruction_percent: instructions.percent,
        branch_percent: branches.percent,
        missed_branches: branches.missed,
    }
}

fn worst_first(report: &CoverageReport, options: &SelectionOptions) -> Vec<CoverageGap> {
    let mut gaps: Vec<CoverageGap> = candidate_classes(report, options)
        .filter_map(|(package, class)| {
            let instructions = class.aggregate(&CounterKind::Instruction);
            // Also drops total == 0, whose ratio is undefined.
            if instructions.total == 0 || instructions.total <= options.instruction_threshold {
                return None;
            }
            let branches = class.aggregate(&CounterKind::Branch);
            let weakest = instructions.percent.min(branches.percent);
            if weakest >= options.coverage_cutoff {
                return None;
            }
            Some(CoverageGap {
                package: package.name().to_string(),
                class_name: class.name().to_string(),
                source_file: class.source_file().map(str::to_string),
                target: GapTarget::Class,
                missed: instructions.missed,
                covered: instructions.covered,
                percent: weakest,
                instruction_percent: instructions.percent,
                branch_percent: branches.percent,
                missed_branches: branches.missed,
            })
        })
        .collect();
    // Stable: ties keep document order.
    gaps.sort_by(|a, b| a.percent.total_cmp(&b.percent));
    gaps
}
