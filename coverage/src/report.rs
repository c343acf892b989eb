use std::collections::HashSet;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use tracing::debug;

use crate::counter::Counter;
use crate::counter::CounterKind;
use crate::counter::CounterSummary;
use crate::counter::find;
use crate::error::CoverageError;
use crate::error::Result;

/// In-memory model of one JaCoCo XML snapshot.
///
/// Built once per parse and read-only afterwards. Packages, classes and
/// methods keep the order in which the artifact lists them so that
/// first-found selection is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    name: Option<String>,
    counters: Vec<Counter>,
    packages: Vec<PackageCoverage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageCoverage {
    name: String,
    counters: Vec<Counter>,
    classes: Vec<ClassCoverage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassCoverage {
    name: String,
    source_file: Option<String>,
    counters: Vec<Counter>,
    methods: Vec<MethodCoverage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCoverage {
    name: String,
    descriptor: String,
    line: Option<u32>,
    counters: Vec<Counter>,
}

impl CoverageReport {
    /// Reads and parses the artifact at `path`.
    pub fn parse(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoverageError::ArtifactNotFound {
                path: path.to_path_buf(),
            });
        }
        let xml = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::InvalidData {
                CoverageError::malformed(format!("{} is not valid UTF-8", path.display()))
            } else {
                CoverageError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let report = Self::from_xml(&xml)?;
        debug!(
            path = %path.display(),
            packages = report.packages.len(),
            "parsed coverage report"
        );
        Ok(report)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut builder = ReportBuilder::default();
        loop {
            let position = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(start)) => builder.open(&start)?,
                Ok(Event::Empty(start)) => {
                    builder.open(&start)?;
                    builder.close()?;
                }
                Ok(Event::End(_)) => builder.close()?,
                Ok(Event::Eof) => break,
                // Declarations, the JaCoCo DOCTYPE, comments and whitespace
                // carry nothing we model. The DTD is never fetched.
                Ok(_) => {}
                Err(err) => {
                    return Err(CoverageError::malformed(format!(
                        "{err} (near byte {position})"
                    )));
                }
            }
        }
        builder.finish()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn packages(&self) -> &[PackageCoverage] {
        &self.packages
    }

    /// Report-level counters as emitted by the tool, if any.
    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    /// Sums `kind` across the whole report.
    ///
    /// Report-level counters are authoritative when present; otherwise the
    /// totals are rebuilt from packages, classes and finally methods.
    pub fn aggregate(&self, kind: &CounterKind) -> CounterSummary {
        if let Some(counter) = find(&self.counters, kind) {
            return counter.summary();
        }
        self.packages
            .iter()
            .map(|package| package.aggregate(kind))
            .fold(CounterSummary::default(), CounterSummary::add)
    }

    pub fn class_count(&self) -> usize {
        self.packages.iter().map(|p| p.classes.len()).sum()
    }

    pub fn method_count(&self) -> usize {
        self.packages
            .iter()
            .flat_map(|p| p.classes.iter())
            .map(|c| c.methods.len())
            .sum()
    }
}

impl PackageCoverage {
    /// Slashed namespace path, e.g. `org/apache/commons/lang3`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dotted_name(&self) -> String {
        self.name.replace('/', ".")
    }

    pub fn classes(&self) -> &[ClassCoverage] {
        &self.classes
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn aggregate(&self, kind: &CounterKind) -> CounterSummary {
        if let Some(counter) = find(&self.counters, kind) {
            return counter.summary();
        }
        self.classes
            .iter()
            .map(|class| class.aggregate(kind))
            .fold(CounterSummary::default(), CounterSummary::add)
    }
}

impl ClassCoverage {
    /// Fully-qualified slashed name, e.g. `org/example/Foo$Bar`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the package path, e.g. `Foo$Bar`.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Enclosing top-level class name, e.g. `Foo` for `Foo$Bar`.
    pub fn outer_name(&self) -> &str {
        let simple = self.simple_name();
        simple.split('$').next().unwrap_or(simple)
    }

    pub fn is_inner(&self) -> bool {
        self.simple_name().contains('$')
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn methods(&self) -> &[MethodCoverage] {
        &self.methods
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn counter(&self, kind: &CounterKind) -> Option<&Counter> {
        find(&self.counters, kind)
    }

    pub fn aggregate(&self, kind: &CounterKind) -> CounterSummary {
        if let Some(counter) = find(&self.counters, kind) {
            return counter.summary();
        }
        self.methods
            .iter()
            .filter_map(|method| method.counter(kind))
            .map(Counter::summary)
            .fold(CounterSummary::default(), CounterSummary::add)
    }
}

impl MethodCoverage {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// JVM type descriptor, e.g. `(Ljava/lang/String;)Z`.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// `name` immediately followed by the descriptor.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn counter(&self, kind: &CounterKind) -> Option<&Counter> {
        find(&self.counters, kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Report,
    Group,
    Package,
    Class,
    Method,
    Counter,
    Other,
}

#[derive(Default)]
struct ReportBuilder {
    stack: Vec<Element>,
    report: Option<CoverageReport>,
    seen_root: bool,
    package_names: HashSet<String>,
    package: Option<PackageCoverage>,
    class: Option<ClassCoverage>,
    method: Option<MethodCoverage>,
}

impl ReportBuilder {
    fn open(&mut self, start: &BytesStart<'_>) -> Result<()> {
        let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let parent = self.stack.last().copied();

        let element = match (parent, tag.as_str()) {
            (None, "report") => {
                if self.seen_root {
                    return Err(CoverageError::malformed("multiple root elements"));
                }
                self.seen_root = true;
                self.report = Some(CoverageReport {
                    name: attr(start, "name")?,
                    counters: Vec::new(),
                    packages: Vec::new(),
                });
                Element::Report
            }
            (None, other) => {
                return Err(CoverageError::malformed(format!(
                    "expected <report> root element, found <{other}>"
                )));
            }
            (Some(Element::Report | Element::Group), "group") => Element::Group,
            (Some(Element::Report | Element::Group), "package") => {
                self.package = Some(PackageCoverage {
                    name: required_attr(start, "package", "name")?,
                    counters: Vec::new(),
                    classes: Vec::new(),
                });
                Element::Package
            }
            (Some(Element::Package), "class") => {
                self.class = Some(ClassCoverage {
                    name: required_attr(start, "class", "name")?,
                    source_file: attr(start, "sourcefilename")?,
                    counters: Vec::new(),
                    methods: Vec::new(),
                });
                Element::Class
            }
            (Some(Element::Class), "method") => {
                let line = attr(start, "line")?
                    .map(|raw| parse_number::<u32>(&raw, "method", "line"))
                    .transpose()?;
                self.method = Some(MethodCoverage {
                    name: required_attr(start, "method", "name")?,
                    descriptor: required_attr(start, "method", "desc")?,
                    line,
                    counters: Vec::new(),
                });
                Element::Method
            }
            (Some(parent), "counter") => {
                let counter = parse_counter(start)?;
                if let Some(target) = self.counter_target(parent) {
                    if find(target, &counter.kind).is_some() {
                        return Err(CoverageError::malformed(format!(
                            "duplicate {} counter in one element",
                            counter.kind
                        )));
                    }
                    target.push(counter);
                }
                Element::Counter
            }
            _ => Element::Other,
        };
        self.stack.push(element);
        Ok(())
    }

    /// Counters nested in groups, source files or unknown elements are
    /// aggregates we recompute ourselves, so they are dropped.
    fn counter_target(&mut self, parent: Element) -> Option<&mut Vec<Counter>> {
        match parent {
            Element::Report => self.report.as_mut().map(|r| &mut r.counters),
            Element::Package => self.package.as_mut().map(|p| &mut p.counters),
            Element::Class => self.class.as_mut().map(|c| &mut c.counters),
            Element::Method => self.method.as_mut().map(|m| &mut m.counters),
            Element::Group | Element::Counter | Element::Other => None,
        }
    }

    fn close(&mut self) -> Result<()> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| CoverageError::malformed("unbalanced closing tag"))?;
        match element {
            Element::Method => {
                if let (Some(method), Some(class)) = (self.method.take(), self.class.as_mut()) {
                    class.methods.push(method);
                }
            }
            Element::Class => {
                if let (Some(class), Some(package)) = (self.class.take(), self.package.as_mut()) {
                    package.classes.push(class);
                }
            }
            Element::Package => {
                if let (Some(package), Some(report)) = (self.package.take(), self.report.as_mut())
                {
                    if !self.package_names.insert(package.name.clone()) {
                        return Err(CoverageError::malformed(format!(
                            "package {} listed more than once",
                            package.name
                        )));
                    }
                    report.packages.push(package);
                }
            }
            Element::Report | Element::Group | Element::Counter | Element::Other => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<CoverageReport> {
        if let Some(open) = self.stack.last() {
            return Err(CoverageError::malformed(format!(
                "document ended inside an unclosed {open:?} element"
            )));
        }
        self.report
            .ok_or_else(|| CoverageError::malformed("missing <report> root element"))
    }
}

fn attr(start: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attribute in start.attributes() {
        let attribute = attribute
            .map_err(|err| CoverageError::malformed(format!("invalid attribute: {err}")))?;
        if attribute.key.as_ref() == key.as_bytes() {
            let value = attribute.unescape_value().map_err(|err| {
                CoverageError::malformed(format!("invalid value for attribute {key}: {err}"))
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(start: &BytesStart<'_>, element: &str, key: &str) -> Result<String> {
    attr(start, key)?.ok_or_else(|| {
        CoverageError::malformed(format!("<{element}> is missing required attribute {key}"))
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, element: &str, key: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        CoverageError::malformed(format!(
            "<{element}> attribute {key} is not a number: {raw:?}"
        ))
    })
}

fn parse_counter(start: &BytesStart<'_>) -> Result<Counter> {
    let kind = required_attr(start, "counter", "type")?
        .parse::<CounterKind>()
        .unwrap_or_else(|never| match never {});
    let missed = parse_number(&required_attr(start, "counter", "missed")?, "counter", "missed")?;
    let covered = parse_number(
        &required_attr(start, "counter", "covered")?,
        "counter",
        "covered",
    )?;
    Ok(Counter::new(kind, missed, covered))
}
