//! Splicing generated members into Java test classes.
//!
//! The test file is parsed with tree-sitter into a container node; the
//! generated code is parsed as a class body fragment. The new member is
//! appended after the existing ones, immediately before the container's real
//! closing brace, and any imports it needs are merged into the import block.

mod java;
mod paths;
mod scaffold;

use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use java::Snippet;
use java::TestContainer;
pub use paths::declared_package;
pub use paths::generated_test_path;
pub use paths::outer_class_name;
pub use paths::package_dir;
pub use paths::source_file_path;
pub use paths::test_file_path;
pub use scaffold::scaffold;
pub use scaffold::scaffold_for_source;

#[derive(Debug, Error)]
pub enum TestFileError {
    #[error("test file {path:?} does not exist")]
    TargetMissing { path: PathBuf },

    #[error("no insertion point in {path:?}: {reason}")]
    InsertionPointNotFound { path: PathBuf, reason: String },

    #[error("cannot scaffold a test for {path:?}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    pub path: PathBuf,
    pub container: String,
    /// Name of the inserted method, after any rename.
    pub method_name: Option<String>,
    /// Set when the generated method clashed with an existing one.
    pub renamed_from: Option<String>,
    pub added_imports: Vec<String>,
}

/// Appends `code` as a new member of the top-level class in `test_file`.
///
/// Never creates the file. Fails with [`TestFileError::InsertionPointNotFound`]
/// when the file has no top-level class whose body is properly closed.
pub fn insert(test_file: &Path, code: &str) -> Result<InsertOutcome, TestFileError> {
    if !test_file.is_file() {
        return Err(TestFileError::TargetMissing {
            path: test_file.to_path_buf(),
        });
    }
    let source = std::fs::read_to_string(test_file).map_err(|source| TestFileError::Io {
        path: test_file.to_path_buf(),
        source,
    })?;
    let not_found = |reason: String| TestFileError::InsertionPointNotFound {
        path: test_file.to_path_buf(),
        reason,
    };

    let container = TestContainer::parse(&source).map_err(not_found)?;
    let mut snippet = Snippet::parse(code).map_err(not_found)?;
    if snippet.body.is_empty() {
        return Err(not_found("generated code is empty".to_string()));
    }
    let renamed = snippet.avoid_collision(&container.method_names());
    let added_imports: Vec<String> = snippet
        .imports
        .iter()
        .filter(|import| !container.imports.contains(*import))
        .cloned()
        .collect();

    let updated = render(&source, &container, &snippet.body, &added_imports);
    std::fs::write(test_file, updated).map_err(|source| TestFileError::Io {
        path: test_file.to_path_buf(),
        source,
    })?;

    let outcome = InsertOutcome {
        path: test_file.to_path_buf(),
        container: container.name,
        method_name: snippet.method_name().map(str::to_string),
        renamed_from: renamed.map(|(original, _)| original),
        added_imports,
    };
    info!(
        path = %outcome.path.display(),
        method = ?outcome.method_name,
        renamed_from = ?outcome.renamed_from,
        "inserted generated test"
    );
    Ok(outcome)
}

fn render(source: &str, container: &TestContainer, body: &str, imports: &[String]) -> String {
    let close = container.close_brace;
    let head = source[..close].trim_end();
    let separator = if container.members.is_empty() { "\n" } else { "\n\n" };
    let mut tail = source[close..].to_string();
    if !tail.ends_with('\n') {
        tail.push('\n');
    }
    let with_member = format!("{head}{separator}{body}\n{tail}");

    if imports.is_empty() {
        return with_member;
    }
    let block = imports.join("\n");
    match container.import_anchor {
        Some(anchor) if container.imports.is_empty() => format!(
            "{}\n\n{block}{}",
            &with_member[..anchor],
            &with_member[anchor..]
        ),
        Some(anchor) => format!(
            "{}\n{block}{}",
            &with_member[..anchor],
            &with_member[anchor..]
        ),
        None => format!("{block}\n\n{with_member}"),
    }
}
