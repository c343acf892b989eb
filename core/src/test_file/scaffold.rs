use std::path::Path;
use std::path::PathBuf;

use tracing::info;

use super::TestFileError;
use super::paths::declared_package;
use super::paths::generated_test_path;
use super::paths::outer_class_name;

/// Creates `<Class>GeneratedTest.java` with JUnit 5 imports and an empty
/// body. An existing file is left untouched and its path returned.
pub fn scaffold(test_dir: &Path, package: &str, class_name: &str) -> Result<PathBuf, TestFileError> {
    let path = generated_test_path(test_dir, package, class_name);
    if path.exists() {
        info!(path = %path.display(), "scaffold already present");
        return Ok(path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| TestFileError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let contents = render(package, outer_class_name(class_name));
    std::fs::write(&path, contents).map_err(|source| TestFileError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "created test scaffold");
    Ok(path)
}

/// Scaffolds for a production source file, taking the package from its
/// declaration and the class from the file stem.
pub fn scaffold_for_source(test_dir: &Path, source_file: &Path) -> Result<PathBuf, TestFileError> {
    let class_name = source_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| is_java_identifier(stem))
        .ok_or_else(|| TestFileError::InvalidSource {
            path: source_file.to_path_buf(),
            reason: "file name is not a Java class name".to_string(),
        })?;
    let source = std::fs::read_to_string(source_file).map_err(|source| TestFileError::Io {
        path: source_file.to_path_buf(),
        source,
    })?;
    let package = declared_package(&source).unwrap_or_default();
    scaffold(test_dir, &package, class_name)
}

fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn render(package: &str, class_name: &str) -> String {
    let dotted = package.replace('/', ".");
    let mut out = String::new();
    if !dotted.is_empty() {
        out.push_str(&format!("package {dotted};\n\n"));
    }
    out.push_str("import static org.junit.jupiter.api.Assertions.*;\n\n");
    out.push_str("import org.junit.jupiter.api.Test;\n\n");
    out.push_str(&format!("public class {class_name}GeneratedTest {{\n}}\n"));
    out
}
