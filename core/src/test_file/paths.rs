use std::path::Path;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex_lite::Regex;

static PACKAGE_DECL: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"(?m)^\s*package\s+([A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*)*)\s*;") {
        Ok(regex) => regex,
        Err(err) => panic!("invalid package regex: {err}"),
    }
});

/// Dotted package named by the first `package` declaration in `source`.
pub fn declared_package(source: &str) -> Option<String> {
    PACKAGE_DECL.captures(source).map(|captures| {
        captures[1]
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect()
    })
}

/// `org.example.util` or `org/example/util` to a relative directory.
pub fn package_dir(package: &str) -> PathBuf {
    package
        .split(['.', '/'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// `Outer$Inner` and `org/x/Outer$Inner` both map to `Outer`.
pub fn outer_class_name(class_name: &str) -> &str {
    let simple = class_name.rsplit('/').next().unwrap_or(class_name);
    simple.split('$').next().unwrap_or(simple)
}

/// `<test_dir>/<package>/<Class>Test.java`
pub fn test_file_path(test_dir: &Path, package: &str, class_name: &str) -> PathBuf {
    test_dir
        .join(package_dir(package))
        .join(format!("{}Test.java", outer_class_name(class_name)))
}

/// `<test_dir>/<package>/<Class>GeneratedTest.java`
pub fn generated_test_path(test_dir: &Path, package: &str, class_name: &str) -> PathBuf {
    test_dir
        .join(package_dir(package))
        .join(format!("{}GeneratedTest.java", outer_class_name(class_name)))
}

/// Where the production source of a class lives. Falls back to
/// `<Outer>.java` when the report carries no source file name.
pub fn source_file_path(
    source_dir: &Path,
    package: &str,
    class_name: &str,
    source_file: Option<&str>,
) -> PathBuf {
    let file = match source_file {
        Some(file) => file.to_string(),
        None => format!("{}.java", outer_class_name(class_name)),
    };
    source_dir.join(package_dir(package)).join(file)
}
