use std::collections::HashSet;
use std::ops::Range;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tree_sitter::Node;
use tree_sitter::Parser;
use tree_sitter::Tree;

const INDENT: &str = "    ";
const SNIPPET_CLASS_OPEN: &str = "class CovpilotSnippet {\n";

static PARSER: Lazy<Mutex<Parser>> = Lazy::new(|| {
    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&tree_sitter_java::LANGUAGE.into()) {
        panic!("failed to load Java grammar: {err}");
    }
    Mutex::new(parser)
});

fn parse_tree(source: &str) -> Result<Tree, String> {
    let mut parser = PARSER
        .lock()
        .map_err(|_| "failed to lock java parser".to_string())?;
    parser
        .parse(source, None)
        .ok_or_else(|| "failed to parse java source".to_string())
}

/// One direct member of a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Member {
    pub kind: String,
    pub method_name: Option<String>,
}

/// The top-level class of a test file, reduced to what insertion needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestContainer {
    pub name: String,
    pub members: Vec<Member>,
    /// Byte offset of the `}` closing the class body.
    pub close_brace: usize,
    pub imports: Vec<String>,
    /// Byte offset just past the last import, or the package declaration.
    pub import_anchor: Option<usize>,
}

impl TestContainer {
    pub fn parse(source: &str) -> Result<Self, String> {
        let tree = parse_tree(source)?;
        let root = tree.root_node();
        let bytes = source.as_bytes();

        let mut cursor = root.walk();
        let top_level: Vec<Node> = root.named_children(&mut cursor).collect();

        let mut imports = Vec::new();
        let mut import_anchor = None;
        for node in &top_level {
            match node.kind() {
                "import_declaration" => {
                    if let Ok(text) = node.utf8_text(bytes) {
                        imports.push(normalize_import(text));
                    }
                    import_anchor = Some(node.end_byte());
                }
                "package_declaration" if import_anchor.is_none() => {
                    import_anchor = Some(node.end_byte());
                }
                _ => {}
            }
        }

        let classes: Vec<Node> = top_level
            .iter()
            .copied()
            .filter(|node| node.kind() == "class_declaration")
            .collect();
        let class = classes
            .iter()
            .copied()
            .find(|node| is_public(*node, bytes))
            .or_else(|| classes.first().copied())
            .ok_or_else(|| "no top-level class declaration".to_string())?;

        let name = class
            .child_by_field_name("name")
            .and_then(|node| node.utf8_text(bytes).ok())
            .unwrap_or_default()
            .to_string();
        let body = class
            .child_by_field_name("body")
            .ok_or_else(|| format!("class {name} has no body"))?;

        let mut cursor = body.walk();
        let close_brace = body
            .children(&mut cursor)
            .filter(|node| node.kind() == "}" && !node.is_missing())
            .last()
            .map(|node| node.start_byte())
            .ok_or_else(|| format!("class {name} has no closing brace"))?;

        let members = body_members(body, bytes)
            .into_iter()
            .map(|(member, _)| member)
            .collect();

        Ok(Self {
            name,
            members,
            close_brace,
            imports,
            import_anchor,
        })
    }

    pub fn method_names(&self) -> HashSet<&str> {
        self.members
            .iter()
            .filter_map(|member| member.method_name.as_deref())
            .collect()
    }
}

/// Generated code reduced to class members plus the imports it asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snippet {
    pub imports: Vec<String>,
    /// Members indented one level, without a trailing newline.
    pub body: String,
    pub methods: Vec<(String, Range<usize>)>,
    pub member_count: usize,
}

impl Snippet {
    /// Accepts bare members, or a whole compilation unit whose first class
    /// body is lifted out. `import` lines are collected and `package` lines
    /// dropped.
    pub fn parse(code: &str) -> Result<Self, String> {
        let mut imports = Vec::new();
        let mut rest = Vec::new();
        for line in code.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("import ") && trimmed.ends_with(';') {
                imports.push(normalize_import(trimmed));
            } else if trimmed.starts_with("package ") && trimmed.ends_with(';') {
                continue;
            } else {
                rest.push(line);
            }
        }
        let rest = rest.join("\n");
        let members = lift_class_body(&rest)?.unwrap_or(rest);
        let body = reindent(&members);

        let wrapped = format!("{SNIPPET_CLASS_OPEN}{body}\n}}\n");
        let tree = parse_tree(&wrapped)?;
        let bytes = wrapped.as_bytes();
        let root = tree.root_node();
        let mut cursor = root.walk();
        let class_body = root
            .named_children(&mut cursor)
            .find(|node| node.kind() == "class_declaration")
            .and_then(|node| node.child_by_field_name("body"));

        let offset = SNIPPET_CLASS_OPEN.len();
        let (methods, member_count) = match class_body {
            Some(class_body) => {
                let members = body_members(class_body, bytes);
                let count = members.len();
                let methods = members
                    .into_iter()
                    .filter_map(|(member, name_range)| {
                        let name = member.method_name?;
                        let range = name_range?;
                        if range.start < offset || range.end > offset + body.len() {
                            return None;
                        }
                        Some((name, range.start - offset..range.end - offset))
                    })
                    .collect();
                (methods, count)
            }
            None => (Vec::new(), 0),
        };

        Ok(Self {
            imports,
            body,
            methods,
            member_count,
        })
    }

    /// Renames the only method of the snippet when it clashes with `taken`.
    /// Returns the original name when a rename happened.
    pub fn avoid_collision(&mut self, taken: &HashSet<&str>) -> Option<(String, String)> {
        if self.member_count != 1 || self.methods.len() != 1 {
            return None;
        }
        let (name, range) = self.methods[0].clone();
        if !taken.contains(name.as_str()) {
            return None;
        }
        let renamed = (2..)
            .map(|suffix| format!("{name}{suffix}"))
            .find(|candidate| !taken.contains(candidate.as_str()))?;
        let start = range.start;
        self.body.replace_range(range, &renamed);
        self.methods[0] = (renamed.clone(), start..start + renamed.len());
        Some((name, renamed))
    }

    pub fn method_name(&self) -> Option<&str> {
        self.methods.first().map(|(name, _)| name.as_str())
    }
}

fn body_members(body: Node, bytes: &[u8]) -> Vec<(Member, Option<Range<usize>>)> {
    let mut cursor = body.walk();
    body.named_children(&mut cursor)
        .filter(|node| !matches!(node.kind(), "line_comment" | "block_comment"))
        .map(|node| {
            let name_node = (node.kind() == "method_declaration")
                .then(|| node.child_by_field_name("name"))
                .flatten();
            let method_name = name_node
                .and_then(|name| name.utf8_text(bytes).ok())
                .map(str::to_string);
            (
                Member {
                    kind: node.kind().to_string(),
                    method_name,
                },
                name_node.map(|name| name.byte_range()),
            )
        })
        .collect()
}

fn is_public(class: Node, bytes: &[u8]) -> bool {
    let mut cursor = class.walk();
    class
        .children(&mut cursor)
        .filter(|node| node.kind() == "modifiers")
        .filter_map(|node| node.utf8_text(bytes).ok())
        .any(|text| text.split_whitespace().any(|word| word == "public"))
}

/// When `code` is a well-formed class, returns the text between its braces.
fn lift_class_body(code: &str) -> Result<Option<String>, String> {
    if !code.contains("class ") {
        return Ok(None);
    }
    let tree = parse_tree(code)?;
    let root = tree.root_node();
    if root.has_error() {
        return Ok(None);
    }
    let mut cursor = root.walk();
    let Some(body) = root
        .named_children(&mut cursor)
        .find(|node| node.kind() == "class_declaration")
        .and_then(|node| node.child_by_field_name("body"))
    else {
        return Ok(None);
    };
    let range = body.byte_range();
    let inner = &code[range.start + 1..range.end - 1];
    Ok(Some(inner.to_string()))
}

/// Strips the common leading whitespace and indents every non-blank line one
/// level. Blank lines at either end are dropped.
pub(crate) fn reindent(code: &str) -> String {
    let lines: Vec<&str> = code.lines().map(str::trim_end).collect();
    let Some(first) = lines.iter().position(|line| !line.is_empty()) else {
        return String::new();
    };
    let last = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .unwrap_or(first);
    let lines = &lines[first..=last];
    let common = lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{INDENT}{}", line.get(common..).unwrap_or(line.trim_start()))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_import(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
