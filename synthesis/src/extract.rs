const FENCE: &str = "```";

struct FencedBlock<'a> {
    tag: &'a str,
    lines: Vec<&'a str>,
}

/// Reduces a model reply to the code we splice into the test file.
///
/// Preference order: the first block fenced with `language`, then the first
/// fenced block of any kind, then the whole reply. Surrounding blank lines are
/// dropped but indentation is kept. Returns `None` when nothing is left.
pub fn extract_code(raw: &str, language: &str) -> Option<String> {
    let blocks = fenced_blocks(raw);
    let chosen = blocks
        .iter()
        .find(|block| block.tag.eq_ignore_ascii_case(language))
        .or_else(|| blocks.first());

    let lines: Vec<&str> = match chosen {
        Some(block) => block.lines.clone(),
        None => raw.lines().collect(),
    };
    let first = lines.iter().position(|line| !line.trim().is_empty())?;
    let last = lines.iter().rposition(|line| !line.trim().is_empty())?;
    Some(lines[first..=last].join("\n").trim_end().to_string())
}

fn fenced_blocks(raw: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock<'_>> = None;
    for line in raw.lines() {
        let trimmed = line.trim_start();
        match (current.take(), trimmed.strip_prefix(FENCE)) {
            (None, Some(info)) => {
                let tag = info.split_whitespace().next().unwrap_or("");
                current = Some(FencedBlock {
                    tag,
                    lines: Vec::new(),
                });
            }
            (None, None) => {}
            (Some(block), Some(_)) => blocks.push(block),
            (Some(mut block), None) => {
                block.lines.push(line);
                current = Some(block);
            }
        }
    }
    // An unterminated fence runs to the end of the reply.
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}
