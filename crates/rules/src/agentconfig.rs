//! Legacy `.agentconfig` files: several rules in one markdown file, each
//! introduced by an HTML comment holding YAML metadata.
//!
//! ```text
//! <!-- @meta
//! id: testing
//! alwaysApply: false
//! -->
//! Rule body...
//! ```

use std::path::Path;

use tracing::warn;

use rulebook_core::{Result, RuleBlock, RulesError};

use crate::frontmatter::{metadata_from_mapping, trim_with_position, ParseMode};
use crate::{glob_yaml, privacy};

const MARKER: &str = "<!-- @meta";
const CLOSE: &str = "-->";

struct Fence {
    /// 1-based line of the marker.
    line: usize,
    yaml: String,
    /// Text from the marker up to the body, kept for lenient fallback.
    raw: String,
    body: String,
    body_line: usize,
}

/// Parse every fenced rule in `content`.
///
/// A file without any marker has no rules. Unset `alwaysApply` defaults to
/// `true`; a missing id becomes `rule-<n>`.
pub fn parse(content: &str, mode: ParseMode, path: &Path) -> Result<Vec<RuleBlock>> {
    let fences = split_fences(content, path)?;
    let mut rules = Vec::with_capacity(fences.len());

    for (index, fence) in fences.into_iter().enumerate() {
        let (mapping, body, body_line) = match glob_yaml::decode(&fence.yaml) {
            Ok(mapping) => (mapping, fence.body, fence.body_line),
            Err(e) if mode == ParseMode::Strict => {
                return Err(RulesError::parse(path, format!("line {}: {e}", fence.line)));
            }
            Err(e) => {
                warn!(path = %path.display(), line = fence.line, error = %e, "invalid rule metadata, treating as content");
                let text = format!("{}{}", fence.raw, fence.body);
                (Default::default(), text, fence.line)
            }
        };

        let mut metadata = metadata_from_mapping(&mapping);
        if metadata.id.is_empty() {
            metadata.id = format!("rule-{}", index + 1);
        }
        privacy::classify(&mut metadata, &privacy::file_name(path));
        if metadata.always_apply.is_none() {
            metadata.always_apply = Some(true);
        }

        let (content, position) = trim_with_position(&body, body_line);
        rules.push(RuleBlock {
            metadata,
            content,
            position: Some(position),
        });
    }

    Ok(rules)
}

fn split_fences(content: &str, path: &Path) -> Result<Vec<Fence>> {
    let mut fences: Vec<Fence> = Vec::new();
    let mut lines = content.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let Some(rest) = line.trim_start().strip_prefix(MARKER) else {
            if let Some(fence) = fences.last_mut() {
                fence.body.push_str(line);
                fence.body.push('\n');
            }
            continue;
        };

        let mut yaml = String::new();
        let mut raw = format!("{line}\n");
        let mut body_line = index + 2;

        // Metadata may follow the marker on the same line.
        let mut closed = take_until_close(rest, &mut yaml);
        while !closed {
            let Some((i, next)) = lines.next() else {
                return Err(RulesError::parse(
                    path,
                    format!("line {}: unterminated {MARKER} block", index + 1),
                ));
            };
            raw.push_str(next);
            raw.push('\n');
            body_line = i + 2;
            closed = take_until_close(next, &mut yaml);
        }

        fences.push(Fence {
            line: index + 1,
            yaml,
            raw,
            body: String::new(),
            body_line,
        });
    }

    Ok(fences)
}

/// Append `text` up to the closing `-->`; true once it was found.
fn take_until_close(text: &str, yaml: &mut String) -> bool {
    match text.find(CLOSE) {
        Some(end) => {
            yaml.push_str(&text[..end]);
            true
        }
        None => {
            yaml.push_str(text);
            yaml.push('\n');
            false
        }
    }
}
