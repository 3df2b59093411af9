//! Markdown documents with a `---` delimited YAML frontmatter block.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use rulebook_core::{Patterns, Priority, Result, RuleMetadata, RulesError, SourcePosition};

use crate::glob_yaml;

const DELIMITER: &str = "---";

/// How unparsable metadata is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Treat the block as plain content and log a warning.
    #[default]
    Lenient,
    /// Return [`RulesError::Parse`].
    Strict,
}

impl ParseMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict { ParseMode::Strict } else { ParseMode::Lenient }
    }
}

/// A parsed markdown document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub frontmatter: Mapping,
    /// Body with surrounding whitespace removed.
    pub body: String,
    pub position: SourcePosition,
    pub has_frontmatter: bool,
}

/// Split `content` into frontmatter text, body text and the 1-based line the
/// body starts on. Returns `None` when there is no complete block.
pub fn split(content: &str) -> Option<(&str, &str, usize)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    let mut line_no = 1;
    for line in lines {
        line_no += 1;
        if line.trim_end() == DELIMITER {
            let body_start = offset + line.len();
            return Some((&content[yaml_start..offset], &content[body_start..], line_no + 1));
        }
        offset += line.len();
    }
    None
}

/// Parse a document, honoring `mode` when the frontmatter is invalid.
pub fn parse(content: &str, mode: ParseMode, path: &Path) -> Result<Document> {
    let Some((yaml, body, body_line)) = split(content) else {
        return Ok(plain(content));
    };

    match glob_yaml::decode(yaml) {
        Ok(frontmatter) => {
            let (body, position) = trim_with_position(body, body_line);
            Ok(Document {
                frontmatter,
                body,
                position,
                has_frontmatter: true,
            })
        }
        Err(e) if mode == ParseMode::Strict => Err(RulesError::parse(path, e.to_string())),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid frontmatter, treating as content");
            Ok(plain(content))
        }
    }
}

fn plain(content: &str) -> Document {
    let (body, position) = trim_with_position(content, 1);
    Document {
        frontmatter: Mapping::new(),
        body,
        position,
        has_frontmatter: false,
    }
}

/// Trim `text` and report the line span of what remains, given the line
/// `text` begins on.
pub(crate) fn trim_with_position(text: &str, first_line: usize) -> (String, SourcePosition) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        let position = SourcePosition {
            start_line: first_line,
            end_line: first_line,
        };
        return (String::new(), position);
    }
    let leading = &text[..text.len() - text.trim_start().len()];
    let start_line = first_line + leading.matches('\n').count();
    let end_line = start_line + trimmed.matches('\n').count();
    (trimmed.to_string(), SourcePosition { start_line, end_line })
}

// ── Metadata conversion ───────────────────────────────────────

/// Build metadata from frontmatter. Known keys with an unexpected value type
/// are kept in `extra` unchanged.
pub fn metadata_from_mapping(mapping: &Mapping) -> RuleMetadata {
    let mut meta = RuleMetadata::default();

    for (key, value) in mapping {
        let Some(name) = key.as_str() else {
            warn!(key = ?key, "ignoring non-string frontmatter key");
            continue;
        };

        let consumed = match name {
            "id" => set(&mut meta.id, value.as_str().map(str::to_string)),
            "alwaysApply" => set_opt(&mut meta.always_apply, value.as_bool()),
            "scope" => set_opt(&mut meta.scope, patterns_from_value(value)),
            "globs" => set_opt(&mut meta.globs, patterns_from_value(value)),
            "triggers" => set_opt(&mut meta.triggers, string_list(value)),
            "manual" => set_opt(&mut meta.manual, value.as_bool()),
            "priority" => set_opt(&mut meta.priority, value.as_str().and_then(Priority::parse)),
            "description" => set_opt(&mut meta.description, value.as_str().map(str::to_string)),
            "private" => set_opt(&mut meta.private, value.as_bool()),
            _ => false,
        };

        if !consumed {
            meta.extra.insert(name.to_string(), value.clone());
        }
    }

    meta
}

fn set<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    let consumed = value.is_some();
    if consumed {
        *slot = value;
    }
    consumed
}

fn patterns_from_value(value: &Value) -> Option<Patterns> {
    match value {
        Value::String(s) => Some(Patterns::One(s.clone())),
        Value::Sequence(_) => string_list(value).map(Patterns::Many),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_sequence()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn patterns_to_value(patterns: &Patterns) -> Value {
    match patterns {
        Patterns::One(s) => Value::String(s.clone()),
        Patterns::Many(v) => Value::Sequence(v.iter().map(|s| Value::String(s.clone())).collect()),
    }
}

/// Frontmatter for export, in fixed key order followed by extension keys.
///
/// `private: false` is never written.
pub fn metadata_to_mapping(meta: &RuleMetadata, emit_id: bool, emit_private: bool) -> Mapping {
    let mut m = Mapping::new();

    if emit_id {
        m.insert("id".into(), meta.id.as_str().into());
    }
    if let Some(description) = &meta.description {
        m.insert("description".into(), description.as_str().into());
    }
    if let Some(always_apply) = meta.always_apply {
        m.insert("alwaysApply".into(), always_apply.into());
    }
    if let Some(globs) = &meta.globs {
        m.insert("globs".into(), patterns_to_value(globs));
    }
    if let Some(manual) = meta.manual {
        m.insert("manual".into(), manual.into());
    }
    if let Some(scope) = &meta.scope {
        m.insert("scope".into(), patterns_to_value(scope));
    }
    if let Some(priority) = meta.priority {
        m.insert("priority".into(), priority.as_str().into());
    }
    if let Some(triggers) = &meta.triggers {
        let items = triggers.iter().map(|t| Value::String(t.clone())).collect();
        m.insert("triggers".into(), Value::Sequence(items));
    }
    if emit_private && meta.is_private() {
        m.insert("private".into(), true.into());
    }

    for (key, value) in &meta.extra {
        let key = Value::String(key.clone());
        if !m.contains_key(&key) {
            m.insert(key, value.clone());
        }
    }

    m
}

/// Render a markdown file: frontmatter block (when non-empty) then body.
pub fn render(frontmatter: &Mapping, body: &str) -> serde_yaml::Result<String> {
    let yaml = glob_yaml::encode(frontmatter)?;
    let body = body.trim();
    if yaml.is_empty() {
        return Ok(format!("{body}\n"));
    }
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{body}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_finds_block_and_body_line() {
        let (yaml, body, line) = split("---\nid: a\n---\n\nBody\n").unwrap();
        assert_eq!(yaml, "id: a\n");
        assert_eq!(body, "\nBody\n");
        assert_eq!(line, 4);
    }

    #[test]
    fn split_requires_opening_and_closing_delimiters() {
        assert!(split("# Title\n---\n").is_none());
        assert!(split("---\nid: a\n").is_none());
        // A dashed rule inside a value line is not a delimiter.
        let (yaml, _, _) = split("---\ndescription: a --- b\n---\nx").unwrap();
        assert_eq!(yaml, "description: a --- b\n");
    }

    #[test]
    fn parse_reports_body_position() {
        let doc = parse("---\nalwaysApply: true\n---\n\nLine one\nLine two\n\n", ParseMode::Strict, Path::new("a.md"))
            .unwrap();
        assert!(doc.has_frontmatter);
        assert_eq!(doc.body, "Line one\nLine two");
        assert_eq!(doc.position, SourcePosition { start_line: 5, end_line: 6 });
    }

    #[test]
    fn parse_without_frontmatter_is_plain_content() {
        let doc = parse("# Just markdown\n", ParseMode::Strict, Path::new("a.md")).unwrap();
        assert!(!doc.has_frontmatter);
        assert!(doc.frontmatter.is_empty());
        assert_eq!(doc.body, "# Just markdown");
    }

    #[test]
    fn invalid_frontmatter_depends_on_mode() {
        let text = "---\nkey: [unclosed\n---\nBody";
        let lenient = parse(text, ParseMode::Lenient, Path::new("bad.md")).unwrap();
        assert!(!lenient.has_frontmatter);
        assert_eq!(lenient.body, text);

        let err = parse(text, ParseMode::Strict, Path::new("bad.md")).unwrap_err();
        assert!(matches!(err, RulesError::Parse { .. }));
    }

    #[test]
    fn metadata_keeps_unknown_and_mistyped_keys() {
        let mapping = glob_yaml::decode(
            "id: x\nalwaysApply: \"yes\"\nowner: platform\npriority: high\ntriggers: [lint, fmt]\n",
        )
        .unwrap();
        let meta = metadata_from_mapping(&mapping);
        assert_eq!(meta.id, "x");
        assert_eq!(meta.always_apply, None);
        assert_eq!(meta.priority, Some(Priority::High));
        assert_eq!(meta.triggers, Some(vec!["lint".to_string(), "fmt".to_string()]));
        let extra: Vec<_> = meta.extra.keys().map(String::as_str).collect();
        assert_eq!(extra, vec!["alwaysApply", "owner"]);
    }

    #[test]
    fn mapping_uses_fixed_key_order() {
        let mut meta = RuleMetadata::new("api/auth");
        meta.triggers = Some(vec!["auth".into()]);
        meta.scope = Some(Patterns::from("src/**"));
        meta.always_apply = Some(false);
        meta.description = Some("Auth rules".into());
        meta.private = Some(false);
        meta.extra.insert("owner".into(), "platform".into());

        let mapping = metadata_to_mapping(&meta, true, true);
        let keys: Vec<_> = mapping.keys().map(|k| k.as_str().unwrap()).collect();
        assert_eq!(
            keys,
            vec!["id", "description", "alwaysApply", "scope", "triggers", "owner"]
        );
    }

    #[test]
    fn render_omits_empty_frontmatter() {
        assert_eq!(render(&Mapping::new(), "  Body  ").unwrap(), "Body\n");

        let mut mapping = Mapping::new();
        mapping.insert("alwaysApply".into(), true.into());
        assert_eq!(
            render(&mapping, "Body").unwrap(),
            "---\nalwaysApply: true\n---\n\nBody\n"
        );
    }
}
