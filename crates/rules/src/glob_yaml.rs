//! Frontmatter YAML codec that keeps glob patterns bare.
//!
//! Tools write `globs: *.ts` without quotes, which a YAML parser reads as an
//! alias. Decoding quotes such values before parsing; encoding strips the
//! quotes the serializer adds, for the `globs` key only.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde_yaml::{Mapping, Value};

static STAR_SCALAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*[\w.-]+:[ \t]+)(\*.*?)\s*$").expect("valid regex"));
static STAR_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*-[ \t]+)(\*.*?)\s*$").expect("valid regex"));
static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]*)(?:-[ \t]+)?(?:[\w.-]+:[ \t]+)?[|>][-+0-9]*[ \t]*(?:#.*)?$").expect("valid regex")
});
static GLOBS_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^globs:(.*)$").expect("valid regex"));
static SEQ_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*-[ \t]+)(.*)$").expect("valid regex"));

/// Parse a frontmatter block into a mapping.
///
/// Empty input yields an empty mapping; a document that is not a mapping is
/// an error.
pub fn decode(text: &str) -> serde_yaml::Result<Mapping> {
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let prepared = quote_star_values(text);
    match serde_yaml::from_str::<Value>(&prepared)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(serde_yaml::Error::custom(format!(
            "frontmatter must be a mapping, found {}",
            value_kind(&other)
        ))),
    }
}

/// Serialize a mapping, leaving `globs` values unquoted.
pub fn encode(mapping: &Mapping) -> serde_yaml::Result<String> {
    if mapping.is_empty() {
        return Ok(String::new());
    }
    let text = serde_yaml::to_string(mapping)?;
    Ok(unquote_globs(&text))
}

fn quote_star_values(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    // Indentation of the line that opened a `|` or `>` block scalar.
    let mut block_indent: Option<usize> = None;

    for line in text.lines() {
        if let Some(indent) = block_indent {
            if line.trim().is_empty() || indentation(line) > indent {
                out.push_str(line);
                out.push('\n');
                continue;
            }
            block_indent = None;
        }
        if let Some(caps) = BLOCK_HEADER.captures(line) {
            block_indent = Some(caps[1].len());
        }

        let caps = STAR_SCALAR.captures(line).or_else(|| STAR_ITEM.captures(line));
        match caps {
            Some(caps) => {
                out.push_str(&caps[1]);
                out.push('"');
                out.push_str(&caps[2].replace('\\', "\\\\").replace('"', "\\\""));
                out.push('"');
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn unquote_globs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_globs_seq = false;

    for line in text.lines() {
        if let Some(caps) = GLOBS_KEY.captures(line) {
            let rest = caps[1].trim();
            in_globs_seq = rest.is_empty();
            if in_globs_seq {
                out.push_str("globs:");
            } else {
                out.push_str("globs: ");
                out.push_str(&unquote(rest));
            }
        } else if let Some(caps) = SEQ_ITEM.captures(line).filter(|_| in_globs_seq) {
            out.push_str(&caps[1]);
            out.push_str(&unquote(&caps[2]));
        } else {
            if !line.starts_with([' ', '\t']) {
                in_globs_seq = false;
            }
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Remove serializer quoting when the bare form reads back as the same string.
fn unquote(scalar: &str) -> String {
    let inner = if scalar.len() >= 2 && scalar.starts_with('\'') && scalar.ends_with('\'') {
        scalar[1..scalar.len() - 1].replace("''", "'")
    } else if scalar.len() >= 2 && scalar.starts_with('"') && scalar.ends_with('"') {
        let body = &scalar[1..scalar.len() - 1];
        if body.contains('\\') && !body.contains("\\\\") && !body.contains("\\\"") {
            // Other escapes (\n, \t, unicode) have no bare spelling.
            return scalar.to_string();
        }
        body.replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        return scalar.to_string();
    };

    if reads_back_bare(&inner) {
        inner
    } else {
        scalar.to_string()
    }
}

fn reads_back_bare(value: &str) -> bool {
    if value.starts_with('*') {
        return !value.contains('\n');
    }
    let Some(first) = value.chars().next() else {
        return false;
    };
    if "{[&!|>'\"%@`#?:-,".contains(first) || first.is_whitespace() {
        return false;
    }
    if value.ends_with(char::is_whitespace) || value.contains(": ") || value.contains(" #") {
        return false;
    }
    // Bare words YAML would resolve to non-strings.
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "null" | "~"
    ) && value.parse::<f64>().is_err()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(mapping: &'a Mapping, key: &str) -> &'a Value {
        mapping.get(key).unwrap_or_else(|| panic!("missing key {key}"))
    }

    #[test]
    fn decode_bare_star_scalar() {
        let mapping = decode("globs: *.ts\nalwaysApply: false\n").unwrap();
        assert_eq!(get(&mapping, "globs"), &Value::String("*.ts".into()));
        assert_eq!(get(&mapping, "alwaysApply"), &Value::Bool(false));
    }

    #[test]
    fn decode_bare_star_sequence_items() {
        let mapping = decode("globs:\n  - *.ts\n  - **/*.tsx\n  - src/lib.rs\n").unwrap();
        let items: Vec<_> = get(&mapping, "globs")
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(items, vec!["*.ts", "**/*.tsx", "src/lib.rs"]);
    }

    #[test]
    fn decode_comma_joined_patterns_stay_one_string() {
        let mapping = decode("globs: *.ts,*.tsx").unwrap();
        assert_eq!(get(&mapping, "globs"), &Value::String("*.ts,*.tsx".into()));
    }

    #[test]
    fn decode_already_quoted_value() {
        let mapping = decode("globs: \"**/*.{ts,tsx}\"").unwrap();
        assert_eq!(get(&mapping, "globs"), &Value::String("**/*.{ts,tsx}".into()));
    }

    #[test]
    fn decode_empty_and_invalid() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n").unwrap().is_empty());
        assert!(decode("- a\n- b\n").is_err());
        assert!(decode("key: [unclosed").is_err());
    }

    #[test]
    fn decode_leaves_block_scalars_untouched() {
        let text = "description: |\n  Notes\n  - *bold* item\n  key: *value\n\n  end\nglobs: *.ts\n";
        let mapping = decode(text).unwrap();
        assert_eq!(
            get(&mapping, "description"),
            &Value::String("Notes\n- *bold* item\nkey: *value\n\nend\n".into())
        );
        assert_eq!(get(&mapping, "globs"), &Value::String("*.ts".into()));

        let folded = decode("notes: >-\n  - *a* b\ntriggers:\n  - *.md\n").unwrap();
        assert_eq!(get(&folded, "notes"), &Value::String("- *a* b".into()));
        assert_eq!(get(&folded, "triggers")[0], Value::String("*.md".into()));
    }

    #[test]
    fn block_scalar_survives_encode_and_decode() {
        let mut mapping = Mapping::new();
        mapping.insert("description".into(), "Notes\n- *bold* item\n".into());
        mapping.insert("globs".into(), "*.ts".into());
        let text = encode(&mapping).unwrap();
        assert_eq!(decode(&text).unwrap(), mapping);
    }

    #[test]
    fn encode_leaves_globs_bare() {
        let mut mapping = Mapping::new();
        mapping.insert("globs".into(), "**/*.{ts,tsx}".into());
        let text = encode(&mapping).unwrap();
        assert_eq!(text, "globs: **/*.{ts,tsx}\n");

        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, mapping);
        assert_eq!(encode(&decoded).unwrap(), text);
    }

    #[test]
    fn encode_leaves_glob_sequence_items_bare() {
        let mut mapping = Mapping::new();
        mapping.insert(
            "globs".into(),
            Value::Sequence(vec!["*.ts".into(), "src/**/*.rs".into()]),
        );
        mapping.insert("manual".into(), true.into());
        let text = encode(&mapping).unwrap();
        assert!(text.lines().any(|l| l.trim() == "- *.ts"), "{text}");
        assert!(text.lines().any(|l| l.trim() == "- src/**/*.rs"), "{text}");
        assert!(text.contains("manual: true"));
        assert_eq!(decode(&text).unwrap(), mapping);
    }

    #[test]
    fn encode_keeps_scope_quoted() {
        let mut mapping = Mapping::new();
        mapping.insert("scope".into(), "**/*.ts".into());
        mapping.insert("globs".into(), "*.ts,*.tsx".into());
        let text = encode(&mapping).unwrap();
        assert!(!text.contains("scope: **/*.ts"), "{text}");
        assert!(text.contains("globs: *.ts,*.tsx"), "{text}");
        assert_eq!(decode(&text).unwrap(), mapping);
    }

    #[test]
    fn unquote_refuses_values_that_change_meaning() {
        assert_eq!(unquote("'true'"), "'true'");
        assert_eq!(unquote("'{a,b}/*.ts'"), "'{a,b}/*.ts'");
        assert_eq!(unquote("'*.ts'"), "*.ts");
        assert_eq!(unquote("src/*.rs"), "src/*.rs");
    }
}
