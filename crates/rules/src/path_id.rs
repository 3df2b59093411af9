//! Mapping between hierarchical rule ids and relative file paths.
//!
//! `decode` strips filesystem artifacts (extension, `NN-` ordering prefixes,
//! `.local` markers, a leading `private/` folder) so ids stay stable no matter
//! how a file is named on disk. `encode` re-creates those artifacts where the
//! layout needs them.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Extensions recognised as rule files.
pub const RULE_EXTENSIONS: &[&str] = &["md", "mdc"];

/// Directory that collects flat private rules.
pub const PRIVATE_DIR: &str = "private";

static ORDER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,}-").expect("valid regex"));

/// Id/path codec for one hierarchical layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathIdCodec {
    extension: &'static str,
    legacy_rules_dir: bool,
}

impl Default for PathIdCodec {
    fn default() -> Self {
        Self::agent()
    }
}

impl PathIdCodec {
    /// `.agent/` layout: `.md` files, no legacy handling.
    pub fn agent() -> Self {
        Self {
            extension: "md",
            legacy_rules_dir: false,
        }
    }

    /// `.cursor/rules/` layout: `.mdc` files. Older exporters nested flat
    /// rules one level deeper in `rules/`, so `rules/<name>` decodes to `<name>`.
    pub fn cursor() -> Self {
        Self {
            extension: "mdc",
            legacy_rules_dir: true,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    /// Derive a rule id from a path relative to the layout root.
    pub fn decode(&self, relative: &Path) -> String {
        let raw = relative.to_string_lossy().replace('\\', "/");
        let stem = strip_rule_extension(&raw);

        let mut segments: Vec<&str> = stem
            .split('/')
            .filter(|s| !s.is_empty())
            .map(clean_segment)
            .collect();

        if segments.first() == Some(&PRIVATE_DIR) {
            segments.remove(0);
        }
        if self.legacy_rules_dir && segments.len() == 2 && segments[0] == "rules" {
            segments.remove(0);
        }

        segments.join("/")
    }

    /// Relative path a rule is written to.
    ///
    /// Nested ids map onto nested folders and are never moved under
    /// `private/`. Flat private ids go to `private/NNN-<id>` where `ordinal`
    /// is the 1-based position among flat private rules.
    pub fn encode(&self, id: &str, private: bool, ordinal: usize) -> PathBuf {
        let segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();

        match segments.split_last() {
            Some((last, parents)) if !parents.is_empty() => {
                let mut path: PathBuf = parents.iter().collect();
                path.push(format!("{}.{}", last, self.extension));
                path
            }
            _ if private => Path::new(PRIVATE_DIR).join(format!(
                "{:03}-{}.{}",
                ordinal, id, self.extension
            )),
            _ => PathBuf::from(format!("{}.{}", id, self.extension)),
        }
    }

    /// True when the encoded location already marks the rule private.
    pub fn path_encodes_privacy(&self, id: &str) -> bool {
        !id.contains('/')
    }
}

fn strip_rule_extension(path: &str) -> &str {
    for ext in RULE_EXTENSIONS {
        if let Some(stem) = path.strip_suffix(ext).and_then(|s| s.strip_suffix('.')) {
            return stem;
        }
    }
    path
}

fn clean_segment(segment: &str) -> &str {
    let segment = match ORDER_PREFIX.find(segment) {
        Some(m) => &segment[m.end()..],
        None => segment,
    };
    segment.strip_suffix(".local").unwrap_or(segment)
}
