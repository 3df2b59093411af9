//! Private-rule classification.
//!
//! Three signals can mark a rule private: an explicit `private` frontmatter
//! key, a `.local.` filename marker, or a `private` directory segment. The
//! explicit key always wins, in both directions.

use std::borrow::Cow;
use std::path::Path;

use rulebook_core::RuleMetadata;

/// True if the path carries a `.local.` marker or a `private` directory segment.
///
/// Matching is case-insensitive and accepts both `/` and `\` separators.
pub fn is_private_by_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    if lower.contains(".local.") {
        return true;
    }
    lower.split(['/', '\\']).any(|segment| segment == "private")
}

/// Resolve privacy from an explicit flag and a source path.
///
/// `Some(true)` / `Some(false)` are final; `None` falls back to the path.
pub fn resolve(explicit: Option<bool>, path: &str) -> bool {
    match explicit {
        Some(flag) => flag,
        None => is_private_by_path(path),
    }
}

/// File name used to classify single-file sources, so directories above the
/// repository never mark its rules private.
pub fn file_name(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy())
}

/// Apply the classification to freshly imported metadata.
///
/// An explicit flag is left untouched. Otherwise a path-derived `true` is
/// recorded and a public path leaves the key unset.
pub fn classify(metadata: &mut RuleMetadata, relative_path: &str) {
    if metadata.private.is_none() && is_private_by_path(relative_path) {
        metadata.private = Some(true);
    }
}
