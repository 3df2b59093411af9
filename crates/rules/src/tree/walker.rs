//! Deterministic directory traversal.
//!
//! Directories come before files at every level and each group is sorted by
//! name, so the yielded order does not depend on the platform's readdir order.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use rulebook_core::{Result, RulesError};

/// A rule file found under a walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFile {
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub relative: PathBuf,
}

/// Lazy iterator over the rule files of a tree.
pub struct RuleFiles {
    entries: walkdir::IntoIter,
    root: PathBuf,
    extensions: Vec<String>,
}

/// Walk `root` yielding files whose extension is one of `extensions`.
pub fn walk(root: &Path, extensions: &[&str]) -> RuleFiles {
    let entries = WalkDir::new(root)
        .follow_links(true)
        .sort_by(directories_first)
        .into_iter();
    RuleFiles {
        entries,
        root: root.to_path_buf(),
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
    }
}

fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.file_type()
        .is_dir()
        .cmp(&a.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

impl RuleFiles {
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|accepted| accepted == ext))
    }
}

impl Iterator for RuleFiles {
    type Item = Result<RuleFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    let message = e.to_string();
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
                    return Some(Err(RulesError::io(path, source)));
                }
            };

            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            let relative = path
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            return Some(Ok(RuleFile { path, relative }));
        }
    }
}
