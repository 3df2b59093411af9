use std::fs;
use std::path::Path;

use tracing::{debug, info};

use rulebook_core::{Result, RuleBlock, RulesError};

use crate::frontmatter::{self, ParseMode};
use crate::path_id::PathIdCodec;
use crate::privacy;

use super::walker::{walk, RuleFile, RuleFiles};

/// Reads a rule tree into an ordered list of rules.
///
/// Ids come from frontmatter when present, otherwise from the file's path.
/// An unset `alwaysApply` becomes `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeImporter {
    codec: PathIdCodec,
    mode: ParseMode,
}

impl TreeImporter {
    pub fn new(codec: PathIdCodec) -> Self {
        Self {
            codec,
            mode: ParseMode::Lenient,
        }
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Rule files under `root` in import order.
    pub fn files(&self, root: &Path) -> RuleFiles {
        walk(root, &[self.codec.extension()])
    }

    /// Import every rule file under `root`.
    ///
    /// Fails with [`RulesError::NotFound`] if `root` does not exist.
    pub fn import(&self, root: &Path) -> Result<Vec<RuleBlock>> {
        if !root.exists() {
            return Err(RulesError::NotFound(root.to_path_buf()));
        }

        let mut rules = Vec::new();
        for file in self.files(root) {
            rules.push(self.import_file(&file?)?);
        }

        info!(path = %root.display(), count = rules.len(), "imported rule tree");
        Ok(rules)
    }

    /// Import a single file found by [`TreeImporter::files`].
    pub fn import_file(&self, file: &RuleFile) -> Result<RuleBlock> {
        let content = fs::read_to_string(&file.path).map_err(|e| RulesError::io(&file.path, e))?;
        let doc = frontmatter::parse(&content, self.mode, &file.path)?;

        let mut metadata = frontmatter::metadata_from_mapping(&doc.frontmatter);
        if metadata.id.is_empty() {
            metadata.id = self.codec.decode(&file.relative);
        }
        privacy::classify(&mut metadata, &file.relative.to_string_lossy());
        if metadata.always_apply.is_none() {
            metadata.always_apply = Some(false);
        }

        debug!(
            rule_id = %metadata.id,
            path = %file.relative.display(),
            private = metadata.is_private(),
            "imported rule"
        );

        Ok(RuleBlock {
            metadata,
            content: doc.body,
            position: Some(doc.position),
        })
    }
}
