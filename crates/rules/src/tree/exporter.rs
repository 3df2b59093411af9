use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use rulebook_core::{Result, RuleBlock, RulesError};

use crate::frontmatter;
use crate::path_id::{PathIdCodec, PRIVATE_DIR};

/// Writes rules out as a tree, one file per rule.
///
/// Existing files are overwritten. Writes are not transactional. A public
/// rule whose id starts with a `private/` segment is skipped, since its path
/// would mark it private on the next import.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeExporter {
    codec: PathIdCodec,
}

impl TreeExporter {
    pub fn new(codec: PathIdCodec) -> Self {
        Self { codec }
    }

    /// Write `rules` under `root` and return the written paths in order.
    pub fn export(&self, rules: &[RuleBlock], root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(rules.len());
        let mut private_ordinal = 0;

        for rule in rules {
            let id = rule.id();
            if !is_safe_id(id) {
                warn!(rule_id = %id, "skipping rule with an id that cannot be a relative path");
                continue;
            }

            let private = rule.metadata.is_private();
            if !private && in_private_dir(id) {
                warn!(rule_id = %id, "skipping public rule whose path would mark it private");
                continue;
            }
            let flat = self.codec.path_encodes_privacy(id);
            let ordinal = if private && flat {
                private_ordinal += 1;
                private_ordinal
            } else {
                0
            };

            let relative = self.codec.encode(id, private, ordinal);
            let emit_id = self.codec.decode(&relative) != id;
            let emit_private = !flat;
            let mapping = frontmatter::metadata_to_mapping(&rule.metadata, emit_id, emit_private);
            let text = frontmatter::render(&mapping, &rule.content)?;

            let path = root.join(&relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| RulesError::io(parent, e))?;
            }
            fs::write(&path, text).map_err(|e| RulesError::io(&path, e))?;

            debug!(rule_id = %id, path = %relative.display(), "wrote rule");
            written.push(path);
        }

        info!(path = %root.display(), count = written.len(), "exported rule tree");
        Ok(written)
    }
}

fn in_private_dir(id: &str) -> bool {
    id.split('/').next() == Some(PRIVATE_DIR) && id.contains('/')
}

/// Ids must stay inside the export root.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('/')
        && Path::new(id)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
