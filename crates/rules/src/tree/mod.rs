//! Hierarchical rule trees: one markdown file per rule, nested folders for
//! nested ids.

mod exporter;
mod importer;
mod walker;


pub use self::exporter::TreeExporter;
pub use self::importer::TreeImporter;
pub use self::walker::{walk, RuleFile, RuleFiles};
