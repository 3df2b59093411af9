//! Conversion engine between the canonical rule tree and tool-specific
//! rule layouts.
//!
//! This crate provides:
//! - Id <-> path mapping with ordering-prefix and privacy-folder conventions
//! - Private-rule classification from path markers and explicit flags
//! - Frontmatter parsing that keeps bare glob patterns intact
//! - Deterministic tree import/export
//! - The conditional-rules index used by single-file formats

pub mod agentconfig;
pub mod formats;
pub mod frontmatter;
pub mod glob_yaml;
pub mod path_id;
pub mod privacy;
pub mod synthesize;
pub mod tree;

pub use formats::{
    export_format, import_all, import_format, FormatOptions, ImportFailure, ImportSummary,
};
pub use frontmatter::ParseMode;
pub use path_id::PathIdCodec;
pub use synthesize::ConditionalSectionSynthesizer;
pub use tree::{TreeExporter, TreeImporter};
