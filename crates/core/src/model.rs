//! Canonical rule model shared by every importer and exporter.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Relative importance hint carried through to tool formats that understand it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// A glob pattern field that may be written as a single string or a list.
///
/// The written shape is preserved so exports reproduce what was imported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Patterns::One(s) => std::slice::from_ref(s),
            Patterns::Many(v) => v.as_slice(),
        };
        items.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Patterns::One(s) => s.is_empty(),
            Patterns::Many(v) => v.is_empty(),
        }
    }
}

impl From<&str> for Patterns {
    fn from(s: &str) -> Self {
        Patterns::One(s.to_string())
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(v: Vec<&str>) -> Self {
        Patterns::Many(v.into_iter().map(str::to_string).collect())
    }
}

/// Metadata of a single rule.
///
/// Known keys are typed fields; anything else lands in `extra` and is written
/// back in its original insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMetadata {
    /// `/`-delimited hierarchical identifier, unique within a rule set.
    pub id: String,
    /// Unset means "use the format's default".
    pub always_apply: Option<bool>,
    pub scope: Option<Patterns>,
    pub triggers: Option<Vec<String>>,
    pub manual: Option<bool>,
    pub priority: Option<Priority>,
    pub description: Option<String>,
    /// Tool-specific alias of `scope`; kept independently.
    pub globs: Option<Patterns>,
    /// Explicit privacy override. `None` defers to the source path.
    pub private: Option<bool>,
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl RuleMetadata {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_private(&self) -> bool {
        self.private == Some(true)
    }

    /// Conditional rules are referenced from an index instead of being inlined.
    pub fn is_conditional(&self) -> bool {
        self.always_apply == Some(false)
    }
}

/// 1-based line span of a rule body within its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub start_line: usize,
    pub end_line: usize,
}

/// One rule: metadata plus its trimmed markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBlock {
    pub metadata: RuleMetadata,
    pub content: String,
    pub position: Option<SourcePosition>,
}

impl RuleBlock {
    pub fn new(metadata: RuleMetadata, content: impl Into<String>) -> Self {
        Self {
            metadata,
            content: content.into().trim().to_string(),
            position: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

/// On-disk layouts the converter reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFormat {
    /// `.agent/` tree of markdown files with frontmatter.
    Agent,
    /// `.cursor/rules/` tree of `.mdc` files.
    Cursor,
    /// `CLAUDE.md`.
    Claude,
    /// `AGENTS.md`.
    Agents,
    /// `.github/copilot-instructions.md`.
    Copilot,
    /// Deprecated `.agentconfig` file with `<!-- @meta -->` fences.
    AgentConfig,
}

impl RuleFormat {
    pub const ALL: [RuleFormat; 6] = [
        RuleFormat::Agent,
        RuleFormat::Cursor,
        RuleFormat::Claude,
        RuleFormat::Agents,
        RuleFormat::Copilot,
        RuleFormat::AgentConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleFormat::Agent => "agent",
            RuleFormat::Cursor => "cursor",
            RuleFormat::Claude => "claude",
            RuleFormat::Agents => "agents",
            RuleFormat::Copilot => "copilot",
            RuleFormat::AgentConfig => "agentconfig",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Hierarchical formats store one rule per file in a directory tree.
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, RuleFormat::Agent | RuleFormat::Cursor)
    }

    /// Value assumed for an unset `alwaysApply` when importing this format.
    ///
    /// Trees default to conditional, flat files to always-apply.
    pub fn default_always_apply(&self) -> bool {
        !self.is_hierarchical()
    }
}

impl fmt::Display for RuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules discovered in one source file or directory.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub format: RuleFormat,
    pub source_path: PathBuf,
    pub rules: Vec<RuleBlock>,
    /// Original text, kept for single-file sources only.
    pub raw_source: Option<String>,
}
