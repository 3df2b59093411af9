//! Format boundary: where each tool keeps its rules and how the canonical
//! rule list is read from and written to those locations.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use rulebook_core::{Config, ImportResult, Result, RuleBlock, RuleFormat, RulesError};

use crate::frontmatter::{self, ParseMode};
use crate::path_id::PathIdCodec;
use crate::synthesize::{partition, ConditionalSectionSynthesizer};
use crate::tree::{TreeExporter, TreeImporter};
use crate::{agentconfig, privacy};

/// Options shared by format imports and exports.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    /// Canonical rules directory, relative to the repository root.
    pub agent_dir: String,
    pub mode: ParseMode,
    /// Keep private rules when writing non-canonical formats.
    pub include_private: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FormatOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            agent_dir: config.agent_dir.clone(),
            mode: ParseMode::from_strict(config.strict),
            include_private: config.include_private,
        }
    }
}

/// A source that failed during a batch import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    pub file: PathBuf,
    pub error: String,
}

/// Outcome of [`import_all`]: one failure never hides the other results.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub results: Vec<ImportResult>,
    pub errors: Vec<ImportFailure>,
}

impl ImportSummary {
    pub fn rule_count(&self) -> usize {
        self.results.iter().map(|r| r.rules.len()).sum()
    }
}

/// Location of `format` inside `repo_root`.
pub fn location(repo_root: &Path, format: RuleFormat, options: &FormatOptions) -> PathBuf {
    match format {
        RuleFormat::Agent => repo_root.join(&options.agent_dir),
        RuleFormat::Cursor => repo_root.join(".cursor").join("rules"),
        RuleFormat::Claude => repo_root.join("CLAUDE.md"),
        RuleFormat::Agents => repo_root.join("AGENTS.md"),
        RuleFormat::Copilot => repo_root.join(".github").join("copilot-instructions.md"),
        RuleFormat::AgentConfig => repo_root.join(".agentconfig"),
    }
}

fn codec(format: RuleFormat) -> PathIdCodec {
    match format {
        RuleFormat::Cursor => PathIdCodec::cursor(),
        _ => PathIdCodec::agent(),
    }
}

/// Id and description given to the single rule of a flat file.
fn flat_identity(format: RuleFormat) -> (&'static str, &'static str) {
    match format {
        RuleFormat::Claude => ("claude-code", "Claude Code context and instructions"),
        RuleFormat::Agents => ("codex-agents", "Agent instructions"),
        RuleFormat::Copilot => ("copilot-instructions", "GitHub Copilot custom instructions"),
        _ => ("rules", "Imported rules"),
    }
}

/// Separator placed between inlined rules and the conditional index.
fn section_separator(format: RuleFormat) -> &'static str {
    match format {
        RuleFormat::Copilot => "\n\n---\n\n",
        _ => "\n\n",
    }
}

// ── Import ────────────────────────────────────────────────────

/// Import one format from `repo_root`. The location must exist.
pub fn import_format(
    repo_root: &Path,
    format: RuleFormat,
    options: &FormatOptions,
) -> Result<ImportResult> {
    let path = location(repo_root, format, options);
    if !path.exists() {
        return Err(RulesError::NotFound(path));
    }

    let (rules, raw_source) = match format {
        RuleFormat::Agent | RuleFormat::Cursor => {
            let importer = TreeImporter::new(codec(format)).with_mode(options.mode);
            (importer.import(&path)?, None)
        }
        RuleFormat::AgentConfig => {
            warn!(path = %path.display(), "the .agentconfig format is deprecated; migrate to {}", options.agent_dir);
            let raw = read(&path)?;
            (agentconfig::parse(&raw, options.mode, &path)?, Some(raw))
        }
        RuleFormat::Claude | RuleFormat::Agents | RuleFormat::Copilot => {
            let raw = read(&path)?;
            (import_flat(&raw, format, options.mode, &path)?, Some(raw))
        }
    };

    debug!(format = %format, path = %path.display(), count = rules.len(), "imported format");
    Ok(ImportResult {
        format,
        source_path: path,
        rules,
        raw_source,
    })
}

/// Import a flat single-file format as one rule.
///
/// Unset `alwaysApply` defaults to `true` here, unlike trees. An empty file
/// has no rules.
pub fn import_flat(
    content: &str,
    format: RuleFormat,
    mode: ParseMode,
    path: &Path,
) -> Result<Vec<RuleBlock>> {
    let doc = frontmatter::parse(content, mode, path)?;
    if doc.body.is_empty() && doc.frontmatter.is_empty() {
        return Ok(Vec::new());
    }

    let (id, description) = flat_identity(format);
    let mut metadata = frontmatter::metadata_from_mapping(&doc.frontmatter);
    if metadata.id.is_empty() {
        metadata.id = id.to_string();
    }
    if metadata.description.is_none() {
        metadata.description = Some(description.to_string());
    }
    privacy::classify(&mut metadata, &privacy::file_name(path));
    if metadata.always_apply.is_none() {
        metadata.always_apply = Some(format.default_always_apply());
    }

    Ok(vec![RuleBlock {
        metadata,
        content: doc.body,
        position: Some(doc.position),
    }])
}

/// Import every format present under `repo_root`.
///
/// Absent locations are skipped. A failing source is recorded in
/// [`ImportSummary::errors`] and the remaining sources are still imported.
pub fn import_all(repo_root: &Path, options: &FormatOptions) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for format in RuleFormat::ALL {
        let path = location(repo_root, format, options);
        if !path.exists() {
            debug!(format = %format, path = %path.display(), "not present, skipping");
            continue;
        }
        match import_format(repo_root, format, options) {
            Ok(result) => summary.results.push(result),
            Err(e) => {
                warn!(format = %format, path = %path.display(), error = %e, "import failed");
                summary.errors.push(ImportFailure {
                    file: path,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        sources = summary.results.len(),
        rules = summary.rule_count(),
        failures = summary.errors.len(),
        "import finished"
    );
    summary
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| RulesError::io(path, e))
}

// ── Export ────────────────────────────────────────────────────

/// Write `rules` in `format` under `repo_root`, returning written paths.
///
/// Private rules are dropped unless the target is the canonical tree or
/// `include_private` is set.
pub fn export_format(
    rules: &[RuleBlock],
    repo_root: &Path,
    format: RuleFormat,
    options: &FormatOptions,
) -> Result<Vec<PathBuf>> {
    let selected = select_rules(rules, format, options);
    let path = location(repo_root, format, options);

    match format {
        RuleFormat::Agent | RuleFormat::Cursor => {
            TreeExporter::new(codec(format)).export(&selected, &path)
        }
        RuleFormat::Claude | RuleFormat::Agents | RuleFormat::Copilot => {
            let text = render_single_file(&selected, format, &options.agent_dir);
            write_file(&path, &text)?;
            info!(format = %format, path = %path.display(), count = selected.len(), "exported single file");
            Ok(vec![path])
        }
        RuleFormat::AgentConfig => Err(RulesError::Unsupported(format!(
            "{format} is a deprecated import-only format"
        ))),
    }
}

fn select_rules(rules: &[RuleBlock], format: RuleFormat, options: &FormatOptions) -> Vec<RuleBlock> {
    let keep_private = format == RuleFormat::Agent || options.include_private;
    rules
        .iter()
        .filter(|r| keep_private || !r.metadata.is_private())
        .cloned()
        .collect()
}

/// Single-file text: always-apply bodies separated by blank lines, then the
/// conditional index.
pub fn render_single_file(rules: &[RuleBlock], format: RuleFormat, link_root: &str) -> String {
    let (always, _) = partition(rules);
    let inline = always
        .iter()
        .map(|r| r.content.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let section = ConditionalSectionSynthesizer::new(link_root).synthesize(rules);
    let mut text = match (inline.is_empty(), section) {
        (_, None) => inline,
        (true, Some(section)) => section,
        (false, Some(section)) => format!("{inline}{}{section}", section_separator(format)),
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RulesError::io(parent, e))?;
    }
    fs::write(path, text).map_err(|e| RulesError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulebook_core::{Patterns, RuleMetadata};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rule(id: &str, always: bool, body: &str) -> RuleBlock {
        let mut metadata = RuleMetadata::new(id);
        metadata.always_apply = Some(always);
        RuleBlock::new(metadata, body)
    }

    #[test]
    fn flat_files_default_to_always_apply() {
        let rules = import_flat("Be concise.\n", RuleFormat::Claude, ParseMode::Strict, Path::new("CLAUDE.md"))
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id(), "claude-code");
        assert_eq!(rules[0].metadata.always_apply, Some(true));
        assert_eq!(rules[0].content, "Be concise.");
    }

    #[test]
    fn flat_file_frontmatter_overrides_defaults() {
        let text = "---\nid: house-style\nalwaysApply: false\n---\nBody";
        let rules = import_flat(text, RuleFormat::Agents, ParseMode::Strict, Path::new("AGENTS.md")).unwrap();
        assert_eq!(rules[0].id(), "house-style");
        assert_eq!(rules[0].metadata.always_apply, Some(false));
    }

    #[test]
    fn empty_flat_file_has_no_rules() {
        let rules = import_flat("\n\n", RuleFormat::Copilot, ParseMode::Strict, Path::new("x.md")).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn import_all_collects_failures_without_aborting() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".agent/style.md", "Use tabs.");
        write(dir.path(), "CLAUDE.md", "Claude notes");
        write(dir.path(), ".agentconfig", "<!-- @meta\nid: a\n");

        let summary = import_all(dir.path(), &FormatOptions::default());
        let formats: Vec<_> = summary.results.iter().map(|r| r.format).collect();
        assert_eq!(formats, vec![RuleFormat::Agent, RuleFormat::Claude]);
        assert_eq!(summary.rule_count(), 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].file.ends_with(".agentconfig"));

        let agent = &summary.results[0];
        assert_eq!(agent.rules[0].metadata.always_apply, Some(false));
        assert!(agent.raw_source.is_none());
        assert_eq!(summary.results[1].raw_source.as_deref(), Some("Claude notes"));
    }

    #[test]
    fn import_format_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = import_format(dir.path(), RuleFormat::Cursor, &FormatOptions::default()).unwrap_err();
        assert!(matches!(err, RulesError::NotFound(_)));
    }

    #[test]
    fn cursor_layout_reads_mdc_and_legacy_nesting() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".cursor/rules/api/auth.mdc", "JWT only");
        write(dir.path(), ".cursor/rules/rules/react.mdc", "---\nglobs: *.tsx\nalwaysApply: false\n---\nHooks rules");
        write(dir.path(), ".cursor/rules/notes.md", "ignored: wrong extension");

        let result = import_format(dir.path(), RuleFormat::Cursor, &FormatOptions::default()).unwrap();
        let ids: Vec<_> = result.rules.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["api/auth", "react"]);
        assert_eq!(result.rules[1].metadata.globs, Some(Patterns::from("*.tsx")));
    }

    #[test]
    fn single_file_export_inlines_always_and_indexes_conditional() {
        let mut scoped = rule("testing", false, "Testing body");
        scoped.metadata.scope = Some(Patterns::from("**/*.test.ts"));
        let rules = vec![rule("style", true, "Use tabs."), scoped, rule("naming", true, "Be clear.")];

        let claude = render_single_file(&rules, RuleFormat::Claude, ".agent");
        assert!(claude.starts_with("Use tabs.\n\nBe clear.\n\n## Context-Specific Rules\n"));
        assert!(!claude.contains("Testing body"));
        assert!(claude.contains("→ [testing](.agent/testing.md)"));

        let copilot = render_single_file(&rules, RuleFormat::Copilot, ".agent");
        assert!(copilot.contains("Be clear.\n\n---\n\n## Context-Specific Rules"));
    }

    #[test]
    fn export_drops_private_rules_unless_included() {
        let dir = TempDir::new().unwrap();
        let mut secret = rule("secret", true, "Hidden");
        secret.metadata.private = Some(true);
        let rules = vec![rule("public", true, "Shown"), secret];

        export_format(&rules, dir.path(), RuleFormat::Claude, &FormatOptions::default()).unwrap();
        let text = fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap();
        assert_eq!(text, "Shown\n");

        let options = FormatOptions {
            include_private: true,
            ..FormatOptions::default()
        };
        export_format(&rules, dir.path(), RuleFormat::Claude, &options).unwrap();
        let text = fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap();
        assert_eq!(text, "Shown\n\nHidden\n");

        // The canonical tree keeps private rules regardless.
        export_format(&rules, dir.path(), RuleFormat::Agent, &FormatOptions::default()).unwrap();
        assert!(dir.path().join(".agent/private/001-secret.md").is_file());
    }

    #[test]
    fn cursor_export_writes_mdc_under_rules() {
        let dir = TempDir::new().unwrap();
        let written = export_format(
            &[rule("api/auth", false, "JWT")],
            dir.path(),
            RuleFormat::Cursor,
            &FormatOptions::default(),
        )
        .unwrap();
        assert_eq!(written, vec![dir.path().join(".cursor/rules/api/auth.mdc")]);
    }

    #[test]
    fn agentconfig_is_import_only() {
        let dir = TempDir::new().unwrap();
        let err = export_format(&[], dir.path(), RuleFormat::AgentConfig, &FormatOptions::default())
            .unwrap_err();
        assert!(matches!(err, RulesError::Unsupported(_)));
    }
}
