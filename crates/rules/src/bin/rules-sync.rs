//! rules-sync — move agent rules between the canonical `.agent/` tree and
//! tool-specific layouts.
//!
//! - `import` discovers every supported source and reports what it found
//! - `export --to <format>` renders the `.agent/` tree into another format

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use rulebook_core::config::load_dotenv;
use rulebook_core::{Config, RuleBlock, RuleFormat};
use rulebook_rules::formats::{export_format, import_all, import_format, FormatOptions, ImportSummary};

// ── CLI ─────────────────────────────────────────────────────────────

/// Convert agent rules between tool formats.
#[derive(Parser, Debug)]
#[command(name = "rules-sync", version, about)]
struct Cli {
    /// Repository root containing the rule sources.
    #[arg(long, global = true)]
    repo_root: Option<PathBuf>,

    /// Fail on unparsable metadata instead of keeping it as content.
    #[arg(long, global = true)]
    strict: bool,

    /// Keep private rules when writing non-canonical formats.
    #[arg(long, global = true)]
    include_private: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover rules in every supported location.
    Import {
        /// Only read this format.
        #[arg(long, value_parser = parse_format)]
        format: Option<RuleFormat>,

        /// Merge imported rules into the canonical tree.
        #[arg(long)]
        write: bool,
    },
    /// Render the canonical tree into another format.
    Export {
        #[arg(long, value_parser = parse_format)]
        to: RuleFormat,
    },
}

fn parse_format(s: &str) -> Result<RuleFormat, String> {
    RuleFormat::parse(s).ok_or_else(|| {
        let known: Vec<_> = RuleFormat::ALL.iter().map(|f| f.as_str()).collect();
        format!("unknown format '{s}' (expected one of: {})", known.join(", "))
    })
}

// ── Commands ────────────────────────────────────────────────────────

fn run_import(
    config: &Config,
    options: &FormatOptions,
    format: Option<RuleFormat>,
    write: bool,
) -> anyhow::Result<()> {
    let summary = match format {
        Some(format) => {
            let result = import_format(&config.repo_root, format, options)
                .with_context(|| format!("failed to import {format}"))?;
            ImportSummary {
                results: vec![result],
                errors: Vec::new(),
            }
        }
        None => import_all(&config.repo_root, options),
    };

    for result in &summary.results {
        println!(
            "{:<12} {:>4} rule(s)  {}",
            result.format.as_str(),
            result.rules.len(),
            result.source_path.display()
        );
        for rule in &result.rules {
            let marker = if rule.metadata.is_conditional() { "~" } else { "*" };
            println!("  {marker} {}", rule.id());
        }
    }
    for failure in &summary.errors {
        println!("failed       {}: {}", failure.file.display(), failure.error);
    }

    if write {
        let merged = merge_into_canonical(&summary);
        let written = export_format(&merged, &config.repo_root, RuleFormat::Agent, options)
            .context("failed to write canonical rule tree")?;
        info!(count = written.len(), path = %config.agent_path().display(), "canonical tree updated");
    }

    if !summary.errors.is_empty() {
        bail!("{} source(s) failed to import", summary.errors.len());
    }
    Ok(())
}

/// Canonical rules first, then rules from other sources whose id is new.
fn merge_into_canonical(summary: &ImportSummary) -> Vec<RuleBlock> {
    let mut ordered: Vec<_> = summary.results.iter().collect();
    ordered.sort_by_key(|r| r.format != RuleFormat::Agent);

    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for result in ordered {
        for rule in &result.rules {
            if seen.insert(rule.id().to_string()) {
                merged.push(rule.clone());
            } else {
                warn!(rule_id = %rule.id(), format = %result.format, "duplicate id, keeping first");
            }
        }
    }
    merged
}

fn run_export(config: &Config, options: &FormatOptions, to: RuleFormat) -> anyhow::Result<()> {
    if to == RuleFormat::Agent {
        bail!("export target must differ from the canonical {} tree", config.agent_dir);
    }

    let source = import_format(&config.repo_root, RuleFormat::Agent, options)
        .with_context(|| format!("failed to read {}", config.agent_path().display()))?;
    let written = export_format(&source.rules, &config.repo_root, to, options)
        .with_context(|| format!("failed to export {to}"))?;

    for path in &written {
        println!("wrote {}", path.display());
    }
    info!(format = %to, files = written.len(), "export finished");
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(root) = cli.repo_root {
        config.repo_root = root;
    }
    config.strict |= cli.strict;
    config.include_private |= cli.include_private;
    config.log_summary();

    let options = FormatOptions::from_config(&config);
    match cli.command {
        Command::Import { format, write } => run_import(&config, &options, format, write),
        Command::Export { to } => run_export(&config, &options, to),
    }
}
