//! Index of conditional rules for single-file export targets.
//!
//! Single-file formats inline always-apply rules and point at conditional
//! ones. Each conditional rule is listed exactly once per bucket: by scope
//! pattern, by description (top-level rules only), or under its folder.

use indexmap::IndexMap;

use rulebook_core::RuleBlock;

pub const SECTION_HEADING: &str = "## Context-Specific Rules";

/// Where linked rule files live, relative to the single-file output.
pub const DEFAULT_LINK_ROOT: &str = ".agent";

/// Split rules into (always-apply, conditional), keeping order.
///
/// Only an explicit `alwaysApply: false` makes a rule conditional.
pub fn partition(rules: &[RuleBlock]) -> (Vec<&RuleBlock>, Vec<&RuleBlock>) {
    rules.iter().partition(|r| !r.metadata.is_conditional())
}

#[derive(Debug, Clone)]
pub struct ConditionalSectionSynthesizer {
    link_root: String,
}

impl Default for ConditionalSectionSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_ROOT)
    }
}

enum Bucket<'a> {
    Scoped(Vec<&'a str>),
    Described(&'a str),
    Foldered(&'a str),
}

fn bucket(rule: &RuleBlock) -> Bucket<'_> {
    let meta = &rule.metadata;
    let patterns: Vec<&str> = meta
        .scope
        .iter()
        .flat_map(|scope| scope.iter())
        .filter(|p| !p.trim().is_empty())
        .collect();
    if !patterns.is_empty() {
        return Bucket::Scoped(patterns);
    }
    match description(rule) {
        Some(description) if !meta.id.contains('/') => Bucket::Described(description),
        _ => Bucket::Foldered(meta.id.split('/').next().unwrap_or_default()),
    }
}

/// Description, treating a blank one as absent.
fn description(rule: &RuleBlock) -> Option<&str> {
    rule.metadata
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
}

impl ConditionalSectionSynthesizer {
    pub fn new(link_root: impl Into<String>) -> Self {
        Self {
            link_root: link_root.into(),
        }
    }

    /// Markdown index of the conditional rules in `rules`, or `None` when
    /// every rule applies unconditionally. Rule bodies are never inlined.
    pub fn synthesize(&self, rules: &[RuleBlock]) -> Option<String> {
        let (_, conditional) = partition(rules);
        if conditional.is_empty() {
            return None;
        }

        let mut lines: Vec<String> = vec![SECTION_HEADING.to_string(), String::new()];
        let mut folders: IndexMap<&str, Vec<&RuleBlock>> = IndexMap::new();

        for rule in &conditional {
            match bucket(rule) {
                Bucket::Scoped(patterns) => {
                    for pattern in patterns {
                        lines.push(format!("When working with files matching `{pattern}`, also apply:"));
                        lines.push(self.link(rule));
                        lines.push(String::new());
                    }
                }
                Bucket::Described(description) => {
                    lines.push(format!("When working with {description}, also apply:"));
                    lines.push(self.link(rule));
                    lines.push(String::new());
                }
                Bucket::Foldered(folder) => folders.entry(folder).or_default().push(rule),
            }
        }

        for (folder, members) in folders {
            lines.push(format!("## {}", capitalize(folder)));
            lines.push(String::new());
            lines.extend(members.iter().map(|rule| self.link(rule)));
            lines.push(String::new());
        }

        Some(lines.join("\n"))
    }

    fn link(&self, rule: &RuleBlock) -> String {
        let id = rule.id();
        let mut line = format!("→ [{id}]({}/{id}.md)", self.link_root);
        if let Some(description) = description(rule) {
            line.push_str(" - ");
            line.push_str(description);
        }
        line
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
