use std::env;
use std::path::PathBuf;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

/// Converter settings resolved from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Repository whose rule files are read and written.
    pub repo_root: PathBuf,
    /// Name of the canonical rules directory inside `repo_root`.
    pub agent_dir: String,
    /// Include private rules in exported output.
    pub include_private: bool,
    /// Fail on unparsable metadata instead of treating it as content.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            repo_root: PathBuf::from("."),
            agent_dir: ".agent".to_string(),
            include_private: false,
            strict: false,
        }
    }
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RULEBOOK_PROFILE`. When set (e.g. `CI`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RULEBOOK_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let defaults = Self::default();
        Self {
            profile: p.to_string(),
            repo_root: PathBuf::from(profiled_env_or(p, "RULEBOOK_REPO_ROOT", ".")),
            agent_dir: profiled_env_or(p, "RULEBOOK_AGENT_DIR", &defaults.agent_dir),
            include_private: profiled_env_bool(p, "RULEBOOK_INCLUDE_PRIVATE", defaults.include_private),
            strict: profiled_env_bool(p, "RULEBOOK_STRICT", defaults.strict),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Absolute-or-relative path of the canonical rules directory.
    pub fn agent_path(&self) -> PathBuf {
        self.repo_root.join(&self.agent_dir)
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  repo_root:        {}", self.repo_root.display());
        tracing::info!("  agent_dir:        {}", self.agent_dir);
        tracing::info!("  include_private:  {}", self.include_private);
        tracing::info!("  strict:           {}", self.strict);
    }
}
