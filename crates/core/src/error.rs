use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// Frontmatter or fence metadata that could not be parsed in strict mode.
    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RulesError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RulesError>;
