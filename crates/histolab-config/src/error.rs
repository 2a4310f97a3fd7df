//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected before any replication starts; fatal for the job.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config document: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    /// A field failed validation; `path` names the offending field.
    #[error("invalid configuration at `{path}`: {reason}")]
    Field { path: String, reason: String },
}

impl ConfigError {
    pub(crate) fn field(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Field {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
