use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkloadError>;

/// Everything that can go wrong before a simulation starts.
/// A simulator built from a validated workload has no error paths.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("cannot read workload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed workload near `{token}`: {reason}")]
    Malformed { token: String, reason: &'static str },

    #[error("invalid workload configuration: {0}")]
    Config(String),

    #[error("malformed JSON workload: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkloadError {
    pub fn malformed(token: impl Into<String>, reason: &'static str) -> Self {
        WorkloadError::Malformed {
            token: token.into(),
            reason,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        WorkloadError::Config(msg.into())
    }
}
