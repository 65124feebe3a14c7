//! Typed errors for the two seams where callers need to branch on the cause.
//!
//! Everything else in the crate is plumbing and propagates `anyhow::Error`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Startup configuration problems. Always fatal; never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("corpus not found at {0}")]
    CorpusMissing(PathBuf),

    #[error("failed to read corpus {path}: {source}")]
    CorpusUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no persisted index at {0}")]
    IndexMissing(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Why the model-backed analysis produced nothing usable.
///
/// The analysis engine absorbs every variant and falls back to distance
/// banding; the message ends up in the report's `error` field.
#[derive(Debug, Error)]
pub enum AnalysisFailure {
    #[error("model call failed: {0}")]
    Transport(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model output did not match the expected schema: {reason}")]
    Schema { reason: String, raw: String },
}

impl AnalysisFailure {
    /// Raw model text, when the model answered but the answer was unusable.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AnalysisFailure::Schema { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
