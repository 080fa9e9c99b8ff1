//! Errors surfaced by the search engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`SearchEngine`](crate::SearchEngine) operations.
///
/// An unconfigured embedding provider is not an error: indexing and search
/// quietly do nothing. Per-file failures are logged and counted in
/// [`IndexStats`](crate::IndexStats) rather than returned.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<crate::chunker::ChunkerError> for EngineError {
    fn from(err: crate::chunker::ChunkerError) -> Self {
        Self::Config(err.to_string())
    }
}
