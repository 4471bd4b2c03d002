//! Error taxonomy for the swarm launcher
//!
//! Distinguishes failures that abort a run (configuration, storage,
//! whole-batch launch, aggregation) from per-unit outcomes, which are
//! recorded on the work units themselves and never raised as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the launcher core.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// A required configuration value is missing or malformed.
    /// Raised before anything is launched.
    #[error("configuration error: {0}")]
    Config(String),

    /// The artifact root could not be prepared on the local filesystem.
    #[error("artifact storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A unit (local) or the whole batch (remote) could not be submitted.
    #[error("launch failed: {0}")]
    Launch(String),

    /// The wait/status-query phase itself could not complete. Distinct
    /// from a unit exiting non-zero, which is a per-unit outcome.
    #[error("status aggregation failed: {0}")]
    Aggregation(String),

    /// Leftover-container removal could not run or was rejected by the
    /// engine. "Nothing to clean" is never an error.
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    /// The invocation was interrupted before all units reached a
    /// terminal state.
    #[error("run interrupted before completion")]
    Interrupted,
}

impl SwarmError {
    pub fn config(msg: impl Into<String>) -> Self {
        SwarmError::Config(msg.into())
    }

    pub fn launch(msg: impl Into<String>) -> Self {
        SwarmError::Launch(msg.into())
    }

    pub fn aggregation(msg: impl Into<String>) -> Self {
        SwarmError::Aggregation(msg.into())
    }

    pub fn cleanup(msg: impl Into<String>) -> Self {
        SwarmError::Cleanup(msg.into())
    }
}
