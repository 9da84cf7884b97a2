//! Error types for the skill tree runner.
//!
//! [`RunnerError`] wraps every failure between reading the command line and
//! printing the final report, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the runner binary.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The command line was malformed.
    #[error("usage: {0}")]
    Usage(String),

    /// A definition or script file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A definition or script file is not valid YAML for its schema.
    #[error("failed to parse {what}: {source}")]
    Yaml {
        /// Which document failed.
        what: &'static str,
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// A node key is referenced but never defined.
    #[error("unknown node key: {0}")]
    UnknownNodeKey(String),

    /// Two nodes share a key.
    #[error("duplicate node key: {0}")]
    DuplicateNodeKey(String),

    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: skilltree_core::ConfigError,
    },

    /// The tree definition does not form a valid graph.
    #[error("graph error: {source}")]
    Graph {
        /// The underlying graph error.
        #[from]
        source: skilltree_engine::GraphError,
    },

    /// The manager rejected a step.
    #[error("skill tree error: {source}")]
    Core {
        /// The underlying manager error.
        #[from]
        source: skilltree_core::CoreError,
    },

    /// The final report could not be serialized.
    #[error("report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}
