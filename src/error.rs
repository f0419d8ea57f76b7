//! Error types for corpus loading, parsing and table persistence

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building or querying a learner
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("corpus at '{}' is unusable: {reason}", path.display())]
    Corpus { path: PathBuf, reason: String },

    #[error("failed to walk corpus: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason} in '{content}'", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        content: String,
        reason: String,
    },

    #[error("invalid state '{text}' (expected 'bag/agent/opponent/outcome'): {reason}")]
    InvalidState { text: String, reason: String },

    #[error("invalid action '{text}': {reason}")]
    InvalidAction { text: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no convergence after {sweeps} sweeps (last max |error| = {max_error:e})")]
    ConvergenceTimeout { sweeps: u32, max_error: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
