//! Centralized error types for mboxsplit.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxsplit library.
///
/// Charset problems never show up here: the resolver in
/// [`crate::parser::charset`] always degrades to a lossy decode.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified MBOX file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration file is unreadable or malformed.
    #[error("Invalid configuration '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// Chunks must hold at least one message.
    #[error("Chunk size must be at least 1 (got {0})")]
    InvalidChunkSize(usize),

    /// An output path that cannot be turned into chunk file names.
    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
