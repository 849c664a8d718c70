use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// wavchop's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// wavchop's crate-wide error type.
///
/// Only the collaborators (decoding, config, export) produce errors. Loudness sampling and
/// segmentation are total and never return one.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("unsupported export format '{0}' (supported: wav)")]
    UnsupportedFormat(String),

    #[error("chunk {requested} requested, but only {available} chunk(s) were found")]
    ChunkOutOfRange { requested: usize, available: usize },

    #[error(transparent)]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}
