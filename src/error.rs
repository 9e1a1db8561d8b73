//! Error types for sqlport.

use std::fmt;

use thiserror::Error;

/// Which delimiter was left open when the input ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDelimiter {
    SingleQuote,
    DoubleQuote,
    BlockComment,
}

impl fmt::Display for OpenDelimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenDelimiter::SingleQuote => write!(f, "single-quoted literal"),
            OpenDelimiter::DoubleQuote => write!(f, "double-quoted literal"),
            OpenDelimiter::BlockComment => write!(f, "block comment"),
        }
    }
}

/// The main error type for sqlport operations.
#[derive(Debug, Error)]
pub enum SqlPortError {
    /// Input ended inside a quoted literal or a block comment.
    #[error("Unterminated {kind} starting at offset {offset} (line {line})")]
    UnterminatedLiteral {
        kind: OpenDelimiter,
        offset: usize,
        line: usize,
    },

    /// The table catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input that the engine refuses to process.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl SqlPortError {
    /// Create an unterminated-literal error for the delimiter opened at `offset`.
    pub fn unterminated(kind: OpenDelimiter, offset: usize, line: usize) -> Self {
        Self::UnterminatedLiteral { kind, offset, line }
    }

    /// Byte offset of the offending delimiter, for fatal scanner errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnterminatedLiteral { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Result type alias for sqlport operations.
pub type SqlPortResult<T> = Result<T, SqlPortError>;
