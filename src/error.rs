//! Error types for BML parsing.

use thiserror::Error;

/// Result type for BML parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Error type for BML parsing.
///
/// Every failure carries the 1-based line number (0 if unknown), the
/// 0-based column where parsing stopped, and a formatted description.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("parse error at line {line_number}, position {position}: {description}")]
pub struct ParseError {
    /// 1-based line number, 0 if unknown.
    pub line_number: usize,
    /// 0-based column.
    pub position: usize,
    /// Human-readable description.
    pub description: String,
}

impl ParseError {
    /// Create a parse error at an explicit location.
    pub fn new(line_number: usize, position: usize, description: impl Into<String>) -> Self {
        ParseError {
            line_number,
            position,
            description: description.into(),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::new(0, 0, format!("I/O error: {err}"))
    }
}

/// Outcome of reading one line of the current block.
///
/// END-OF-BLOCK is ordinary control flow, not an error: the dispatcher and
/// the collection parsers branch on it directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockStatus {
    /// A line of the block was read into `current_line`.
    Line,
    /// Unindent detected or the source is exhausted.
    End,
}

impl BlockStatus {
    pub(crate) fn is_end(self) -> bool {
        self == BlockStatus::End
    }
}
