//! Minification Error Types
//!
//! Minifiers are treated as black boxes; all they can tell us is that the
//! input could not be understood or that the output could not be produced.

use derive_more::{Display, Error};

/// A minification error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for minification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be parsed; serve it unminified instead.
    #[display("syntax error: {_0}")]
    Syntax(#[error(not(source))] String),
    /// The minified output could not be printed.
    #[display("failed to print minified output: {_0}")]
    Print(#[error(not(source))] String),
    /// The minifier produced bytes that are not valid UTF-8.
    #[display("minifier produced invalid UTF-8")]
    Encoding,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Same input, same output. Minification is deterministic.
        false
    }
}
