//! Configuration Error Types
//!
//! Structured errors using `exn` for automatic location tracking. Every
//! variant here is a problem with what the operator wrote, so none of them
//! are worth retrying without editing the configuration first.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No configuration file was given and no default location could be determined.
    #[display("could not determine a default configuration location")]
    NoDefaultLocation,
    /// The configuration file has an extension we don't know how to parse.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The configuration sources could not be merged into a valid [`Config`](crate::Config).
    #[display("invalid configuration")]
    Invalid,
    /// A pattern in one of the exclude lists is not a valid regular expression.
    #[display("invalid exclude pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
