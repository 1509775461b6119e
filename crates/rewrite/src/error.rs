//! Rewrite Error Types
//!
//! Rendering a page never fails from the caller's point of view: every
//! problem while processing a document degrades to leaving (part of) it
//! untouched. These errors only come out of constructing a processor, where
//! the embedded loader template is loaded and compiled.

use derive_more::{Display, Error};

/// A rewrite error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rewrite operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An asset that should have been embedded at compile time is missing.
    #[display("embedded asset not found: {_0}")]
    AssetNotFound(#[error(not(source))] String),
    /// The client loader template could not be compiled or rendered.
    #[display("client loader template error")]
    Template,
    /// The script resource list could not be serialized.
    #[display("could not serialize script resources")]
    Serialize,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // All of these are build defects.
        false
    }
}
