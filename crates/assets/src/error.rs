//! Asset Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking. Callers in
//! the page pipeline never propagate these: any error means "serve the
//! original asset", so the kinds mostly exist to make the logs useful.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An asset cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for asset cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The referenced source asset does not exist on disk.
    #[display("asset not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The cache directory (or the source) is not accessible to this process.
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Any other filesystem failure while reading, writing or stat-ing.
    #[display("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    /// The asset path would leave the document root, or is otherwise unusable.
    #[display("invalid asset path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// The minifier rejected the asset.
    #[display("could not minify {}", _0.display())]
    Minify(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A concurrent request may have been half way through creating the
        // cache directory, or the source may have been mid-deploy.
        matches!(self, Self::Io { .. } | Self::NotFound(_))
    }
}

pub(crate) fn map_io_error(e: std::io::Error, path: &std::path::Path) -> ErrorKind {
    match e.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    }
}
