//! Command-line Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration could not be loaded; fix it and run again.
    #[display("could not load configuration")]
    Config,
    /// The processors could not be constructed.
    #[display("could not set up the page processors")]
    Setup,
    /// The page could not be read.
    #[display("could not read input: {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    /// The rewritten page could not be written.
    #[display("could not write output: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Output(_))
    }
}
