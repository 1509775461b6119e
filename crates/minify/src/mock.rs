//! A minifier for tests in this and other crates: collapses whitespace and
//! counts how often it was asked to do so.

use crate::Minifier;
use crate::error::{ErrorKind, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MockMinifier {
    calls: AtomicUsize,
    failing: bool,
}
impl MockMinifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A minifier that rejects every input.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Number of times [`minify`](Minifier::minify) has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Minifier for MockMinifier {
    fn minify(&self, source: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            exn::bail!(ErrorKind::Syntax("mock minifier always fails".to_string()));
        }
        Ok(source.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}
