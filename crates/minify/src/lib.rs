//! Minification behind a single [`Minifier`] trait.
//!
//! The rest of the workspace never cares *how* text gets smaller, only that
//! `minify(text) -> text` either works or fails cleanly. Three
//! implementations are provided:
//!
//! - [`CssMinifier`] using [`lightningcss`],
//! - [`JsMinifier`] using [`minify_js`] in global (script) mode, so that
//!   top-level names other scripts depend on are preserved,
//! - [`HtmlMinifier`] using [`minify_html`] for whole documents, leaving
//!   inline scripts and styles alone.

mod css;
pub mod error;
mod html;
mod js;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use crate::css::CssMinifier;
use crate::error::Result;
pub use crate::html::HtmlMinifier;
pub use crate::js::JsMinifier;
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockMinifier;
use std::sync::Arc;

/// Turns source text into equivalent, smaller source text.
pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> Result<String>;
}

impl<M: Minifier + ?Sized> Minifier for Arc<M> {
    fn minify(&self, source: &str) -> Result<String> {
        (**self).minify(source)
    }
}

impl<M: Minifier + ?Sized> Minifier for Box<M> {
    fn minify(&self, source: &str) -> Result<String> {
        (**self).minify(source)
    }
}
