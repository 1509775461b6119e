//! The Pattern Matcher: textual grammars that find tag spans in a document.
//!
//! Each [`Grammar`] pairs a pattern with the [`Handler`] that decides what
//! happens to every span it finds. Grammars run in a fixed sequence, each one
//! against the output of the previous one, so a span removed by an earlier
//! grammar can never be seen by a later one.
//!
//! This is best-effort matching over unvalidated markup. Nested or malformed
//! tags are out of contract; anything needing a real tree goes through
//! [`TagScanner`] so the processors don't care how spans are found.

use crate::consts::{
    CSS_CONDITIONAL_GROUP, CSS_STYLESHEET_LINK, CSS_TYPED_LINK, JS_CONDITIONAL_GROUP, SCRIPT_ELEMENT, STYLE_BLOCK,
};
use derive_more::Display;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Which handler a span is routed to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// A conditional comment wrapping one or more tags, moved as one unit.
    #[display("conditional-group")]
    ConditionalGroup,
    /// A single stylesheet link or script element.
    #[display("external-tag")]
    ExternalTag,
    /// A block whose content is part of the page (`<style>`).
    #[display("inline-block")]
    InlineBlock,
    /// An inline script that stays in place but is made lazy.
    #[display("plain-inline")]
    PlainInline,
}

/// A matched piece of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'h> {
    pub text: &'h str,
    /// Byte offset into the document as it was when this grammar ran.
    pub offset: usize,
}

/// What to put where a span was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Keep,
    Remove,
    Replace(String),
}

/// Finds spans in a document and substitutes them.
pub trait TagScanner {
    fn handler(&self) -> Handler;

    /// Visits every span in `document`, left to right and non-overlapping.
    /// Returns `None` when every span was kept, so callers can tell an
    /// untouched document apart without comparing strings.
    fn scan(&self, document: &str, visit: &mut dyn FnMut(Span<'_>) -> Action) -> Option<String>;
}

/// A [`TagScanner`] backed by a regular expression.
#[derive(Debug)]
pub struct Grammar {
    name: &'static str,
    handler: Handler,
    pattern: &'static LazyLock<Regex>,
}
impl Grammar {
    pub const fn new(name: &'static str, handler: Handler, pattern: &'static LazyLock<Regex>) -> Self {
        Self { name, handler, pattern }
    }
}

impl TagScanner for Grammar {
    fn handler(&self) -> Handler {
        self.handler
    }

    fn scan(&self, document: &str, visit: &mut dyn FnMut(Span<'_>) -> Action) -> Option<String> {
        let mut output: Option<String> = None;
        let mut copied = 0;
        let mut matches = 0;
        for found in self.pattern.find_iter(document) {
            matches += 1;
            let replacement = match visit(Span { text: found.as_str(), offset: found.start() }) {
                Action::Keep => continue,
                Action::Replace(text) if text == found.as_str() => continue,
                Action::Replace(text) => Cow::Owned(text),
                Action::Remove => Cow::Borrowed(""),
            };
            let output = output.get_or_insert_with(|| String::with_capacity(document.len()));
            output.push_str(&document[copied..found.start()]);
            output.push_str(&replacement);
            copied = found.end();
        }
        tracing::trace!(grammar = self.name, matches, changed = output.is_some(), "Scanned document");
        output.map(|mut output| {
            output.push_str(&document[copied..]);
            output
        })
    }
}

/// Stylesheet grammars, in the order they run.
pub static CSS_GRAMMARS: [Grammar; 4] = [
    Grammar::new("css-conditional-group", Handler::ConditionalGroup, &CSS_CONDITIONAL_GROUP),
    Grammar::new("css-typed-link", Handler::ExternalTag, &CSS_TYPED_LINK),
    Grammar::new("css-stylesheet-link", Handler::ExternalTag, &CSS_STYLESHEET_LINK),
    Grammar::new("css-style-block", Handler::InlineBlock, &STYLE_BLOCK),
];

/// Script grammars, in the order they run.
pub static JS_GRAMMARS: [Grammar; 3] = [
    Grammar::new("js-conditional-group", Handler::ConditionalGroup, &JS_CONDITIONAL_GROUP),
    Grammar::new("js-script-element", Handler::ExternalTag, &SCRIPT_ELEMENT),
    Grammar::new("js-plain-inline", Handler::PlainInline, &SCRIPT_ELEMENT),
];
