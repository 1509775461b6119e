//! What the processors are given, and what they keep while rendering.

use crate::bucket::{Buckets, ResourceList};
use crate::exclude::ExclusionFilter;
use derive_more::Display;

/// The parts of an incoming request the processors care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// API or XHR style request; pages like these are never rewritten.
    pub xhr: bool,
    /// Route identifier, matched against the script action exclude list.
    pub action: String,
}
impl Request {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            xhr: false,
            action: action.into(),
        }
    }

    pub fn xhr(mut self, xhr: bool) -> Self {
        self.xhr = xhr;
        self
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{name}: {value}")]
pub struct Header {
    pub name: String,
    pub value: String,
}
impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The rendered page. Headers are appended, never replaced, so several
/// `Link` headers can coexist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub body: String,
    pub headers: Vec<Header>,
}
impl Response {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            headers: Vec::new(),
        }
    }
}

/// How a call to `process()` ended.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    #[display("disabled")]
    Disabled,
    #[display("skipped XHR request")]
    Xhr,
    #[display("action excluded")]
    ExcludedAction,
    #[display("empty body")]
    EmptyBody,
    #[display("closing marker not found")]
    NoMarker,
    #[display("nothing to defer")]
    NothingToDefer,
    #[display("loader could not be emitted")]
    LoaderFailed,
    #[display("rewritten")]
    Rewritten,
}
impl Outcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten)
    }
}

/// State for one render. Created at the start of `process()` and dropped at
/// its end; nothing in here outlives a page.
#[derive(Debug)]
pub(crate) struct RenderContext<'c> {
    pub exclusions: ExclusionFilter<'c>,
    pub buckets: Buckets,
    pub resources: ResourceList,
    /// Inline scripts switched to the lazy placeholder type.
    pub lazy_scripts: usize,
}
impl<'c> RenderContext<'c> {
    pub fn new(exclusions: ExclusionFilter<'c>) -> Self {
        Self {
            exclusions,
            buckets: Buckets::default(),
            resources: ResourceList::default(),
            lazy_scripts: 0,
        }
    }

    /// Nothing was collected, so the page should be left exactly as it was.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.resources.is_empty() && self.lazy_scripts == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Category;
    use pagespeed_config::PatternList;

    #[test]
    fn test_header_display() {
        assert_eq!(Header::new("X-Accel-Buffering", "no").to_string(), "X-Accel-Buffering: no");
    }

    #[test]
    fn test_render_context_emptiness() {
        let patterns = PatternList::empty();
        let mut context = RenderContext::new(ExclusionFilter::js(&patterns));
        assert!(context.is_empty());
        context.lazy_scripts += 1;
        assert!(!context.is_empty());

        let mut context = RenderContext::new(ExclusionFilter::css(&patterns));
        context.buckets.push(Category::Inline, "<style></style>");
        assert!(!context.is_empty());
    }
}
