//! The Exclusion Filter: spans that must stay exactly where they are.

use pagespeed_config::PatternList;

/// Script spans carrying either of these are already non-blocking.
const SCRIPT_MARKERS: [&str; 2] = ["defer", "async"];

/// Decides, per span, whether it is left alone.
///
/// Captured once per render from configuration; [`is_excluded`](Self::is_excluded)
/// is a pure predicate over span text.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionFilter<'c> {
    patterns: &'c PatternList,
    markers: &'static [&'static str],
}
impl<'c> ExclusionFilter<'c> {
    /// Stylesheets are only excluded by the operator's patterns.
    pub fn css(patterns: &'c PatternList) -> Self {
        Self { patterns, markers: &[] }
    }

    /// Scripts are also excluded when they contain `defer` or `async`
    /// anywhere in their text.
    pub fn js(patterns: &'c PatternList) -> Self {
        Self {
            patterns,
            markers: &SCRIPT_MARKERS,
        }
    }

    pub fn is_excluded(&self, span: &str) -> bool {
        self.markers.iter().any(|marker| span.contains(marker)) || self.patterns.matches(span)
    }
}
