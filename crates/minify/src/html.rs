use crate::Minifier;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use minify_html::Cfg;
use tracing::instrument;

/// Whole-document HTML minifier.
///
/// Closing tags, the `<html>`/`<head>` opening tags and comments are kept:
/// conditional comments carry legacy-browser assets and must survive.
/// Inline scripts and styles are left as they are, deferred scripts are not
/// JavaScript as far as the browser is concerned until they're replayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMinifier;

impl HtmlMinifier {
    fn cfg() -> Cfg {
        Cfg {
            keep_closing_tags: true,
            keep_html_and_head_opening_tags: true,
            keep_comments: true,
            minify_css: false,
            minify_js: false,
            ..Cfg::default()
        }
    }
}

impl Minifier for HtmlMinifier {
    #[instrument(level = "trace", skip_all, fields(size = source.len()))]
    fn minify(&self, source: &str) -> Result<String> {
        let output = minify_html::minify(source.as_bytes(), &Self::cfg());
        String::from_utf8(output).or_raise(|| ErrorKind::Encoding)
    }
}
