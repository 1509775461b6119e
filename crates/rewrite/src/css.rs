use crate::bucket::Category;
use crate::consts::HEAD_CLOSE;
use crate::context::{Outcome, RenderContext, Request, Response};
use crate::error::Result;
use crate::exclude::ExclusionFilter;
use crate::grammar::{Action, CSS_GRAMMARS, Handler, Span, TagScanner};
use crate::images::{critical_images, preload_headers, preload_link};
use crate::reassemble::{collapse_blank_lines, insert_before_last, rfind_ignore_ascii_case};
use crate::tag;
use pagespeed_assets::{AssetCache, AssetKind};
use pagespeed_config::{Config, CssConfig};
use std::borrow::Cow;
use tracing::instrument;

const BUCKET_ORDER: [Category; 3] = [Category::Conditional, Category::External, Category::Inline];

/// Moves stylesheets to the end of `<head>` and announces critical images.
///
/// Conditional-comment groups go first, then stylesheet links, then
/// `<style>` blocks, each group in the order it appeared in the page. With
/// `minify` on, local stylesheet links point at minified copies.
#[derive(Debug)]
pub struct CssProcessor {
    config: CssConfig,
    cache: Option<AssetCache>,
}

impl CssProcessor {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            config: config.css.clone(),
            cache: config.css.minify.then(|| AssetCache::new(AssetKind::Css, &config.site)),
        })
    }

    /// Replaces the asset cache, regardless of whether `minify` is on.
    pub fn with_asset_cache(mut self, cache: AssetCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[instrument(skip_all, fields(action = %request.action, html_size = response.body.len()))]
    pub fn process(&self, request: &Request, response: &mut Response) -> Outcome {
        if request.xhr {
            return Outcome::Xhr;
        }
        if !self.config.enabled {
            return Outcome::Disabled;
        }

        let mut html = Cow::Borrowed(response.body.as_str());
        for src in critical_images(&html) {
            response.headers.extend(preload_headers(&src));
            let link = preload_link(&src);
            if html.contains(&link) {
                continue;
            }
            match insert_before_last(&html, HEAD_CLOSE, &format!("\n{link}")) {
                Some(updated) => html = Cow::Owned(updated),
                None => tracing::debug!(src = %src, "No </head> to add an image preload to"),
            }
        }
        let preloaded = matches!(html, Cow::Owned(_));

        if rfind_ignore_ascii_case(&html, HEAD_CLOSE).is_none() {
            tracing::warn!("No </head> found; leaving stylesheets in place");
            return Outcome::NoMarker;
        }

        let mut context = RenderContext::new(ExclusionFilter::css(self.config.effective_exclude()));
        for grammar in &CSS_GRAMMARS {
            let handler = grammar.handler();
            let updated = grammar.scan(&html, &mut |span| self.accept(&mut context, handler, span));
            if let Some(updated) = updated {
                html = Cow::Owned(updated);
            }
        }

        if context.is_empty() {
            tracing::debug!(preloaded, "No stylesheets to move");
            if preloaded {
                response.body = html.into_owned();
            }
            return Outcome::NothingToDefer;
        }

        let collapsed = collapse_blank_lines(&html);
        let Some(rewritten) = insert_before_last(&collapsed, HEAD_CLOSE, &context.buckets.concat(&BUCKET_ORDER)) else {
            tracing::warn!("Lost </head> while moving stylesheets; leaving page unmodified");
            return Outcome::NoMarker;
        };
        tracing::debug!(
            conditional = context.buckets.get(Category::Conditional).len(),
            external = context.buckets.get(Category::External).len(),
            inline = context.buckets.get(Category::Inline).len(),
            "Moved stylesheets to the end of <head>"
        );
        response.body = rewritten;
        Outcome::Rewritten
    }

    fn accept(&self, context: &mut RenderContext<'_>, handler: Handler, span: Span<'_>) -> Action {
        if context.exclusions.is_excluded(span.text) {
            tracing::trace!(offset = span.offset, "Stylesheet excluded");
            return Action::Keep;
        }
        let (category, tag) = match handler {
            Handler::ConditionalGroup => (Category::Conditional, span.text.to_string()),
            Handler::ExternalTag => match &self.cache {
                Some(cache) => (Category::External, Self::minified(cache, span.text)),
                None => (Category::External, span.text.to_string()),
            },
            Handler::InlineBlock | Handler::PlainInline => (Category::Inline, span.text.to_string()),
        };
        context.buckets.push(category, tag);
        Action::Remove
    }

    /// `link` with its `href` pointing at the minified copy, if there is one.
    fn minified(cache: &AssetCache, link: &str) -> String {
        let Some(href) = tag::attribute(link, "href").and_then(|attribute| attribute.value) else {
            return link.to_string();
        };
        let reference = tag::decode_attribute(href);
        let rewritten = cache.rewrite(&reference);
        match rewritten == *reference {
            true => link.to_string(),
            false => tag::with_attribute(link, "href", &rewritten),
        }
    }
}
