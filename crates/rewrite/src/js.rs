use crate::bucket::Category;
use crate::consts::{BODY_CLOSE, CONDITIONAL_CLOSE, LAZY_SCRIPT_TYPE, SCRIPT_ELEMENT};
use crate::context::{Outcome, RenderContext, Request, Response};
use crate::error::Result;
use crate::exclude::ExclusionFilter;
use crate::grammar::{Action, Handler, JS_GRAMMARS, Span, TagScanner};
use crate::loader::LoaderEmitter;
use crate::reassemble::{collapse_blank_lines, insert_before_last};
use crate::tag;
use pagespeed_assets::{AssetCache, AssetKind, normalize_legacy_events};
use pagespeed_config::{Config, JsConfig};
use pagespeed_minify::{HtmlMinifier, Minifier};
use std::borrow::Cow;
use tracing::instrument;

const JAVASCRIPT_TYPES: [&str; 3] = ["text/javascript", "application/javascript", "application/x-javascript"];

/// Moves scripts out of the way until the visitor interacts with the page.
///
/// External scripts are removed and handed to the client loader; inline
/// scripts stay where they are but get a placeholder type so the browser
/// skips them, and the loader replays them in order once every external
/// script has loaded.
#[derive(Debug)]
pub struct JsProcessor {
    config: JsConfig,
    cache: Option<AssetCache>,
    loader: LoaderEmitter,
    html_minifier: Option<HtmlMinifier>,
}

impl JsProcessor {
    /// Fails only if the embedded client loader template is unusable.
    pub fn new(config: &Config) -> Result<Self> {
        let loader = LoaderEmitter::new(config.js.only_on_user_interaction)?;
        Ok(Self {
            config: config.js.clone(),
            cache: config.js.minify.then(|| AssetCache::new(AssetKind::Js, &config.site)),
            loader: if config.js.minify { loader.minified() } else { loader },
            html_minifier: config.js.minify_html.then_some(HtmlMinifier),
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
        if self.config.exclude_actions.matches(&request.action) {
            tracing::debug!("Action excluded from script deferral");
            return Outcome::ExcludedAction;
        }
        if response.body.trim().is_empty() {
            return Outcome::EmptyBody;
        }

        let mut html = Cow::Borrowed(response.body.as_str());
        let mut context = RenderContext::new(ExclusionFilter::js(self.config.effective_exclude()));
        for grammar in &JS_GRAMMARS {
            let handler = grammar.handler();
            let updated = grammar.scan(&html, &mut |span| self.accept(&mut context, handler, span));
            if let Some(updated) = updated {
                html = Cow::Owned(updated);
            }
        }

        if context.is_empty() {
            tracing::debug!("No scripts to defer");
            return Outcome::NothingToDefer;
        }

        let loader = match self.loader.emit(&context.resources) {
            Ok(loader) => loader,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not emit client loader; leaving page unmodified");
                return Outcome::LoaderFailed;
            },
        };
        let insertion = format!("{}{loader}", context.buckets.concat(&[Category::Conditional]));
        let collapsed = collapse_blank_lines(&html);
        let Some(rewritten) = insert_before_last(&collapsed, BODY_CLOSE, &insertion) else {
            tracing::warn!("No </body> found; leaving scripts in place");
            return Outcome::NoMarker;
        };
        tracing::debug!(
            conditional = context.buckets.get(Category::Conditional).len(),
            external = context.resources.len(),
            inline = context.lazy_scripts,
            "Deferred scripts"
        );

        response.body = match &self.html_minifier {
            None => rewritten,
            Some(minifier) => match minifier.minify(&rewritten) {
                Ok(minified) => minified,
                Err(err) => {
                    tracing::warn!(error = ?err, "Could not minify page; serving it unminified");
                    rewritten
                },
            },
        };
        Outcome::Rewritten
    }

    fn accept(&self, context: &mut RenderContext<'_>, handler: Handler, span: Span<'_>) -> Action {
        match handler {
            Handler::ConditionalGroup => Self::accept_conditional(context, span),
            Handler::ExternalTag => self.accept_external(context, span),
            Handler::PlainInline => Self::accept_inline(context, span),
            Handler::InlineBlock => Action::Keep,
        }
    }

    /// Groups of inline scripts move as a whole. Groups with a `src` are left
    /// for the external grammar to pick apart, and groups holding anything
    /// besides scripts stay where they are.
    fn accept_conditional(context: &mut RenderContext<'_>, span: Span<'_>) -> Action {
        let Some(body) = conditional_body(span.text) else {
            return Action::Keep;
        };
        let mut scripts = SCRIPT_ELEMENT.find_iter(body).peekable();
        if scripts.peek().is_none() || !SCRIPT_ELEMENT.replace_all(body, "").trim().is_empty() {
            return Action::Keep;
        }
        if scripts.any(|script| tag::attribute(script.as_str(), "src").is_some()) {
            return Action::Keep;
        }
        if context.exclusions.is_excluded(span.text) {
            return Action::Keep;
        }
        context.buckets.push(Category::Conditional, span.text);
        Action::Remove
    }

    fn accept_external(&self, context: &mut RenderContext<'_>, span: Span<'_>) -> Action {
        if context.exclusions.is_excluded(span.text) {
            tracing::trace!(offset = span.offset, "Script excluded");
            return Action::Keep;
        }
        let Some(src) = tag::attribute(span.text, "src").and_then(|attribute| attribute.value) else {
            return Action::Keep;
        };
        if !is_javascript(span.text) {
            return Action::Keep;
        }
        let src = tag::decode_attribute(src.trim());
        if src.is_empty() {
            return Action::Keep;
        }
        let url = match &self.cache {
            Some(cache) => cache.rewrite(&src),
            None => src.into_owned(),
        };
        if !context.resources.push(url) {
            tracing::trace!(offset = span.offset, "Dropped duplicate script");
        }
        Action::Remove
    }

    /// Keeps the script where it is, but with a type the browser won't run.
    fn accept_inline(context: &mut RenderContext<'_>, span: Span<'_>) -> Action {
        let open = tag::opening_tag(span.text);
        let close = span.text.rfind("</").unwrap_or(span.text.len());
        if open.len() > close || tag::attribute(open, "src").is_some() || !is_javascript(open) {
            return Action::Keep;
        }
        if context.exclusions.is_excluded(span.text) {
            return Action::Keep;
        }
        let body = normalize_legacy_events(&span.text[open.len()..close]);
        context.lazy_scripts += 1;
        Action::Replace(format!(
            "{}{body}{}",
            tag::with_attribute(open, "type", LAZY_SCRIPT_TYPE),
            &span.text[close..]
        ))
    }
}

/// What sits between `<!--[if ...]>` and `<![endif]-->`.
fn conditional_body(group: &str) -> Option<&str> {
    let start = group.find('>')? + 1;
    let end = group.len().checked_sub(CONDITIONAL_CLOSE.len())?;
    group.get(start..end)
}

/// Whether the script element starting `markup` is classic JavaScript: no
/// `type`, an empty one, or one of the JavaScript MIME types.
fn is_javascript(markup: &str) -> bool {
    let Some(kind) = tag::attribute(markup, "type").and_then(|attribute| attribute.value) else {
        return true;
    };
    let kind = kind.split(';').next().unwrap_or_default().trim();
    kind.is_empty() || JAVASCRIPT_TYPES.iter().any(|known| known.eq_ignore_ascii_case(kind))
}
