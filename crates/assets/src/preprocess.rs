//! Source rewrites applied before an asset is minified.
//!
//! Minified copies are served from a different directory than the original,
//! so relative references inside stylesheets have to be rebased. Scripts get
//! their readiness hooks renamed so the deferred loader can fire them.

use regex::{Captures, NoExpand, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use url::{Position, Url};

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(CSS_URL, r#"(?i)url\(\s*(['"]?)([^'")]*)['"]?\s*\)"#);

regex!(DOM_CONTENT_LOADED, r#"(?:window|document)\.addEventListener\(\s*['"](?i:DOMContentLoad(?:ed)?)['"]"#);
regex!(PROTOTYPE_DOM_LOADED, r#"(?:window|document)\.observe\s*\(\s*['"]dom:loaded['"]\s*,\s*function"#);
regex!(JQUERY_READY, r"\$\(\s*document\s*\)\.ready\s*\(\s*function");
regex!(JQUERY_NOCONFLICT_READY, r"\$j\(\s*document\s*\)\.ready\s*\(\s*function");
regex!(EXTERNAL_SCRIPTS_LISTENER, r#"window\.addEventListener\(\s*['"]init-external-scripts['"]"#);

/// Rewrites relative `url(...)` references in `css` so they still point at
/// the same resource once the stylesheet is served from somewhere else.
///
/// `stylesheet` is the URL the CSS was originally served from. References
/// that are root-relative, protocol-relative, fragment-only or carry their
/// own scheme (`data:`, `https:`) are left exactly as written. Rebased
/// references on the same origin as `base_url` are written without scheme
/// and host.
///
/// ```
/// use url::Url;
/// use pagespeed_assets::rebase_css_urls;
/// let base = Url::parse("https://shop.example/").unwrap();
/// let sheet = base.join("skin/css/styles.css").unwrap();
/// assert_eq!(
///     rebase_css_urls("a{background:url('../img/bg.png')}", &sheet, &base),
///     "a{background:url('/skin/img/bg.png')}",
/// );
/// ```
pub fn rebase_css_urls<'a>(css: &'a str, stylesheet: &Url, base_url: &Url) -> Cow<'a, str> {
    CSS_URL.replace_all(css, |captures: &Captures| {
        let quote = &captures[1];
        let target = captures[2].trim();
        if is_fixed_reference(target) {
            return captures[0].to_string();
        }
        match stylesheet.join(target) {
            Ok(rebased) if rebased.origin() == base_url.origin() => {
                format!("url({quote}{}{quote})", &rebased[Position::BeforePath..])
            },
            Ok(rebased) => format!("url({quote}{rebased}{quote})"),
            Err(err) => {
                tracing::debug!(target, error = %err, "Leaving unresolvable CSS reference alone");
                captures[0].to_string()
            },
        }
    })
}

fn is_fixed_reference(target: &str) -> bool {
    target.is_empty() || target.starts_with(['/', '#']) || Url::parse(target).is_ok()
}

/// Renames the page-readiness hooks legacy scripts listen for, so that they
/// run when the deferred loader dispatches its replacement events instead of
/// when the browser fires the originals (which will already have happened).
///
/// | Written as                                            | Becomes                                       |
/// |-------------------------------------------------------|-----------------------------------------------|
/// | `document.addEventListener("DOMContentLoaded"`        | `window.addEventListener("DomContentLoad2"`   |
/// | `document.observe('dom:loaded', function`             | `window.addEventListener("DomContentLoad2", function` |
/// | `$(document).ready(function`, `$j(document).ready(function` | `window.addEventListener("load2", function` |
/// | `window.addEventListener('init-external-scripts'`     | `window.addEventListener("init-external-scripts2"` |
///
/// Already-normalized text is left unchanged.
pub fn normalize_legacy_events(js: &str) -> Cow<'_, str> {
    let rules: [(&Regex, &str); 5] = [
        (&DOM_CONTENT_LOADED, r#"window.addEventListener("DomContentLoad2""#),
        (&PROTOTYPE_DOM_LOADED, r#"window.addEventListener("DomContentLoad2", function"#),
        (&JQUERY_READY, r#"window.addEventListener("load2", function"#),
        (&JQUERY_NOCONFLICT_READY, r#"window.addEventListener("load2", function"#),
        (&EXTERNAL_SCRIPTS_LISTENER, r#"window.addEventListener("init-external-scripts2""#),
    ];
    let mut output = Cow::Borrowed(js);
    for (pattern, replacement) in rules {
        if pattern.is_match(&output) {
            let replaced = pattern.replace_all(&output, NoExpand(replacement)).into_owned();
            output = Cow::Owned(replaced);
        }
    }
    output
}
