use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub(crate) const HEAD_CLOSE: &str = "</head>";
pub(crate) const BODY_CLOSE: &str = "</body>";
pub(crate) const CONDITIONAL_CLOSE: &str = "<![endif]-->";

/// Script type given to inline scripts that the client loader replays.
pub const LAZY_SCRIPT_TYPE: &str = "text/lazy-javascript";

// Stylesheets: conditional-comment groups of typed links, typed links, any
// `rel="stylesheet"` link, then inline style blocks.
regex!(
    CSS_CONDITIONAL_GROUP,
    r#"(?is)<!--\[if[^>]*>\s*(?:<link[^>]*type=["']text/css["'][^>]*>\s*)+<!\[endif\]-->"#
);
regex!(CSS_TYPED_LINK, r#"(?is)<link[^>]*type=["']text/css["'][^>]*/>"#);
regex!(CSS_STYLESHEET_LINK, r#"(?is)<link[^>]*rel=["']stylesheet["'][^>]*>"#);
regex!(STYLE_BLOCK, r"(?is)<style\b.*?</style\s*>");

// Scripts: conditional comments (each ending at its own `<![endif]-->`),
// then individual elements.
regex!(JS_CONDITIONAL_GROUP, r"(?is)<!--\[if[^>]*>.*?<!\[endif\]-->");
regex!(SCRIPT_ELEMENT, r"(?is)<script\b.*?</script\s*>");

regex!(
    ATTRIBUTE,
    r#"(?s)([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#
);
regex!(BLANK_LINES, r"(?m)^[\t\p{Zs}]*[\n\x0B\x0C\r\x{85}\x{2028}\x{2029}]+");

// Images that are likely to be the largest contentful paint.
selector!(
    CRITICAL_IMAGE_SELECTOR,
    r#"img[fetchpriority="high"], .catalog-product-view img#image-main, .category-image > img"#
);
