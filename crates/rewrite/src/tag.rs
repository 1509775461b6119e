//! Attribute access on raw tag text.
//!
//! The grammars hand over matched markup as text. These helpers read and
//! rewrite attributes of the *opening* tag in that text without building a
//! DOM, keeping everything else byte-for-byte as written.

use crate::consts::ATTRIBUTE;
use std::borrow::Cow;
use std::ops::Range;

/// One attribute of an opening tag, with byte ranges into that tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'t> {
    pub name: &'t str,
    /// `None` for a bare attribute such as `defer`.
    pub value: Option<&'t str>,
    pub range: Range<usize>,
}

/// The opening tag at the start of `markup`, up to and including the first
/// `>` that is not inside a quoted attribute value.
pub fn opening_tag(markup: &str) -> &str {
    let mut quote = None;
    for (index, c) in markup.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            (None, '>') => return &markup[..=index],
            _ => {},
        }
    }
    markup
}

/// Attributes of the opening tag at the start of `markup`, in source order.
pub fn attributes(markup: &str) -> impl Iterator<Item = Attribute<'_>> {
    let tag = opening_tag(markup);
    let name_end = tag
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_whitespace() || matches!(c, '>' | '/'))
        .map_or(tag.len(), |(index, _)| index);
    ATTRIBUTE.captures_iter(&tag[name_end..]).filter_map(move |captures| {
        let whole = captures.get(0)?;
        let name = captures.get(1)?.as_str();
        let value = (2..=4).find_map(|group| captures.get(group)).map(|m| m.as_str());
        Some(Attribute {
            name,
            value,
            range: whole.start() + name_end..whole.end() + name_end,
        })
    })
}

/// The first attribute called `name` (ASCII case-insensitive).
pub fn attribute<'t>(markup: &'t str, name: &str) -> Option<Attribute<'t>> {
    attributes(markup).find(|attribute| attribute.name.eq_ignore_ascii_case(name))
}

/// Returns `markup` with attribute `name` of its opening tag set to `value`,
/// replacing the existing attribute or adding one right after the tag name.
///
/// ```
/// use pagespeed_rewrite::tag::with_attribute;
/// assert_eq!(
///     with_attribute("<script type='text/javascript'>go()</script>", "type", "text/lazy-javascript"),
///     r#"<script type="text/lazy-javascript">go()</script>"#,
/// );
/// assert_eq!(with_attribute("<script>go()</script>", "type", "module"), r#"<script type="module">go()</script>"#);
/// ```
pub fn with_attribute(markup: &str, name: &str, value: &str) -> String {
    let replacement = format!("{name}=\"{}\"", escape_attribute(value));
    match attribute(markup, name) {
        Some(existing) => {
            format!("{}{replacement}{}", &markup[..existing.range.start], &markup[existing.range.end..])
        },
        None => {
            let tag_name_end = markup
                .char_indices()
                .skip(1)
                .find(|(_, c)| c.is_ascii_whitespace() || matches!(c, '>' | '/'))
                .map_or(markup.len(), |(index, _)| index);
            format!("{} {replacement}{}", &markup[..tag_name_end], &markup[tag_name_end..])
        },
    }
}

/// Escapes text for use inside a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    match value.contains(['&', '"', '<']) {
        false => Cow::Borrowed(value),
        true => Cow::Owned(value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")),
    }
}

/// Decodes the handful of character references that show up in URL
/// attributes (`&amp;` in query strings, mostly).
pub fn decode_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&#039;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&"),
    )
}
