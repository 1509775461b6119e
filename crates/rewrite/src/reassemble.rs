//! The Reassembler: tidying up after removal and splicing buckets back in.

use crate::consts::BLANK_LINES;
use regex::NoExpand;
use std::borrow::Cow;

/// Removes lines that hold nothing but horizontal whitespace, which is what
/// removing a tag from its own line leaves behind.
pub fn collapse_blank_lines(html: &str) -> Cow<'_, str> {
    BLANK_LINES.replace_all(html, NoExpand(""))
}

/// Byte offset of the last ASCII case-insensitive occurrence of `needle`.
pub fn rfind_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.as_bytes().windows(needle.len()).rposition(|window| window.eq_ignore_ascii_case(needle))
}

/// Inserts `insertion` immediately before the last occurrence of `marker`,
/// or returns `None` if the marker doesn't occur at all.
pub fn insert_before_last(html: &str, marker: &str, insertion: &str) -> Option<String> {
    let position = rfind_ignore_ascii_case(html, marker)?;
    let mut output = String::with_capacity(html.len() + insertion.len());
    output.push_str(&html[..position]);
    output.push_str(insertion);
    output.push_str(&html[position..]);
    Some(output)
}
