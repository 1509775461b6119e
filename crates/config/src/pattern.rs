//! Operator-supplied regular expression lists.
//!
//! Exclude lists are written by hand into a configuration file, one pattern
//! per line. Patterns copied from older setups are often written in the
//! delimited `/body/flags` form, so those are accepted too and translated
//! into an equivalent inline-flag expression.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use std::borrow::Cow;

const DELIMITERS: [char; 7] = ['/', '#', '~', '@', '!', '%', '|'];
/// Trailing modifiers a delimited pattern may carry. `u` is accepted and
/// ignored, since matching is always Unicode-aware.
const MODIFIERS: [char; 6] = ['i', 'm', 's', 'x', 'u', 'U'];

/// An ordered list of compiled regular expressions.
///
/// A haystack matches the list when at least one pattern finds a
/// **non-empty** match inside it. An empty list never matches anything.
#[derive(Debug, Clone, Default)]
pub struct PatternList {
    patterns: Vec<Regex>,
}
impl PatternList {
    pub const EMPTY: Self = Self { patterns: Vec::new() };

    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles a newline-delimited list of patterns. Blank lines are ignored
    /// and every entry is trimmed.
    ///
    /// ```
    /// use pagespeed_config::PatternList;
    /// let list = PatternList::parse("\n  google-analytics\n/TRACKING/i\n").unwrap();
    /// assert_eq!(list.len(), 2);
    /// assert!(list.matches("<script>// tracking pixel</script>"));
    /// assert!(!list.matches("<script src=\"/app.js\"></script>"));
    /// ```
    pub fn parse(source: &str) -> Result<Self> {
        Self::from_lines(source.lines())
    }

    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            patterns.push(compile(line).or_raise(|| ErrorKind::InvalidPattern(line.to_string()))?);
        }
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns `true` if any pattern matches a non-empty part of `haystack`.
    pub fn matches(&self, haystack: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.find_iter(haystack).any(|m| !m.is_empty()))
    }
}

impl<'de> Deserialize<'de> for PatternList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Lines(Vec<String>),
        }
        let list = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self::parse(&text),
            Raw::Lines(lines) => Self::from_lines(lines),
        };
        list.map_err(|err| D::Error::custom(err.to_string()))
    }
}

fn compile(entry: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&translate(entry))
}

/// Converts a delimited pattern (`#<script[^>]*>#i`) into the inline-flag
/// form the `regex` crate understands (`(?i)<script[^>]*>`). Anything that
/// isn't delimited, including a path like `/js/varien` whose "modifiers"
/// aren't modifiers, is returned untouched.
fn translate(entry: &str) -> Cow<'_, str> {
    let Some(delimiter) = entry.chars().next().filter(|c| DELIMITERS.contains(c)) else {
        return Cow::Borrowed(entry);
    };
    let Some(end) = entry.rfind(delimiter).filter(|end| *end > 0) else {
        return Cow::Borrowed(entry);
    };
    let (body, flags) = (&entry[1..end], &entry[end + 1..]);
    if !flags.chars().all(|c| MODIFIERS.contains(&c)) {
        return Cow::Borrowed(entry);
    }
    // `|` is alternation, so an escaped pipe has to stay escaped.
    let body = match delimiter {
        '|' => body.to_string(),
        _ => body.replace(&format!("\\{delimiter}"), &delimiter.to_string()),
    };
    let flags: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's' | 'x' | 'U')).collect();
    match flags.is_empty() {
        true => Cow::Owned(body),
        false => Cow::Owned(format!("(?{flags}){body}")),
    }
}
