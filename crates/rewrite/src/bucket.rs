//! The Bucket Accumulator.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::HashSet;

/// Which bucket an accepted span goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Conditional,
    External,
    Inline,
}

/// Accepted tags, one ordered list per [`Category`]. Nothing is ever
/// reordered inside a bucket.
#[derive(Debug, Default)]
pub struct Buckets {
    conditional: Vec<String>,
    external: Vec<String>,
    inline: Vec<String>,
}
impl Buckets {
    pub fn push(&mut self, category: Category, tag: impl Into<String>) {
        self.bucket_mut(category).push(tag.into());
    }

    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Conditional => &self.conditional,
            Category::External => &self.external,
            Category::Inline => &self.inline,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditional.is_empty() && self.external.is_empty() && self.inline.is_empty()
    }

    /// Concatenates the buckets named in `order`, each in insertion order.
    pub fn concat(&self, order: &[Category]) -> String {
        order.iter().flat_map(|category| self.get(*category)).map(String::as_str).collect()
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Conditional => &mut self.conditional,
            Category::External => &mut self.external,
            Category::Inline => &mut self.inline,
        }
    }
}

/// Script URLs for the client loader, in first-encounter order, with exact
/// duplicates dropped.
#[derive(Debug, Default, Clone)]
pub struct ResourceList {
    urls: Vec<String>,
    seen: HashSet<String>,
}
impl ResourceList {
    /// Appends `url` unless it is already listed. Returns whether it was added.
    pub fn push(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.urls.push(url);
        true
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// A JSON array literal that is safe to place inside a `<script>` element.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string(&self.urls).or_raise(|| ErrorKind::Serialize)?;
        Ok(json.replace("</", "<\\/"))
    }
}
