//! The on-disk cache of minified stylesheets and scripts.
//!
//! A local asset at `{base_url}skin/css/styles.css` gets a minified sibling
//! at `{media_dir}/cssmin/skin/css/styles.min.css`, which the page then
//! references as `{media_url}cssmin/skin/css/styles.min.css?v=<mtime>`. The
//! copy is rebuilt whenever the source is newer than it, and the `v` query
//! changes with it so browsers don't keep the old one.

mod cache;
pub mod error;
mod path;
mod preprocess;

pub use crate::cache::{AssetCache, CachedAsset};
pub use crate::path::validate as validate_path;
pub use crate::preprocess::{normalize_legacy_events, rebase_css_urls};
use derive_more::Display;

/// The two kinds of asset the cache knows how to minify.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    #[display("css")]
    Css,
    #[display("js")]
    Js,
}
impl AssetKind {
    /// File extension (without the dot) that source files must carry.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
        }
    }

    /// Directory below the media root that minified copies are written to.
    pub fn cache_dir(&self) -> &'static str {
        match self {
            Self::Css => "cssmin",
            Self::Js => "jsmin",
        }
    }
}
