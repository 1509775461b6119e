//! The Critical-Image Hinter.
//!
//! The only place a document is parsed as a tree: the rules are structural
//! ("the `img` directly inside `.category-image`") and a textual grammar
//! would get them wrong.

use crate::consts::CRITICAL_IMAGE_SELECTOR;
use crate::context::Header;
use crate::tag::escape_attribute;
use scraper::Html;
use std::collections::HashSet;
use tracing::instrument;

/// `src` values of likely above-the-fold images, in document order, without
/// duplicates. Images with an empty or missing `src` are skipped.
#[instrument(level = "debug", skip(html), fields(html_size = html.len()))]
pub fn critical_images(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let images: Vec<String> = document
        .select(&CRITICAL_IMAGE_SELECTOR)
        .filter_map(|element| element.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && seen.insert(src.to_string()))
        .map(str::to_string)
        .collect();
    tracing::debug!(count = images.len(), "Found critical images");
    images
}

/// Response headers announcing one critical image.
pub fn preload_headers(src: &str) -> [Header; 3] {
    [
        Header::new("Early-Hints", "true"),
        Header::new("X-Accel-Buffering", "no"),
        Header::new("Link", format!("<{src}>; rel=preload; as=image")),
    ]
}

/// The `<link>` element preloading one critical image.
pub fn preload_link(src: &str) -> String {
    format!(r#"<link rel="preload" as="image" href="{}" />"#, escape_attribute(src))
}
