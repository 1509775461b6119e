//! Rewrites rendered HTML so stylesheets and scripts stop blocking the
//! first paint.
//!
//! Two processors run against a finished page:
//!
//! - [`CssProcessor`] gathers stylesheet links and `<style>` blocks and puts
//!   them back at the end of `<head>`, after announcing likely
//!   above-the-fold images with preload hints;
//! - [`JsProcessor`] takes external scripts out of the page, disables inline
//!   scripts in place, and injects a loader that brings both back, in their
//!   original order, once the visitor interacts with the page.
//!
//! Both work on the page as text, grammar by grammar (see [`grammar`]), and
//! every failure degrades to leaving the affected part of the page alone.
//!
//! ```
//! use pagespeed_rewrite::{CssProcessor, Outcome, Request, Response};
//! # use pagespeed_config::{Config, CssConfig, JsConfig, SiteConfig};
//! # let config = Config {
//! #     site: SiteConfig {
//! #         base_url: "https://shop.example/".parse().unwrap(),
//! #         base_dir: "/var/www/shop".into(),
//! #         media_url: "https://shop.example/media/".parse().unwrap(),
//! #         media_dir: "/var/www/shop/media".into(),
//! #     },
//! #     css: CssConfig::default(),
//! #     js: JsConfig::default(),
//! # };
//! let processor = CssProcessor::new(&config).unwrap();
//! let mut response = Response::new("<head><style>p{}</style><title>x</title></head>");
//! assert_eq!(processor.process(&Request::new("cms_index_index"), &mut response), Outcome::Rewritten);
//! assert_eq!(response.body, "<head><title>x</title><style>p{}</style></head>");
//! ```

pub mod bucket;
mod consts;
mod context;
mod css;
pub mod error;
pub mod exclude;
pub mod grammar;
pub mod images;
mod js;
pub mod loader;
pub mod reassemble;
pub mod tag;

pub use crate::consts::LAZY_SCRIPT_TYPE;
pub use crate::context::{Header, Outcome, Request, Response};
pub use crate::css::CssProcessor;
pub use crate::js::JsProcessor;
