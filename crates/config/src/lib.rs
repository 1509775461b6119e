//! Configuration for the pagespeed processors.
//!
//! Configuration is layered with [`figment`]: a file (TOML, YAML or JSON,
//! chosen by extension) and then environment variables prefixed with
//! `PAGESPEED_`, using `__` to descend into sections
//! (`PAGESPEED_JS__MINIFY=true`).
//!
//! Exclude lists are compiled while loading, so a typo in a pattern is
//! reported once at startup instead of on every rendered page.

pub mod error;
mod pattern;

pub use crate::pattern::PatternList;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::instrument;
use url::Url;

const ENV_PREFIX: &str = "PAGESPEED_";
const DEFAULT_FILE_NAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub css: CssConfig,
    #[serde(default)]
    pub js: JsConfig,
}

/// Where this site lives, both on the web and on disk.
///
/// `base_url` and `base_dir` describe the same tree: the asset at
/// `{base_url}skin/style.css` is the file `{base_dir}/skin/style.css`.
/// Minified artifacts are written below `media_dir` and served from
/// `media_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub base_url: Url,
    pub base_dir: PathBuf,
    pub media_url: Url,
    pub media_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    pub enabled: bool,
    pub exclude_enabled: bool,
    pub exclude: PatternList,
    pub minify: bool,
}
impl Default for CssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_enabled: false,
            exclude: PatternList::empty(),
            minify: false,
        }
    }
}
impl CssConfig {
    /// The exclude list that is actually in effect; empty unless
    /// `exclude_enabled` is set.
    pub fn effective_exclude(&self) -> &PatternList {
        effective(self.exclude_enabled, &self.exclude)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JsConfig {
    pub enabled: bool,
    pub exclude_enabled: bool,
    pub exclude: PatternList,
    /// Route identifiers for which the whole JS pass is skipped. Always
    /// active, regardless of `exclude_enabled`.
    pub exclude_actions: PatternList,
    pub minify: bool,
    pub minify_html: bool,
    pub only_on_user_interaction: bool,
}
impl Default for JsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_enabled: false,
            exclude: PatternList::empty(),
            exclude_actions: PatternList::empty(),
            minify: false,
            minify_html: false,
            only_on_user_interaction: true,
        }
    }
}
impl JsConfig {
    /// The exclude list that is actually in effect; empty unless
    /// `exclude_enabled` is set.
    pub fn effective_exclude(&self) -> &PatternList {
        effective(self.exclude_enabled, &self.exclude)
    }
}

fn effective(enabled: bool, list: &PatternList) -> &PatternList {
    static EMPTY: PatternList = PatternList::EMPTY;
    if enabled { list } else { &EMPTY }
}

impl Config {
    /// Loads configuration from `path` (or the default location when `None`)
    /// with environment overrides layered on top.
    ///
    /// A missing file is not an error: everything can be supplied through
    /// the environment.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        Self::figment(&path)?.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// `$XDG_CONFIG_HOME/pagespeed/config.toml`, or the platform equivalent.
    pub fn default_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "pagespeed")
            .map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
            .ok_or_raise(|| ErrorKind::NoDefaultLocation)
    }

    fn figment(path: &Path) -> Result<Figment> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Configuration file not found; using environment only");
        }
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            Some("yaml" | "yml") => Figment::new().merge(Yaml::file(path)),
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}
