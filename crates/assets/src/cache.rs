use crate::AssetKind;
use crate::error::{ErrorKind, Result, map_io_error};
use crate::path::validate;
use crate::preprocess::{normalize_legacy_events, rebase_css_urls};
use exn::OptionExt;
use pagespeed_config::SiteConfig;
use pagespeed_minify::{CssMinifier, JsMinifier, Minifier};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::OffsetDateTime;
use tracing::instrument;
use url::Url;

/// Mode of minified copies: world-readable, like the sources they mirror.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Where a local asset lives, and where its minified copy goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    /// Absolute URL of the original asset, without query or fragment.
    pub url: Url,
    pub source: PathBuf,
    pub output: PathBuf,
    /// Public URL of the minified copy, before the version query is added.
    pub public_url: Url,
}

/// Produces (and reuses) minified copies of local assets of one [`AssetKind`].
pub struct AssetCache {
    kind: AssetKind,
    base_url: Url,
    base_dir: PathBuf,
    media_url: Url,
    media_dir: PathBuf,
    minifier: Box<dyn Minifier>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url.as_str())
            .field("media_dir", &self.media_dir)
            .finish_non_exhaustive()
    }
}

impl AssetCache {
    /// A cache using the default minifier for `kind`.
    pub fn new(kind: AssetKind, site: &SiteConfig) -> Self {
        match kind {
            AssetKind::Css => Self::with_minifier(kind, site, CssMinifier),
            AssetKind::Js => Self::with_minifier(kind, site, JsMinifier),
        }
    }

    pub fn with_minifier(kind: AssetKind, site: &SiteConfig, minifier: impl Minifier + 'static) -> Self {
        Self {
            kind,
            base_url: as_directory(&site.base_url),
            base_dir: site.base_dir.clone(),
            media_url: as_directory(&site.media_url),
            media_dir: site.media_dir.clone(),
            minifier: Box::new(minifier),
        }
    }

    /// Works out whether `reference` (as written in an `href` or `src`) names
    /// a local asset this cache is responsible for.
    ///
    /// Returns `None` for anything on another origin or outside the site's
    /// base path, anything with the wrong extension, and anything that looks
    /// already minified (`*.min.*`). Query strings and fragments are ignored.
    pub fn locate(&self, reference: &str) -> Option<CachedAsset> {
        let mut url = self.base_url.join(reference.trim()).ok()?;
        if url.origin() != self.base_url.origin() {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);
        let relative = url.path().strip_prefix(self.base_url.path())?.to_string();
        let (directory, file_name) = relative.rsplit_once('/').unwrap_or(("", &relative));
        if file_name.contains(".min.") {
            return None;
        }
        let extension = self.kind.extension();
        let stem = Path::new(file_name)
            .extension()
            .filter(|ext| ext.eq_ignore_ascii_case(extension))
            .and_then(|_| file_name.get(..file_name.len() - extension.len() - 1))
            .filter(|stem| !stem.is_empty())?;
        let output_relative = match directory {
            "" => format!("{stem}.min.{extension}"),
            directory => format!("{directory}/{stem}.min.{extension}"),
        };
        let (source, output) = match (validate(&relative), validate(&output_relative)) {
            (Ok(source), Ok(output)) => (source, output),
            (Err(err), _) | (_, Err(err)) => {
                tracing::debug!(reference, error = ?err, "Refusing to map asset reference onto the filesystem");
                return None;
            },
        };
        let public_url = self.media_url.join(&format!("{}/{output_relative}", self.kind.cache_dir())).ok()?;
        Some(CachedAsset {
            url,
            source: self.base_dir.join(source),
            output: self.media_dir.join(self.kind.cache_dir()).join(output),
            public_url,
        })
    }

    /// Returns the versioned public URL of the minified copy of `reference`,
    /// building or rebuilding that copy first if needed.
    ///
    /// `Ok(None)` means the reference isn't a local asset and should be left
    /// as it is. An error means the reference *is* local but no usable copy
    /// could be produced.
    #[instrument(level = "debug", skip(self), fields(kind = %self.kind))]
    pub fn resolve(&self, reference: &str) -> Result<Option<String>> {
        let Some(asset) = self.locate(reference) else {
            tracing::trace!("Not a local asset");
            return Ok(None);
        };
        let version = self.ensure(&asset)?.unix_timestamp();
        let mut public_url = asset.public_url;
        public_url.query_pairs_mut().append_pair("v", &version.to_string());
        Ok(Some(public_url.into()))
    }

    /// Like [`resolve`](Self::resolve), but never fails: whenever there is
    /// no minified copy to point at, the original reference comes back.
    pub fn rewrite(&self, reference: &str) -> String {
        match self.resolve(reference) {
            Ok(Some(url)) => url,
            Ok(None) => reference.to_string(),
            Err(err) => {
                tracing::warn!(reference, error = ?err, "Serving original asset instead of a minified copy");
                reference.to_string()
            },
        }
    }

    /// Makes sure the output is at least as new as the source, returning the
    /// output's modification time.
    fn ensure(&self, asset: &CachedAsset) -> Result<OffsetDateTime> {
        let source_modified = modified(&asset.source)?;
        match modified(&asset.output) {
            Ok(output_modified) if output_modified >= source_modified => return Ok(output_modified),
            Ok(_) => {
                tracing::debug!(output = %asset.output.display(), "Minified copy is stale");
                if let Err(err) = fs::remove_file(&asset.output)
                    && err.kind() != std::io::ErrorKind::NotFound
                {
                    exn::bail!(map_io_error(err, &asset.output));
                }
            },
            Err(err) if matches!(*err, ErrorKind::NotFound(_)) => {},
            Err(err) => return Err(err),
        }
        self.build(asset)?;
        modified(&asset.output)
    }

    fn build(&self, asset: &CachedAsset) -> Result<()> {
        let source = fs::read_to_string(&asset.source).map_err(|e| map_io_error(e, &asset.source))?;
        let prepared = match self.kind {
            AssetKind::Css => rebase_css_urls(&source, &asset.url, &self.base_url),
            AssetKind::Js => normalize_legacy_events(&source),
        };
        let minified = self
            .minifier
            .minify(&prepared)
            .map_err(|err| err.raise(ErrorKind::Minify(asset.source.clone())))?;
        let directory = asset
            .output
            .parent()
            .ok_or_raise(|| ErrorKind::InvalidPath(asset.output.display().to_string()))?;
        fs::create_dir_all(directory).map_err(|e| map_io_error(e, directory))?;
        // Written next to the target and renamed into place, so a concurrent
        // reader sees either the old copy or the complete new one.
        let mut staged = NamedTempFile::new_in(directory).map_err(|e| map_io_error(e, directory))?;
        // Temporary files start out private; the web server has to read this one.
        make_public(staged.as_file()).map_err(|e| map_io_error(e, directory))?;
        staged.write_all(minified.as_bytes()).map_err(|e| map_io_error(e, directory))?;
        staged.persist(&asset.output).map_err(|e| map_io_error(e.error, &asset.output))?;
        tracing::debug!(
            source = %asset.source.display(),
            output = %asset.output.display(),
            original_size = source.len(),
            minified_size = minified.len(),
            "Wrote minified copy"
        );
        Ok(())
    }
}

#[cfg(unix)]
fn make_public(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(OUTPUT_MODE))
}

#[cfg(not(unix))]
fn make_public(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

fn modified(path: &Path) -> Result<OffsetDateTime> {
    let metadata = fs::metadata(path).map_err(|e| map_io_error(e, path))?;
    Ok(metadata.modified().map_err(|e| map_io_error(e, path))?.into())
}

/// `https://shop.example/store` and `https://shop.example/store/` both mean
/// "the directory `store`" in configuration.
fn as_directory(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagespeed_minify::MockMinifier;
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn site(root: &Path, base_url: &str) -> SiteConfig {
        SiteConfig {
            base_url: Url::parse(base_url).unwrap(),
            base_dir: root.to_path_buf(),
            media_url: Url::parse("https://shop.example/media").unwrap(),
            media_dir: root.join("media"),
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn version_of(url: &str) -> i64 {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.parse().unwrap())
            .unwrap()
    }

    #[rstest]
    #[case(AssetKind::Css, "/skin/css/styles.css", Some("media/cssmin/skin/css/styles.min.css"))]
    #[case(AssetKind::Css, "https://shop.example/skin/css/styles.css?v=3#top", Some("media/cssmin/skin/css/styles.min.css"))]
    #[case(AssetKind::Css, "skin/a.CSS", Some("media/cssmin/skin/a.min.css"))]
    #[case(AssetKind::Js, "/js/prototype/prototype.js", Some("media/jsmin/js/prototype/prototype.min.js"))]
    #[case(AssetKind::Js, "/app.js", Some("media/jsmin/app.min.js"))]
    #[case(AssetKind::Css, "https://cdn.example/skin/css/styles.css", None)]
    #[case(AssetKind::Css, "//cdn.example/styles.css", None)]
    #[case(AssetKind::Css, "http://shop.example/styles.css", None)]
    #[case(AssetKind::Css, "/skin/css/styles.min.css", None)]
    #[case(AssetKind::Css, "/js/app.js", None)]
    #[case(AssetKind::Js, "/js/", None)]
    #[case(AssetKind::Js, "/.js", None)]
    fn test_locate(#[case] kind: AssetKind, #[case] reference: &str, #[case] expected: Option<&str>) {
        let root = TempDir::new().unwrap();
        let cache = AssetCache::new(kind, &site(root.path(), "https://shop.example/"));
        let located = cache.locate(reference).map(|asset| asset.output);
        assert_eq!(located, expected.map(|relative| root.path().join(relative)));
    }

    #[test]
    fn test_locate_respects_base_path() {
        let root = TempDir::new().unwrap();
        let cache = AssetCache::new(AssetKind::Css, &site(root.path(), "https://shop.example/store"));
        let asset = cache.locate("/store/skin/a.css").unwrap();
        assert_eq!(asset.source, root.path().join("skin/a.css"));
        assert_eq!(asset.public_url.as_str(), "https://shop.example/media/cssmin/skin/a.min.css");
        assert!(cache.locate("/other/skin/a.css").is_none());
    }

    #[test]
    fn test_resolve_builds_once_and_reuses() {
        let root = TempDir::new().unwrap();
        write(root.path(), "skin/css/styles.css", "body {\n    margin: 0;\n}\n");
        let minifier = Arc::new(MockMinifier::new());
        let cache = AssetCache::with_minifier(
            AssetKind::Css,
            &site(root.path(), "https://shop.example/"),
            Arc::clone(&minifier),
        );

        let first = cache.resolve("/skin/css/styles.css").unwrap().unwrap();
        assert!(first.starts_with("https://shop.example/media/cssmin/skin/css/styles.min.css?v="));
        let output = root.path().join("media/cssmin/skin/css/styles.min.css");
        assert_eq!(fs::read_to_string(&output).unwrap(), "body { margin: 0; }");

        let second = cache.resolve("/skin/css/styles.css").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(minifier.calls(), 1);
    }

    #[test]
    fn test_stale_copy_is_rebuilt() {
        let root = TempDir::new().unwrap();
        let source = write(root.path(), "js/app.js", "var a = 1;");
        let minifier = Arc::new(MockMinifier::new());
        let cache =
            AssetCache::with_minifier(AssetKind::Js, &site(root.path(), "https://shop.example/"), Arc::clone(&minifier));
        cache.resolve("/js/app.js").unwrap().unwrap();

        // Pretend the minified copy was written an hour before the source last changed.
        let output = root.path().join("media/jsmin/js/app.min.js");
        let source_modified = fs::metadata(&source).unwrap().modified().unwrap();
        fs::write(&output, "old").unwrap();
        fs::File::options()
            .write(true)
            .open(&output)
            .unwrap()
            .set_modified(source_modified - Duration::from_secs(3600))
            .unwrap();

        let url = cache.resolve("/js/app.js").unwrap().unwrap();
        assert_eq!(minifier.calls(), 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "var a = 1;");
        let rebuilt = fs::metadata(&output).unwrap().modified().unwrap();
        assert!(rebuilt >= source_modified);
        assert_eq!(version_of(&url), OffsetDateTime::from(rebuilt).unix_timestamp());
    }

    #[test]
    fn test_fresh_copy_is_reused_even_if_content_differs() {
        let root = TempDir::new().unwrap();
        let source = write(root.path(), "js/app.js", "var a = 1;");
        let output = write(root.path(), "media/jsmin/js/app.min.js", "prebuilt");
        fs::File::options()
            .write(true)
            .open(&output)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        assert!(fs::metadata(&output).unwrap().modified().unwrap() > fs::metadata(&source).unwrap().modified().unwrap());

        let minifier = Arc::new(MockMinifier::new());
        let cache =
            AssetCache::with_minifier(AssetKind::Js, &site(root.path(), "https://shop.example/"), Arc::clone(&minifier));
        cache.resolve("/js/app.js").unwrap().unwrap();
        assert_eq!(minifier.calls(), 0);
        assert_eq!(fs::read_to_string(&output).unwrap(), "prebuilt");
    }

    #[cfg(unix)]
    #[test]
    fn test_minified_copy_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        write(root.path(), "js/app.js", "var a = 1;");
        let cache = AssetCache::with_minifier(
            AssetKind::Js,
            &site(root.path(), "https://shop.example/"),
            MockMinifier::new(),
        );
        cache.resolve("/js/app.js").unwrap().unwrap();
        let mode = fs::metadata(root.path().join("media/jsmin/js/app.min.js")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, OUTPUT_MODE);
    }

    #[test]
    fn test_missing_source() {
        let root = TempDir::new().unwrap();
        let cache = AssetCache::with_minifier(
            AssetKind::Css,
            &site(root.path(), "https://shop.example/"),
            MockMinifier::new(),
        );
        let err = cache.resolve("/skin/missing.css").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert_eq!(cache.rewrite("/skin/missing.css"), "/skin/missing.css");
    }

    #[test]
    fn test_minify_failure_falls_back() {
        let root = TempDir::new().unwrap();
        write(root.path(), "skin/a.css", "a{}");
        let cache = AssetCache::with_minifier(
            AssetKind::Css,
            &site(root.path(), "https://shop.example/"),
            MockMinifier::failing(),
        );
        let err = cache.resolve("skin/a.css").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Minify(_)));
        assert_eq!(cache.rewrite("skin/a.css"), "skin/a.css");
        assert!(!root.path().join("media/cssmin/skin/a.min.css").exists());
    }

    #[test]
    fn test_foreign_reference_is_untouched() {
        let root = TempDir::new().unwrap();
        let cache = AssetCache::new(AssetKind::Js, &site(root.path(), "https://shop.example/"));
        assert_eq!(cache.resolve("https://www.google-analytics.com/analytics.js").unwrap(), None);
        assert_eq!(
            cache.rewrite("https://www.google-analytics.com/analytics.js"),
            "https://www.google-analytics.com/analytics.js"
        );
    }

    #[test]
    fn test_stylesheet_references_are_rebased() {
        let root = TempDir::new().unwrap();
        write(root.path(), "skin/css/styles.css", "a { background: url(../img/bg.png); }");
        let cache = AssetCache::with_minifier(
            AssetKind::Css,
            &site(root.path(), "https://shop.example/"),
            MockMinifier::new(),
        );
        cache.resolve("/skin/css/styles.css").unwrap().unwrap();
        let minified = fs::read_to_string(root.path().join("media/cssmin/skin/css/styles.min.css")).unwrap();
        assert_eq!(minified, "a { background: url(/skin/img/bg.png); }");
    }

    #[test]
    fn test_scripts_are_normalized() {
        let root = TempDir::new().unwrap();
        write(root.path(), "js/app.js", "$(document).ready(function(){ boot(); });");
        let cache = AssetCache::with_minifier(
            AssetKind::Js,
            &site(root.path(), "https://shop.example/"),
            MockMinifier::new(),
        );
        cache.resolve("/js/app.js").unwrap().unwrap();
        let minified = fs::read_to_string(root.path().join("media/jsmin/js/app.min.js")).unwrap();
        assert_eq!(minified, r#"window.addEventListener("load2", function(){ boot(); });"#);
    }

    #[test]
    fn test_real_css_minifier() {
        let root = TempDir::new().unwrap();
        write(root.path(), "skin/a.css", "a {\n  color : red ;\n}\n");
        let cache = AssetCache::new(AssetKind::Css, &site(root.path(), "https://shop.example/"));
        cache.resolve("/skin/a.css").unwrap().unwrap();
        assert_eq!(fs::read_to_string(root.path().join("media/cssmin/skin/a.min.css")).unwrap(), "a{color:red}");
    }
}
