use pagespeed_assets::{AssetCache, AssetKind};
use pagespeed_config::{Config, CssConfig, JsConfig, SiteConfig};
use pagespeed_minify::MockMinifier;
use pagespeed_rewrite::{CssProcessor, JsProcessor, LAZY_SCRIPT_TYPE, Outcome, Request, Response};
use rstest::rstest;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;
use url::Url;

fn site(root: &Path) -> SiteConfig {
    SiteConfig {
        base_url: Url::parse("https://shop.example/").unwrap(),
        base_dir: root.to_path_buf(),
        media_url: Url::parse("https://shop.example/media/").unwrap(),
        media_dir: root.join("media"),
    }
}

fn config(root: &Path) -> Config {
    Config {
        site: site(root),
        css: CssConfig::default(),
        js: JsConfig::default(),
    }
}

fn render(config: &Config, html: &str) -> Response {
    let request = Request::new("cms_index_index");
    let mut response = Response::new(html);
    CssProcessor::new(config).unwrap().process(&request, &mut response);
    JsProcessor::new(config).unwrap().process(&request, &mut response);
    response
}

/// The JSON array handed to the (unminified) client loader.
fn loader_resources(body: &str) -> Vec<String> {
    let start = body.find("var resources = ").expect("loader present") + "var resources = ".len();
    let end = start + body[start..].find(";\n").unwrap();
    serde_json::from_str(&body[start..end].replace("<\\/", "</")).unwrap()
}

/// The string literal in `body` that starts with `prefix`.
fn reference_starting_with<'b>(body: &'b str, prefix: &str) -> &'b str {
    let start = body.find(prefix).expect("reference present");
    let end = start + body[start..].find(['"', '\'']).unwrap();
    &body[start..end]
}

#[test]
fn test_stylesheet_scenario() {
    let root = TempDir::new().unwrap();
    let html = "<html><head><title>x</title><link type=\"text/css\" href=\"/skin/default/style.css\" />\n<meta name=\"a\"></head><body>content</body></html>";
    let mut response = Response::new(html);
    let outcome = CssProcessor::new(&config(root.path())).unwrap().process(&Request::default(), &mut response);
    assert_eq!(outcome, Outcome::Rewritten);
    assert_eq!(
        response.body,
        "<html><head><title>x</title>\n<meta name=\"a\"><link type=\"text/css\" href=\"/skin/default/style.css\" /></head><body>content</body></html>"
    );
}

#[test]
fn test_script_scenario() {
    let root = TempDir::new().unwrap();
    let html = "<html><head><script type=\"text/javascript\" src=\"/js/app.js\"></script></head><body>content</body></html>";
    let response = render(&config(root.path()), html);
    assert!(response.body.starts_with("<html><head></head><body>content<script defer>"));
    assert!(response.body.ends_with("</script></body></html>"));
    assert_eq!(loader_resources(&response.body), ["/js/app.js"]);
}

#[test]
fn test_external_order_is_preserved_and_deduplicated() {
    let root = TempDir::new().unwrap();
    let html = concat!(
        "<head><script src=\"/js/1.js\"></script><script src=\"/js/2.js\"></script></head>\n",
        "<body><script src=\"https://cdn.example/3.js\"></script>\n",
        "<script src=\"/js/1.js\"></script>\n",
        "<script src=\"/js/4.js\"></script></body>",
    );
    let response = render(&config(root.path()), html);
    assert_eq!(
        loader_resources(&response.body),
        ["/js/1.js", "/js/2.js", "https://cdn.example/3.js", "/js/4.js"]
    );
}

#[rstest]
#[case("<script defer src=\"/js/a.js\"></script>")]
#[case("<script async src=\"/js/a.js\"></script>")]
#[case("<script src=\"/js/a.js\" defer=\"defer\"></script>")]
#[case("<script>window.addEventListener('load', async () => {});</script>")]
fn test_marked_scripts_never_move(#[case] script: &str) {
    let root = TempDir::new().unwrap();
    let html = format!("<head></head><body><p>x</p>{script}<script src=\"/js/b.js\"></script></body>");
    let response = render(&config(root.path()), &html);
    assert!(response.body.starts_with(&format!("<head></head><body><p>x</p>{script}<script defer>")));
    assert_eq!(loader_resources(&response.body), ["/js/b.js"]);
}

#[rstest]
#[case("<html><head></head><p>no body end <script src=\"/a.js\"></script>")]
#[case("<html><head></head><body><p>nothing to see</p></body></html>")]
#[case("<p>fragment</p>")]
fn test_untouched_documents(#[case] html: &str) {
    let root = TempDir::new().unwrap();
    let response = render(&config(root.path()), html);
    assert_eq!(response.body, html);
    assert!(response.headers.is_empty());
}

#[test]
fn test_inline_scripts_keep_their_relative_order() {
    let root = TempDir::new().unwrap();
    let html = "<head></head><body><script>window.x=1</script><div></div><script>console.log(window.x)</script></body>";
    let response = render(&config(root.path()), html);
    let lazy = format!("<script type=\"{LAZY_SCRIPT_TYPE}\">");
    let first = response.body.find(&format!("{lazy}window.x=1</script>")).unwrap();
    let second = response.body.find(&format!("{lazy}console.log(window.x)</script>")).unwrap();
    let loader = response.body.find("<script defer>").unwrap();
    assert!(first < second && second < loader);
}

#[test]
fn test_processing_twice_changes_nothing() {
    let root = TempDir::new().unwrap();
    let html = concat!(
        "<html><head>\n",
        "  <link rel=\"stylesheet\" href=\"/skin/a.css\">\n",
        "  <script src=\"/js/a.js\"></script>\n",
        "  <style>p{margin:0}</style>\n",
        "</head>\n<body>\n",
        "  <img fetchpriority=\"high\" src=\"/hero.jpg\">\n",
        "  <script>document.addEventListener('DOMContentLoaded', init);</script>\n",
        "</body></html>",
    );
    let config = config(root.path());
    let once = render(&config, html);
    let twice = render(&config, &once.body);
    assert_ne!(once.body, html);
    assert_eq!(twice.body, once.body);
    assert!(once.body.contains("window.addEventListener(\"DomContentLoad2\", init);"));
}

#[test]
fn test_minified_assets_are_rebuilt_when_stale() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("js/app.js");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, "var   app =   1;").unwrap();

    let mut config = config(root.path());
    config.js.minify = true;
    let minifier = Arc::new(MockMinifier::new());
    let processor = JsProcessor::new(&config)
        .unwrap()
        .with_asset_cache(AssetCache::with_minifier(AssetKind::Js, &config.site, Arc::clone(&minifier)));
    let html = "<head></head><body><script src=\"/js/app.js\"></script></body>";
    let prefix = "https://shop.example/media/jsmin/js/app.min.js?v=";

    let mut response = Response::new(html);
    processor.process(&Request::default(), &mut response);
    reference_starting_with(&response.body, prefix);
    let output = root.path().join("media/jsmin/js/app.min.js");
    assert_eq!(fs::read_to_string(&output).unwrap(), "var app = 1;");

    // The source is edited, and the copy is now two minutes older than it.
    fs::write(&source, "var   app =   2;").unwrap();
    let edited = fs::metadata(&source).unwrap().modified().unwrap();
    fs::File::options()
        .write(true)
        .open(&output)
        .unwrap()
        .set_modified(edited - Duration::from_secs(120))
        .unwrap();

    let mut response = Response::new(html);
    processor.process(&Request::default(), &mut response);
    assert_eq!(minifier.calls(), 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), "var app = 2;");
    let rebuilt = fs::metadata(&output).unwrap().modified().unwrap();
    assert!(rebuilt >= edited);
    let reference = reference_starting_with(&response.body, prefix);
    let version: u64 = reference[prefix.len()..].parse().unwrap();
    assert_eq!(version, rebuilt.duration_since(UNIX_EPOCH).unwrap().as_secs());
}

#[test]
fn test_minified_stylesheet_links() {
    let root = TempDir::new().unwrap();
    let source = root.path().join("skin/css/styles.css");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, "body {\n  background: url(../img/bg.png);\n}\n").unwrap();

    let mut config = config(root.path());
    config.css.minify = true;
    let html = "<head><link rel=\"stylesheet\" href=\"https://shop.example/skin/css/styles.css\" /><link rel=\"stylesheet\" href=\"https://fonts.example/css?family=Inter\" /></head>";
    let mut response = Response::new(html);
    CssProcessor::new(&config).unwrap().process(&Request::default(), &mut response);

    assert!(
        response
            .body
            .contains("<link rel=\"stylesheet\" href=\"https://shop.example/media/cssmin/skin/css/styles.min.css?v=")
    );
    assert!(response.body.contains("href=\"https://fonts.example/css?family=Inter\""));
    let minified = fs::read_to_string(root.path().join("media/cssmin/skin/css/styles.min.css")).unwrap();
    assert!(minified.contains("/skin/img/bg.png"));
}

#[test]
fn test_missing_asset_keeps_original_reference() {
    let root = TempDir::new().unwrap();
    let mut config = config(root.path());
    config.js.minify = true;
    let html = "<head></head><body><script src=\"/js/missing.js\"></script></body>";
    let response = render(&config, html);
    assert_eq!(reference_starting_with(&response.body, "/js/"), "/js/missing.js");
    assert!(!root.path().join("media/jsmin").exists());
}

#[test]
fn test_xhr_requests_are_never_touched() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    let html = "<head><style>a{}</style></head><body><img fetchpriority=\"high\" src=\"/a.jpg\"><script src=\"/a.js\"></script></body>";
    let request = Request::new("catalog_product_view").xhr(true);
    let mut response = Response::new(html);
    assert_eq!(CssProcessor::new(&config).unwrap().process(&request, &mut response), Outcome::Xhr);
    assert_eq!(JsProcessor::new(&config).unwrap().process(&request, &mut response), Outcome::Xhr);
    assert_eq!(response, Response::new(html));
}
