use crate::Minifier;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use minify_js::{Session, TopLevelMode, minify};
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsMinifier;

impl Minifier for JsMinifier {
    #[instrument(level = "trace", skip_all, fields(size = source.len()))]
    fn minify(&self, source: &str) -> Result<String> {
        let session = Session::new();
        let mut output = Vec::with_capacity(source.len());
        // Global mode: classic scripts share one global scope, so top-level
        // declarations must keep their names.
        minify(&session, TopLevelMode::Global, source.as_bytes(), &mut output)
            .map_err(|err| ErrorKind::Syntax(format!("{err:?}")))?;
        String::from_utf8(output).or_raise(|| ErrorKind::Encoding)
    }
}
