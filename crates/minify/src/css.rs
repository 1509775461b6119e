use crate::Minifier;
use crate::error::{ErrorKind, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl Minifier for CssMinifier {
    #[instrument(level = "trace", skip_all, fields(size = source.len()))]
    fn minify(&self, source: &str) -> Result<String> {
        let mut stylesheet = StyleSheet::parse(source, ParserOptions::default())
            .map_err(|err| ErrorKind::Syntax(err.to_string()))?;
        stylesheet.minify(MinifyOptions::default()).map_err(|err| ErrorKind::Syntax(err.to_string()))?;
        let output = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|err| ErrorKind::Print(err.to_string()))?;
        Ok(output.code)
    }
}
