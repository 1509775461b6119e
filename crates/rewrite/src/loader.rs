//! The Client Loader Emitter.
//!
//! The loader is a small script injected before `</body>`. On the first
//! user interaction (or `wakeup`) it loads every deferred external script in
//! parallel, then replays the lazy inline scripts one at a time in document
//! order, and finally dispatches the renamed page-lifecycle events that the
//! replayed code was rewritten to listen for.

use crate::bucket::ResourceList;
use crate::consts::LAZY_SCRIPT_TYPE;
use crate::error::{ErrorKind, Result};
use crate::reassemble::collapse_blank_lines;
use exn::{OptionExt, ResultExt};
use pagespeed_minify::{JsMinifier, Minifier};
use rust_embed::Embed;
use tracing::instrument;
use upon::{Engine, Template};

const TEMPLATE: &str = "loader.js";

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

pub struct LoaderEmitter {
    engine: Engine<'static>,
    template: Template<'static>,
    wake_on_load: bool,
    minifier: Option<Box<dyn Minifier>>,
}

impl std::fmt::Debug for LoaderEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderEmitter")
            .field("wake_on_load", &self.wake_on_load)
            .field("minify", &self.minifier.is_some())
            .finish_non_exhaustive()
    }
}

impl LoaderEmitter {
    /// Compiles the embedded loader template.
    ///
    /// With `only_on_user_interaction` off, the window `load` event also
    /// wakes the loader, so scripts run even if nobody touches the page.
    pub fn new(only_on_user_interaction: bool) -> Result<Self> {
        let source = Assets::get(TEMPLATE)
            .map(|file| file.data)
            .ok_or_raise(|| ErrorKind::AssetNotFound(TEMPLATE.to_string()))?;
        let source = String::from_utf8(source.into_owned()).or_raise(|| ErrorKind::Template)?;
        let engine = Engine::new();
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(source).or_raise(|| ErrorKind::Template)?;
        Ok(Self {
            engine,
            template,
            wake_on_load: !only_on_user_interaction,
            minifier: None,
        })
    }

    /// Minify the emitted script with the default JavaScript minifier.
    pub fn minified(self) -> Self {
        self.with_minifier(JsMinifier)
    }

    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Some(Box::new(minifier));
        self
    }

    /// Renders the loader for `resources`, wrapped in its own `<script defer>`.
    ///
    /// A minifier failure is not an error: the readable script is used instead.
    #[instrument(level = "debug", skip_all, fields(resources = resources.len()))]
    pub fn emit(&self, resources: &ResourceList) -> Result<String> {
        let script = self
            .template
            .render(
                &self.engine,
                upon::value! {
                    resources: resources.to_json()?,
                    placeholder: LAZY_SCRIPT_TYPE,
                    wake_on_load: self.wake_on_load,
                },
            )
            .to_string()
            .or_raise(|| ErrorKind::Template)?;
        // A page may be processed again; blank lines in here would be collapsed then.
        let script = collapse_blank_lines(&script).into_owned();
        let script = match &self.minifier {
            None => script,
            Some(minifier) => match minifier.minify(&script) {
                Ok(minified) => minified,
                Err(err) => {
                    tracing::warn!(error = ?err, "Could not minify client loader; emitting it as written");
                    script
                },
            },
        };
        Ok(format!("<script defer>{script}</script>"))
    }
}
