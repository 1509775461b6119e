mod error;

use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use pagespeed_config::Config;
use pagespeed_rewrite::{CssProcessor, JsProcessor, Request, Response};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const STDIO: &str = "-";

/// Defer render-blocking stylesheets and scripts in a rendered HTML page.
#[derive(Debug, Parser)]
#[command(name = "pagespeed", version, about)]
struct Cli {
    /// Page to rewrite; reads standard input when absent or `-`.
    input: Option<PathBuf>,
    /// Where to write the rewritten page (default: standard output).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Route identifier, matched against `js.exclude_actions`.
    #[arg(long, default_value = "cms_index_index")]
    action: String,
    /// Treat the page as the response to an XHR/API request.
    #[arg(long)]
    xhr: bool,
    #[arg(long)]
    skip_css: bool,
    #[arg(long)]
    skip_js: bool,
    /// Print the response headers that would be sent to standard error.
    #[arg(long)]
    headers: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).map_err(|err| err.raise(ErrorKind::Config))?;
    let request = Request::new(cli.action.as_str()).xhr(cli.xhr);
    let mut response = Response::new(read_input(cli.input.as_deref())?);

    if !cli.skip_css {
        let processor = CssProcessor::new(&config).map_err(|err| err.raise(ErrorKind::Setup))?;
        let outcome = processor.process(&request, &mut response);
        if !outcome.is_rewritten() {
            tracing::info!(%outcome, "Stylesheets left in place");
        }
    }
    if !cli.skip_js {
        let processor = JsProcessor::new(&config).map_err(|err| err.raise(ErrorKind::Setup))?;
        let outcome = processor.process(&request, &mut response);
        if !outcome.is_rewritten() {
            tracing::info!(%outcome, "Scripts left in place");
        }
    }

    if cli.headers {
        for header in &response.headers {
            eprintln!("{header}");
        }
    }
    write_output(cli.output.as_deref(), &response.body)
}

fn is_stdio(path: Option<&Path>) -> bool {
    path.is_none_or(|path| path.as_os_str() == STDIO)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let mut html = String::new();
    match path {
        Some(path) if !is_stdio(Some(path)) => {
            html = std::fs::read_to_string(path).or_raise(|| ErrorKind::Input(path.to_path_buf()))?;
        },
        _ => {
            std::io::stdin().read_to_string(&mut html).or_raise(|| ErrorKind::Input(PathBuf::from(STDIO)))?;
        },
    }
    Ok(html)
}

fn write_output(path: Option<&Path>, html: &str) -> Result<()> {
    match path {
        Some(path) if !is_stdio(Some(path)) => {
            std::fs::write(path, html).or_raise(|| ErrorKind::Output(path.to_path_buf()))
        },
        _ => std::io::stdout()
            .lock()
            .write_all(html.as_bytes())
            .or_raise(|| ErrorKind::Output(PathBuf::from(STDIO))),
    }
}
