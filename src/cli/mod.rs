//! Command-line interface implementation
//!
//! `assetpipe [TASK]...` runs the named tasks (default: `default`);
//! `assetpipe watch` builds once and then rebuilds on changes.

mod build;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub use build::{load_project, run_tasks};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "ASSETPIPE_LOG";

/// Assetpipe - front-end asset pipeline
#[derive(Parser, Debug)]
#[command(name = "assetpipe")]
#[command(about = "Assetpipe - compile styles, bundle scripts, copy assets and inject references")]
#[command(version)]
pub struct Cli {
    /// Tasks to run: leaf tasks (styles, js:app, ...), aggregates
    /// (build:styles, build:js, build:html, default, build), filters such
    /// as `*:vendors`, or `watch`
    #[arg(default_value = "default")]
    pub tasks: Vec<String>,

    /// Path to assetpipe.toml (default: search upward from the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the output directory
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Override the source directory
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// Override the watch debounce delay in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u32).range(1..))]
    pub debounce: Option<u32>,

    /// Worker threads per dependency level (default: available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the task graph and exit
    #[arg(long)]
    pub list: bool,

    /// Print the resolved run order without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Show per-task progress and debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the global tracing subscriber.
///
/// `ASSETPIPE_LOG` takes precedence; otherwise `warn`, or `debug` with
/// `--verbose`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "assetpipe=debug,warn" } else { "warn" })
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .compact()
        .try_init();
}

/// CLI entry point.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run_tasks(&cli)
}
