use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mockup_compiler::app::{self, App};
use mockup_compiler::config::{Config, Overrides};
use mockup_compiler::Result;

/// Compile Excel mockups into text fixtures, bundle them and keep them
/// fresh in watch mode.
#[derive(Debug, Parser)]
#[command(name = "mockup-compiler", version)]
struct Cli {
    /// Path to the JSON config file (default: .mock-config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory with source workbooks
    #[arg(short, long)]
    source: Option<PathBuf>,
    /// Directory for generated artifacts
    #[arg(short, long)]
    destination: Option<PathBuf>,
    /// Remove the destination directory before processing
    #[arg(long)]
    clean_dest: bool,
    /// Where to write the bundle
    #[arg(long)]
    bundle_path: Option<PathBuf>,
    /// Skip bundling even when a bundle path is configured
    #[arg(long)]
    no_bundle: bool,
    /// Additional directory of assets to copy as-is
    #[arg(short, long)]
    include: Option<PathBuf>,
    /// Line ends for generated files: lf or crlf
    #[arg(long)]
    eol: Option<String>,
    /// Compute hashes and write the .meta/src_files manifest
    #[arg(long)]
    with_meta: bool,
    /// Stay resident and rebuild on source changes
    #[arg(short, long)]
    watch: bool,
    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
    /// Bundle container: zip, text or text+zip
    #[arg(long)]
    bundle_format: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Err(err) = run(cli).await {
        app::report(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        source_dir: cli.source,
        dest_dir: cli.destination,
        include_dir: cli.include,
        bundle_path: cli.bundle_path,
        no_bundle: cli.no_bundle,
        eol: cli.eol.as_deref().map(str::parse).transpose()?,
        bundle_format: cli.bundle_format.as_deref().map(str::parse).transpose()?,
        quiet: cli.quiet,
        with_meta: cli.with_meta,
        clean_dest: cli.clean_dest,
        watch: cli.watch,
    };

    let config = Config::load(cli.config.as_deref(), overrides)?;
    App::new(config)?.run().await
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
