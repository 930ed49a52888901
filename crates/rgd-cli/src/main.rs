//! rgd CLI - offline validation of ResourceGraphDefinition documents

use clap::{Parser, Subcommand};
use miette::Result;
use rgd_validate::ValidationMode;
use std::path::PathBuf;

mod commands;
mod exit_codes;

#[derive(Parser)]
#[command(name = "rgd")]
#[command(version)]
#[command(about = "Validate kro ResourceGraphDefinitions against CRD schemas", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate RGD files or directories
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Configuration file (defaults to the kro-lsp config location)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Additional directory of CRD manifests
        #[arg(long = "crd-dir")]
        crd_dirs: Vec<PathBuf>,

        /// Validation mode: strict, permissive or off
        #[arg(long)]
        mode: Option<ValidationMode>,

        /// Shorthand for --mode strict
        #[arg(long, conflicts_with = "mode")]
        strict: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the CRD schemas the configured sources provide
    Crds {
        /// Configuration file (defaults to the kro-lsp config location)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Additional directory of CRD manifests
        #[arg(long = "crd-dir")]
        crd_dirs: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Check {
            paths,
            config,
            crd_dirs,
            mode,
            strict,
            json,
        } => {
            let mode = if strict { Some(ValidationMode::Strict) } else { mode };
            commands::check::run(&paths, config.as_deref(), &crd_dirs, mode, json).await
        }

        Commands::Crds {
            config,
            crd_dirs,
            json,
        } => commands::crds::run(config.as_deref(), &crd_dirs, json).await,
    }
}
