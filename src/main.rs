//! R-Droid resgen
//!
//! Command-line entry point: loads the configuration, sets up logging and
//! runs the requested build task.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use r_droid_resgen::commands::MergeSymbolsCommand;
use r_droid_resgen::core::{logging, AppConfig};
use r_droid_resgen::build::BuildType;
use r_droid_resgen::{APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "r-droid-resgen", version)]
#[command(about = "Incremental R.java generation for Android library dependencies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge library symbol tables into per-package R.java files
    MergeSymbols(MergeSymbolsArgs),
}

#[derive(Args)]
struct MergeSymbolsArgs {
    /// Module build directory
    #[arg(long)]
    build_dir: PathBuf,

    /// The application's own package
    #[arg(long)]
    package: String,

    /// Library directory holding AndroidManifest.xml and R.txt (repeatable)
    #[arg(long = "library")]
    libraries: Vec<PathBuf>,

    /// Release build
    #[arg(long, conflicts_with = "bundle")]
    release: bool,

    /// Release bundle (AAB) build
    #[arg(long)]
    bundle: bool,

    /// Ignore the cache and regenerate every package
    #[arg(long)]
    full: bool,
}

impl MergeSymbolsArgs {
    fn build_type(&self) -> BuildType {
        match (self.release, self.bundle) {
            (_, true) => BuildType::Bundle,
            (true, false) => BuildType::Release,
            (false, false) => BuildType::Debug,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).await?;
    logging::init(&config.logging).context("failed to initialize logging")?;
    info!("{} v{} starting...", APP_NAME, VERSION);

    match cli.command {
        Commands::MergeSymbols(args) => {
            let command = MergeSymbolsCommand {
                build_type: args.build_type(),
                build_dir: args.build_dir,
                package: args.package,
                libraries: args.libraries,
                full: args.full,
            };
            let records = command.execute(&config).await?;
            for record in records {
                info!("{}: {:?} in {:?}", record.name, record.state, record.duration);
            }
        }
    }
    Ok(())
}

/// Load the configuration from `path`, or from the user config directory
async fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("cannot read config file {:?}", path))?;
            AppConfig::from_toml(&contents)
        }
        None => AppConfig::load().await,
    };
    config.map_err(|e| anyhow!(e.user_message()))
}
