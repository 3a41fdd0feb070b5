//! `cura`: curación de pistas y catálogo de la biblioteca de vídeo.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cura_core::{ScriptedArbiter, TrackId};
use cura_local_library::{ConfigManager, FileOutcome, LibraryConfig, LibraryManager, RunSummary};
use cura_paths::CuraPaths;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod prompt;

use prompt::{CliArbiter, parse_keep};

#[derive(Parser, Debug)]
#[command(name = "cura")]
#[command(about = "Curates audio/subtitle tracks and catalogs a media library")]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/cura.toml)
    #[arg(short, long, global = true, env = "CURA_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Curate, catalog and publish every file in the intake folders
    Run {
        /// Pre-answer a duplicate group, e.g. `audio:portuguese=2`
        #[arg(long = "keep", value_name = "GROUP=ID", value_parser = parse_keep)]
        keep: Vec<(String, TrackId)>,

        /// Never prompt; unanswered duplicate groups fail the file
        #[arg(long)]
        non_interactive: bool,
    },
    /// Move cataloged files from the published stage to distribution
    Promote,
    /// Print catalog counts
    Status,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn report(summary: &RunSummary) -> ExitCode {
    for outcome in &summary.outcomes {
        match outcome {
            FileOutcome::Published { to, .. } => println!("published  {}", to.display()),
            FileOutcome::Promoted { to, .. } => println!("promoted   {}", to.display()),
            FileOutcome::Failed(failure) => eprintln!("failed     {failure}"),
        }
    }
    for (path, err) in &summary.intake_errors {
        eprintln!("error      {}: {err}", path.display());
    }
    println!("{summary}");

    if summary.is_clean() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = CuraPaths::new().context("Failed to prepare cura directories")?;
    let (config_path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (paths.config_file.clone(), false),
    };
    debug!(?paths, config = %config_path.display(), "rutas");

    if let Command::Init { force } = cli.command {
        LibraryConfig::write_default(&config_path, force)?;
        println!("{}", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = LibraryConfig::load(&config_path, required)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    match cli.command {
        Command::Run { keep, non_interactive } => {
            let _lock = paths.lock().context("Another run is in progress")?;
            if config.intakes.is_empty() {
                error!(config = %config_path.display(), "no hay carpetas de entrada configuradas");
                return Ok(ExitCode::FAILURE);
            }

            let mut scripted = ScriptedArbiter::new();
            for (group, id) in keep {
                scripted.insert(group, id);
            }

            info!(intakes = config.intakes.len(), "iniciando pasada");
            let manager = LibraryManager::new(ConfigManager::from(config))?;
            let summary = manager.run(Arc::new(CliArbiter::new(scripted, !non_interactive))).await;
            Ok(report(&summary))
        }
        Command::Promote => {
            let _lock = paths.lock().context("Another run is in progress")?;
            let manager = LibraryManager::new(ConfigManager::from(config))?;
            let summary = manager.promote().await;
            Ok(report(&summary))
        }
        Command::Status => {
            let manager = LibraryManager::new(ConfigManager::from(config))?;
            println!("{}", manager.status()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { .. } => Ok(ExitCode::SUCCESS),
    }
}
