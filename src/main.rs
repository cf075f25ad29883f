//! # Mp4 Encoder - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Risoluzione della directory da processare (`--path` o argomento posizionale)
//! - Merge con il file di configurazione opzionale
//! - Avvio della pipeline e traduzione del risultato in exit code
//!
//! ## Exit code:
//! - `0`: run completata (anche con conversioni fallite)
//! - `1`: cancellazioni fallite o errore di runtime
//! - `2`: nessuna directory specificata
//!
//! ## Esempio di utilizzo:
//! ```bash
//! mp4-encoder /path/to/videos --recursive --commit --delete -e avi,mpg,wmv
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mp4_encoder::progress::ConsoleProgress;
use mp4_encoder::{Config, ConvertError, Converter, HandBrakeEngine, Pipeline, RunStats};

#[derive(Parser)]
#[command(name = "mp4-encoder")]
#[command(about = "A utility to transcode video files into mp4.")]
struct Args {
    /// The directory to process
    #[arg(value_name = "DIRECTORY")]
    directory: Option<PathBuf>,

    /// The directory to process (takes precedence over the positional argument)
    #[arg(short, long, value_name = "DIRECTORY")]
    path: Option<PathBuf>,

    /// Commit changes (without it nothing is converted or deleted)
    #[arg(short, long)]
    commit: bool,

    /// Delete original file after a successful conversion
    #[arg(short, long)]
    delete: bool,

    /// Overwrite existing files
    #[arg(short, long)]
    force: bool,

    /// Recursively process subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Comma delimited source extensions [default: avi,mpg]
    #[arg(short, long)]
    extensions: Option<String>,

    /// Engine preset [default: Normal]
    #[arg(long)]
    preset: Option<String>,

    /// Extension of the converted files [default: mp4]
    #[arg(long)]
    target_extension: Option<String>,

    /// Transcoding engine executable [default: HandBrakeCLI]
    #[arg(long)]
    engine: Option<String>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the effective configuration to the configuration file
    #[arg(long)]
    save_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Exit code for a missing directory argument
const EXIT_USAGE: u8 = 2;
/// Exit code for a run that left undeletable sources behind
const EXIT_DELETION_FAILED: u8 = 1;

/// Merge command line flags on top of a file-based configuration.
///
/// The directory and the commit/force/delete flags only ever come from the
/// command line.
fn resolve_config(args: Args, mut config: Config) -> Result<Config, ConvertError> {
    config.path = Some(args.path.or(args.directory).ok_or(ConvertError::MissingPath)?);
    config.commit = args.commit;
    config.delete = args.delete;
    config.force = args.force;
    config.recursive |= args.recursive;
    config.verbose |= args.verbose;
    if let Some(extensions) = args.extensions {
        config.extensions = extensions;
    }
    if let Some(preset) = args.preset {
        config.preset = preset;
    }
    if let Some(target_extension) = args.target_extension {
        config.target_extension = target_extension;
    }
    if let Some(engine) = args.engine {
        config.engine_binary = engine;
    }
    Ok(config)
}

fn exit_status(error: &ConvertError) -> u8 {
    match error {
        ConvertError::MissingPath => EXIT_USAGE,
        _ => 1,
    }
}

fn run_status(stats: &RunStats) -> u8 {
    if stats.deletion_failures > 0 {
        EXIT_DELETION_FAILED
    } else {
        0
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_file = args.config.clone().or_else(Config::default_file);
    let save_config = args.save_config;

    let file_config = match config_file {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    // Initialize logging
    let verbose = args.verbose || file_config.verbose;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = match resolve_config(args, file_config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            println!("{}", Args::command().render_help());
            return Ok(ExitCode::from(exit_status(&e)));
        }
    };

    config.validate()?;

    if save_config {
        if let Some(ref path) = config_file {
            config.save_to_file(path).await?;
            info!("Saved configuration to {}", path.display());
        }
    }

    let engine = HandBrakeEngine::new(config.engine_binary.clone());
    if config.commit && !engine.is_available().await {
        return Err(ConvertError::MissingDependency(format!(
            "{} is required to convert files",
            engine.command()
        ))
        .into());
    }

    log_configuration(&config);

    let converter = Converter::new(
        Arc::new(engine),
        Arc::new(ConsoleProgress::new()),
        config.preset.clone(),
    );
    let stats = Pipeline::new(&config, converter).scan_and_run().await;

    info!("=== Conversion Complete ===");
    info!("{}", stats.format_summary());

    if stats.deletion_failures > 0 {
        warn!("{} source files could not be deleted", stats.deletion_failures);
    }

    Ok(ExitCode::from(run_status(&stats)))
}

fn log_configuration(config: &Config) {
    info!("Extensions: {}", config.extensions);
    info!("Preset: {} -> .{}", config.preset, config.target_extension);

    if !config.commit {
        info!("Dry run mode: No files will be converted or deleted");
    }
    if config.force {
        info!("Overwrite mode: Existing destinations will be replaced");
    }
    if config.delete {
        info!("Delete mode: Sources are removed after a successful conversion");
    }
}
