//! Stancecraft - stance and moveset condition compiler
//!
//! Command line entry point. It:
//! - Sets up logging (daily rotating file, optional console)
//! - Loads `Stancecraft Settings.yaml`, `Stancecraft Rules.yaml` and
//!   `Stancecraft Library.yaml` from the data directory
//! - Compiles one condition document per source animation
//! - Writes the documents as JSON, keeping foreign conditions of existing
//!   documents when "Preserve Conditions" is set
//!
//! # Usage
//!
//! ```text
//! stancecraft --data "Stancecraft Data" [--out <dir>] [--debug] [--console]
//! ```

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use stancecraft::logging::{LOG_PREFIX, setup_logging_with_console};
use stancecraft::{APP_NAME, ConfigManager, MovesetManager, VERSION};

/// Compile stance configurations into animation condition documents
#[derive(Parser, Debug)]
#[command(name = "stancecraft", version)]
struct Args {
    /// Directory holding the settings, rules and library YAML files
    #[arg(long, default_value = "Stancecraft Data")]
    data: Utf8PathBuf,

    /// Output directory for documents (overrides "Output Dir")
    #[arg(long)]
    out: Option<Utf8PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Also log to the console
    #[arg(long)]
    console: bool,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.data)?;
    let user_config = config_manager.load_settings()?;
    let settings = user_config.settings;

    let _guard = setup_logging_with_console(
        &args.log_dir,
        LOG_PREFIX,
        args.debug || settings.debug_mode,
        args.console,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let model = config_manager.load_model()?;
    let library = config_manager.load_library()?;
    tracing::info!(
        "Loaded {} declared rules and {} source animations",
        model.rules.len(),
        library.len()
    );

    let manager = MovesetManager::new(model, library);
    manager.set_cycle_mode(settings.cycle_mode);

    let documents = manager.compile_documents();

    let out_dir = args
        .out
        .unwrap_or_else(|| config_manager.output_dir(&settings));
    let written = config_manager.write_documents(&documents, &out_dir, settings.preserve_conditions)?;

    tracing::info!(
        "Wrote {} documents ({} disabled) to {}",
        written,
        documents.iter().filter(|d| d.is_disabled()).count(),
        out_dir
    );

    manager.metrics().log_summary();
    Ok(())
}
