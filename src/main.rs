//! E-PROC Video Compressor
//!
//! Command-line tool that checks hearing recordings against the E-PROC
//! filing limits (50 MB preferred, 200 MB maximum, MP4 only) and re-encodes
//! them to a compact 720p H.264/AAC MP4.
//!
//! # Usage
//!
//! ```bash
//! eproc check --input audiencia.mov
//! eproc compress --input audiencia.mov --output-dir saida
//! eproc engine
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use eproc_compressor::app::DefaultAppContainer;
use eproc_compressor::cli::{commands, Cli, Commands};
use eproc_compressor::config_initialization::initialize_configuration;
use eproc_compressor::utils::init_logging;

/// Main entry point for the E-PROC compressor
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Configuration decides the log level, so it is read first
    let config = initialize_configuration(&cli)?;
    init_logging(config.log_level()?, cli.json_logs)?;

    info!("Starting E-PROC compressor");
    debug!("Effective configuration: {:?}", config);

    // Execute the requested command
    match cli.command {
        Commands::Check(args) => {
            info!("Executing check command");
            commands::check(args).await?;
        }
        Commands::Compress(args) => {
            info!("Executing compress command");
            let container = DefaultAppContainer::new(config);
            commands::compress(args, &container).await?;
        }
        Commands::Engine => {
            info!("Executing engine command");
            let container = DefaultAppContainer::new(config);
            commands::engine(&container).await?;
        }
    }

    info!("E-PROC compressor completed successfully");
    Ok(())
}
