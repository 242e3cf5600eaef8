//! CLI module for the E-PROC compressor
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{CheckArgs, CompressArgs};

/// E-PROC Video Compressor
///
/// Checks videos against the E-PROC upload limits and re-encodes them to a
/// small 720p H.264/AAC MP4.
#[derive(Parser, Debug)]
#[command(name = "eproc")]
#[command(about = "E-PROC Video Compressor - fit hearing recordings to the filing limits")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit diagnostic logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (default: ./eproc.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Engine backend (auto, native, libav)
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Path of the ffmpeg executable for the native backend
    #[arg(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a video against the E-PROC limits
    Check(CheckArgs),
    /// Compress a video for E-PROC upload
    Compress(CompressArgs),
    /// Show which engine backend is selected and whether it loads
    Engine,
}
