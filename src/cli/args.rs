//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// MIME type to assume instead of deriving it from the extension
    #[arg(long)]
    pub mime: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the compress command
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for the EPROC_ result (default: configuration, then ".")
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// MIME type to assume instead of deriving it from the extension
    #[arg(long)]
    pub mime: Option<String>,

    /// Do not print the session feed
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the session feed as JSON lines on stdout
    #[arg(long, conflicts_with = "quiet")]
    pub json: bool,
}
