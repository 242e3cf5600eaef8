//! Encoding parameters and progress interpretation shared by the engine backends

pub mod preset;
pub mod progress;

pub use preset::EncodePreset;
pub use progress::{parse_duration_line, percent_from_ratio, ratio_of, ProgressLine};

/// Scratch file name the source bytes are written to
pub const INPUT_FILE_NAME: &str = "input.mp4";

/// Scratch file name the engine writes to
pub const OUTPUT_FILE_NAME: &str = "output.mp4";
