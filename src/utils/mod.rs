//! Utility modules

pub mod logging;
pub mod path;

pub use logging::{init_logging, LogLevel};
pub use path::{mime_from_path, output_file_name};
