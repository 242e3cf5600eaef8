// Adapters - External system implementations

pub mod console_feed;
pub mod env_probe;
pub mod exec_ffmpeg;
#[cfg(feature = "libav")]
pub mod exec_libav;
pub mod scratch;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use console_feed::{ConsoleFeed, FeedStyle};
pub use env_probe::{EnvironmentProbe, UnavailableEngine};
pub use exec_ffmpeg::NativeFfmpegEngine;
#[cfg(feature = "libav")]
pub use exec_libav::LibavEngine;
pub use scratch::ScratchSpace;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingLogAdapter;
