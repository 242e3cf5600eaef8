//! E-PROC Video Compressor Library
//!
//! Compliance rules, the compression session controller and the engine
//! backends behind the `eproc` command-line tool.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::CompressionController;
pub use domain::errors::DomainError;
pub use domain::model::{ComplianceReport, LogEntry, Session, SessionState, Severity, SourceFile};
pub use domain::rules::ComplianceChecker;
pub use error::{CompressorError, CompressorResult};
pub use ports::{EngineEvent, SessionObserver, TranscodeEngine};
