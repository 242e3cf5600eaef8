// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::errors::DomainError;

/// Bytes per megabyte as used by the filing-system limits
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Format a byte count as megabytes with two decimals
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB as f64)
}

/// Video file chosen by the user
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Display name (file name without directories)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type, empty when unknown
    pub mime_type: String,
    /// Where the bytes are read from when compression starts
    pub path: PathBuf,
}

impl SourceFile {
    /// Create a new source file description
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            path: path.into(),
        }
    }

    /// Describe a file on disk, deriving the MIME type from its extension
    /// unless one is given.
    pub async fn from_path(path: &Path, mime_override: Option<&str>) -> Result<Self, DomainError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| DomainError::FileNotFound(path.display().to_string()))?;

        if !metadata.is_file() {
            return Err(DomainError::BadArgs(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = match mime_override {
            Some(mime) => mime.to_string(),
            None => crate::utils::path::mime_from_path(path).to_string(),
        };

        Ok(Self::new(name, metadata.len(), mime_type, path))
    }

    /// Size in megabytes with two decimals
    pub fn size_mb(&self) -> String {
        format_megabytes(self.size)
    }
}

/// Lifecycle state of a compression session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,
    Analyzing,
    Ready,
    Compressing,
    Completed,
    Error,
}

impl SessionState {
    /// Terminal states of a run; only reset leaves them
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Error)
    }

    /// Status badge text shown next to the session
    pub fn badge(&self) -> &'static str {
        match self {
            SessionState::Compressing => "PROCESSANDO",
            other => other.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::Analyzing => "ANALYZING",
            SessionState::Ready => "READY",
            SessionState::Compressing => "COMPRESSING",
            SessionState::Completed => "COMPLETED",
            SessionState::Error => "ERROR",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a log feed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// One line of the session log feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
            severity,
        }
    }

    /// Wall-clock time as HH:MM:SS (24h)
    pub fn clock(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Result of the static E-PROC rule check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub is_compliant: bool,
    pub message: String,
    pub suggested_action: String,
}

/// The single live compression session.
///
/// The encoded result is only observable while the state is `Completed`;
/// leaving that state drops it.
#[derive(Debug, Clone)]
pub struct Session {
    source: Option<SourceFile>,
    state: SessionState,
    progress: u8,
    logs: Vec<LogEntry>,
    result: Option<Vec<u8>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            source: None,
            state: SessionState::Idle,
            progress: 0,
            logs: Vec::new(),
            result: None,
        }
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Encoded bytes, present only in `Completed`
    pub fn result(&self) -> Option<&[u8]> {
        match (&self.result, self.state) {
            (Some(bytes), SessionState::Completed) if !bytes.is_empty() => Some(bytes),
            _ => None,
        }
    }

    pub(crate) fn set_source(&mut self, source: SourceFile) {
        self.source = Some(source);
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        if state != SessionState::Completed {
            self.result = None;
        }
        self.state = state;
    }

    pub(crate) fn set_progress(&mut self, percent: u8) {
        self.progress = percent.min(100);
    }

    pub(crate) fn store_result(&mut self, bytes: Vec<u8>) {
        self.result = Some(bytes);
    }

    pub(crate) fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    pub(crate) fn clear_logs(&mut self) {
        self.logs.clear();
    }
}

/// Which engine implementation executes the encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineBackend {
    /// `ffmpeg` executable run as a child process
    Native,
    /// libav linked into this process
    InProcess,
}

impl EngineBackend {
    /// Label used in the session feed
    pub fn label(&self) -> &'static str {
        match self {
            EngineBackend::Native => "Desktop Nativo",
            EngineBackend::InProcess => "Biblioteca Integrada",
        }
    }
}

impl fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineBackend::Native => f.write_str("native"),
            EngineBackend::InProcess => f.write_str("libav"),
        }
    }
}

/// Backend requested by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Probe the environment
    #[default]
    Auto,
    Native,
    Libav,
}

impl BackendPreference {
    /// Parse backend preference from string
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "native" | "ffmpeg" => Ok(BackendPreference::Native),
            "libav" | "in-process" => Ok(BackendPreference::Libav),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid backend: {}. Valid backends: auto, native, libav",
                value
            ))),
        }
    }
}

#[cfg(test)]
mod tests;
