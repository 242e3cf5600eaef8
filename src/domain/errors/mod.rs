// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// File not found
    FileNotFound(String),
    /// Operation not allowed in the current session state
    InvalidState(String),
    /// Engine has not been loaded yet
    EngineNotReady(String),
    /// Engine capability missing from the environment
    EngineUnavailable(String),
    /// Encode failed
    ProcessingError(String),
    /// File system failure
    FsFail(String),
    /// Internal error
    InternalError(String),
}

impl DomainError {
    /// Human-readable detail without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            DomainError::BadArgs(msg)
            | DomainError::FileNotFound(msg)
            | DomainError::InvalidState(msg)
            | DomainError::EngineNotReady(msg)
            | DomainError::EngineUnavailable(msg)
            | DomainError::ProcessingError(msg)
            | DomainError::FsFail(msg)
            | DomainError::InternalError(msg) => msg,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            DomainError::EngineNotReady(msg) => write!(f, "Engine not ready: {}", msg),
            DomainError::EngineUnavailable(msg) => write!(f, "Engine unavailable: {}", msg),
            DomainError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
