// Ports - Interface definitions (contracts)

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Capacity of an engine's event channel
pub const ENGINE_EVENT_CAPACITY: usize = 256;

/// Event emitted by an engine while it works
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Fraction done in [0, 1]; not guaranteed monotonic
    Progress(f64),
    /// Raw diagnostic line from the encoder
    Log(String),
}

/// Port for the external transcoding engine.
///
/// One handle is shared for the whole process; it is loaded once and then
/// reused for one run at a time.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Which implementation this is
    fn backend(&self) -> EngineBackend;

    /// Prepare the engine; calling it again after success is a no-op
    async fn load(&self) -> Result<(), DomainError>;

    /// Whether `load` has succeeded
    fn is_loaded(&self) -> bool;

    /// Receive progress and log events from now on
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    /// Encode `input` with the given argument list and return the output bytes
    async fn transcode(&self, args: &[String], input: Vec<u8>) -> Result<Vec<u8>, DomainError>;
}

/// Port for anything that follows a session: console feed, structured logs
pub trait SessionObserver: Send + Sync {
    /// A log entry was appended to the feed
    fn on_log(&self, entry: &LogEntry);

    /// The displayed percentage changed
    fn on_progress(&self, percent: u8);

    /// The session moved between states
    fn on_state_change(&self, from: SessionState, to: SessionState);

    /// The session was discarded and replaced with an empty one
    fn on_reset(&self) {}

    /// A raw engine line arrived while compressing
    fn on_engine_log(&self, _line: &str) {}
}
