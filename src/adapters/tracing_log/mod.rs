// Tracing log adapter - mirrors the session feed into structured logs

use tracing::{debug, error, info, trace, warn};

use crate::domain::model::*;
use crate::ports::SessionObserver;

/// Observer forwarding session activity to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogAdapter;

impl TracingLogAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Tracing level for a feed severity
    fn to_tracing_level(severity: Severity) -> tracing::Level {
        match severity {
            Severity::Info | Severity::Success => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}

impl SessionObserver for TracingLogAdapter {
    fn on_log(&self, entry: &LogEntry) {
        let severity = entry.severity.to_string();
        match Self::to_tracing_level(entry.severity) {
            tracing::Level::ERROR => error!(severity = %severity, "{}", entry.message),
            tracing::Level::WARN => warn!(severity = %severity, "{}", entry.message),
            _ => info!(severity = %severity, "{}", entry.message),
        }
    }

    fn on_progress(&self, percent: u8) {
        trace!(percent, "Compression progress");
    }

    fn on_state_change(&self, from: SessionState, to: SessionState) {
        debug!(from = %from, to = %to, "Session state changed");
    }

    fn on_reset(&self) {
        debug!("Session reset");
    }

    fn on_engine_log(&self, line: &str) {
        debug!(target: "eproc::engine", "{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            TracingLogAdapter::to_tracing_level(Severity::Success),
            tracing::Level::INFO
        );
        assert_eq!(
            TracingLogAdapter::to_tracing_level(Severity::Warning),
            tracing::Level::WARN
        );
        assert_eq!(
            TracingLogAdapter::to_tracing_level(Severity::Error),
            tracing::Level::ERROR
        );
    }

    #[test]
    fn test_observer_calls_without_subscriber() {
        let adapter = TracingLogAdapter::new();
        adapter.on_log(&LogEntry::new("Arquivo selecionado: a.mp4", Severity::Info));
        adapter.on_progress(42);
        adapter.on_state_change(SessionState::Idle, SessionState::Analyzing);
        adapter.on_engine_log("frame=1");
        adapter.on_reset();
    }
}
