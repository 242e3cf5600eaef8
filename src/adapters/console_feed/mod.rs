// Console feed - the terminal rendition of the session log window

use std::io::Write;
use std::sync::Mutex;

use crate::domain::model::*;
use crate::ports::SessionObserver;

/// Width of the progress bar in cells
const BAR_LENGTH: usize = 20;

/// How the feed is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStyle {
    /// Timestamped lines and a redrawn progress bar on stderr
    Plain,
    /// One JSON object per event on stdout
    Json,
    /// Nothing
    Quiet,
}

/// Observer printing the session feed for a terminal user
pub struct ConsoleFeed {
    style: FeedStyle,
    last_percent: Mutex<Option<u8>>,
}

impl ConsoleFeed {
    pub fn new(style: FeedStyle) -> Self {
        Self {
            style,
            last_percent: Mutex::new(None),
        }
    }

    /// Feed line for an entry: `[HH:MM:SS] message`
    pub fn format_entry(entry: &LogEntry) -> String {
        format!("[{}] {}", entry.clock(), entry.message)
    }

    /// Status line printed when the session changes state
    pub fn format_state(state: SessionState) -> String {
        format!("== {} ==", state.badge())
    }

    /// Progress bar for a percentage
    pub fn render_bar(percent: u8) -> String {
        let percent = percent.min(100) as usize;
        let filled = percent * BAR_LENGTH / 100;
        format!(
            "[{}{}] {:>3}%",
            "█".repeat(filled),
            "░".repeat(BAR_LENGTH - filled),
            percent
        )
    }

    /// End the bar line so the next entry starts on its own line
    fn break_bar_line(&self) {
        if let Ok(mut last) = self.last_percent.lock() {
            if last.take().is_some() {
                eprintln!();
            }
        }
    }
}

impl SessionObserver for ConsoleFeed {
    fn on_log(&self, entry: &LogEntry) {
        match self.style {
            FeedStyle::Plain => {
                self.break_bar_line();
                eprintln!("{}", Self::format_entry(entry));
            }
            FeedStyle::Json => {
                let event = serde_json::json!({
                    "event": "log",
                    "timestamp": entry.timestamp.to_rfc3339(),
                    "severity": entry.severity,
                    "message": entry.message,
                });
                println!("{}", event);
            }
            FeedStyle::Quiet => {}
        }
    }

    fn on_progress(&self, percent: u8) {
        match self.style {
            FeedStyle::Plain => {
                if let Ok(mut last) = self.last_percent.lock() {
                    if *last == Some(percent) {
                        return;
                    }
                    *last = Some(percent);
                }
                eprint!("\r{}", Self::render_bar(percent));
                let _ = std::io::stderr().flush();
            }
            FeedStyle::Json => {
                let event = serde_json::json!({
                    "event": "progress",
                    "percent": percent,
                });
                println!("{}", event);
            }
            FeedStyle::Quiet => {}
        }
    }

    fn on_state_change(&self, from: SessionState, to: SessionState) {
        match self.style {
            FeedStyle::Plain => {
                self.break_bar_line();
                eprintln!("{}", Self::format_state(to));
            }
            FeedStyle::Json => {
                let event = serde_json::json!({
                    "event": "state",
                    "from": from,
                    "to": to,
                    "badge": to.badge(),
                });
                println!("{}", event);
            }
            FeedStyle::Quiet => {}
        }
    }

    fn on_reset(&self) {
        if let Ok(mut last) = self.last_percent.lock() {
            *last = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bar() {
        assert_eq!(ConsoleFeed::render_bar(0), format!("[{}]   0%", "░".repeat(20)));
        assert_eq!(
            ConsoleFeed::render_bar(50),
            format!("[{}{}]  50%", "█".repeat(10), "░".repeat(10))
        );
        assert_eq!(ConsoleFeed::render_bar(100), format!("[{}] 100%", "█".repeat(20)));
        assert_eq!(ConsoleFeed::render_bar(255), ConsoleFeed::render_bar(100));
    }

    #[test]
    fn test_format_entry() {
        let entry = LogEntry::new("Codificação finalizada.", Severity::Info);
        let line = ConsoleFeed::format_entry(&entry);
        assert!(line.starts_with('['));
        assert_eq!(&line[9..], "] Codificação finalizada.");
    }

    #[test]
    fn test_format_state_uses_badge() {
        assert_eq!(ConsoleFeed::format_state(SessionState::Compressing), "== PROCESSANDO ==");
        assert_eq!(ConsoleFeed::format_state(SessionState::Completed), "== COMPLETED ==");
    }

    #[test]
    fn test_state_change_ends_bar_line() {
        let feed = ConsoleFeed::new(FeedStyle::Plain);
        feed.on_progress(100);
        feed.on_state_change(SessionState::Compressing, SessionState::Completed);
        assert_eq!(*feed.last_percent.lock().unwrap(), None);
    }

    #[test]
    fn test_progress_tracks_last_percent() {
        let feed = ConsoleFeed::new(FeedStyle::Plain);
        feed.on_progress(10);
        assert_eq!(*feed.last_percent.lock().unwrap(), Some(10));
        feed.on_log(&LogEntry::new("x", Severity::Info));
        assert_eq!(*feed.last_percent.lock().unwrap(), None);
    }
}
