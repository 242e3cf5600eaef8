//! Native ffmpeg execution adapter
//!
//! Runs the `ffmpeg` executable as a child process inside a scratch
//! directory and turns its `-progress` stream into engine events.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::adapters::scratch::ScratchSpace;
use crate::domain::errors::DomainError;
use crate::domain::model::EngineBackend;
use crate::engine::{self, parse_duration_line, ratio_of, ProgressLine};
use crate::ports::{EngineEvent, TranscodeEngine, ENGINE_EVENT_CAPACITY};

/// Number of stderr lines kept for the failure message
const STDERR_TAIL_LINES: usize = 16;

/// Engine backed by an `ffmpeg` executable
pub struct NativeFfmpegEngine {
    ffmpeg_path: PathBuf,
    loaded: AtomicBool,
    events: broadcast::Sender<EngineEvent>,
}

impl NativeFfmpegEngine {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(ENGINE_EVENT_CAPACITY);
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            loaded: AtomicBool::new(false),
            events,
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    fn emit(&self, event: EngineEvent) {
        emit(&self.events, event);
    }

    /// Full command line for one run, relative to the scratch directory
    fn command_args(preset_args: &[String]) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-i", engine::INPUT_FILE_NAME]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(preset_args.iter().cloned());
        args.extend(
            ["-threads", "0", "-progress", "pipe:1", "-nostats", engine::OUTPUT_FILE_NAME]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    async fn run(&self, scratch: &ScratchSpace, preset_args: &[String]) -> Result<(), DomainError> {
        let args = Self::command_args(preset_args);
        debug!("FFmpeg args: {:?}", args);

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::ProcessingError(format!(
                    "Failed to start {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::InternalError("ffmpeg stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::InternalError("ffmpeg stderr not captured".to_string()))?;

        let duration: Arc<Mutex<Option<f64>>> = Arc::new(Mutex::new(None));

        let stderr_task = {
            let events = self.events.clone();
            let duration = Arc::clone(&duration);
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(seconds) = parse_duration_line(&line) {
                        if let Ok(mut slot) = duration.lock() {
                            slot.get_or_insert(seconds);
                        }
                    }
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.clone());
                    emit(&events, EngineEvent::Log(line));
                }
                tail
            })
        };

        let stdout_task = {
            let events = self.events.clone();
            let duration = Arc::clone(&duration);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    match ProgressLine::parse(&line) {
                        ProgressLine::OutTime(seconds) => {
                            let total = duration.lock().ok().and_then(|slot| *slot);
                            if let Some(ratio) = total.and_then(|d| ratio_of(seconds, d)) {
                                emit(&events, EngineEvent::Progress(ratio));
                            }
                        }
                        ProgressLine::End => emit(&events, EngineEvent::Progress(1.0)),
                        ProgressLine::Continue | ProgressLine::Other => {}
                    }
                }
            })
        };

        let status = child
            .wait()
            .await
            .map_err(|e| DomainError::ProcessingError(format!("Failed to wait for ffmpeg: {}", e)))?;

        if let Err(e) = stdout_task.await {
            warn!("ffmpeg progress reader ended abnormally: {}", e);
        }
        let tail = diagnostics_tail(stderr_task.await);

        if !status.success() {
            let reason = tail
                .iter()
                .rev()
                .find(|line| !line.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| "no diagnostic output".to_string());
            return Err(DomainError::ProcessingError(format!(
                "ffmpeg exited with {}: {}",
                status, reason
            )));
        }

        Ok(())
    }
}

/// Stderr lines collected by the reader task; empty if the task failed
fn diagnostics_tail(joined: Result<VecDeque<String>, JoinError>) -> VecDeque<String> {
    joined.unwrap_or_else(|e| {
        warn!("ffmpeg diagnostics reader ended abnormally: {}", e);
        VecDeque::new()
    })
}

fn emit(events: &broadcast::Sender<EngineEvent>, event: EngineEvent) {
    if events.send(event).is_err() {
        debug!("No subscribers for engine event");
    }
}

#[async_trait]
impl TranscodeEngine for NativeFfmpegEngine {
    fn backend(&self) -> EngineBackend {
        EngineBackend::Native
    }

    async fn load(&self) -> Result<(), DomainError> {
        if self.is_loaded() {
            return Ok(());
        }

        let status = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                DomainError::EngineUnavailable(format!(
                    "ffmpeg not found at {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        if !status.success() {
            return Err(DomainError::EngineUnavailable(format!(
                "{} -version exited with {}",
                self.ffmpeg_path.display(),
                status
            )));
        }

        self.loaded.store(true, Ordering::SeqCst);
        info!("Native ffmpeg ready: {}", self.ffmpeg_path.display());
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn transcode(&self, args: &[String], input: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        if !self.is_loaded() {
            return Err(DomainError::EngineNotReady(
                "native ffmpeg has not been loaded".to_string(),
            ));
        }

        let scratch = ScratchSpace::new()?;
        scratch.write(engine::INPUT_FILE_NAME, &input).await?;
        drop(input);

        self.emit(EngineEvent::Progress(0.0));
        let outcome = match self.run(&scratch, args).await {
            Ok(()) => scratch.read(engine::OUTPUT_FILE_NAME).await,
            Err(e) => Err(e),
        };

        scratch.cleanup();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_wrap_preset() {
        let preset = crate::engine::EncodePreset::eproc().to_args();
        let args = NativeFfmpegEngine::command_args(&preset);
        assert_eq!(&args[..5], &["-hide_banner", "-nostdin", "-y", "-i", "input.mp4"]);
        assert_eq!(args.last().map(String::as_str), Some("output.mp4"));
        assert!(args.windows(2).any(|w| w[0] == "-progress" && w[1] == "pipe:1"));
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "28"));
    }

    #[tokio::test]
    async fn test_load_fails_for_missing_binary() {
        let engine = NativeFfmpegEngine::new("/nonexistent/bin/ffmpeg");
        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, DomainError::EngineUnavailable(_)));
        assert!(!engine.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_diagnostics_reader_gives_empty_tail() {
        let crash = true;
        let reader = tokio::spawn(async move {
            if crash {
                panic!("reader crashed");
            }
            VecDeque::<String>::new()
        });
        assert!(diagnostics_tail(reader.await).is_empty());

        let reader = tokio::spawn(async { VecDeque::from(vec!["Invalid data".to_string()]) });
        assert_eq!(diagnostics_tail(reader.await), vec!["Invalid data".to_string()]);
    }

    #[tokio::test]
    async fn test_transcode_requires_load() {
        let engine = NativeFfmpegEngine::new("ffmpeg");
        let err = engine.transcode(&[], vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, DomainError::EngineNotReady(_)));
    }
}
