// Environment probe - picks the engine backend once at startup

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::adapters::exec_ffmpeg::NativeFfmpegEngine;
use crate::domain::errors::DomainError;
use crate::domain::model::{BackendPreference, EngineBackend};
use crate::ports::{EngineEvent, TranscodeEngine, ENGINE_EVENT_CAPACITY};

#[cfg(windows)]
const FFMPEG_BINARY: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const FFMPEG_BINARY: &str = "ffmpeg";

/// Whether the in-process backend was compiled in
pub const LIBAV_COMPILED: bool = cfg!(feature = "libav");

/// Decides which backend serves this process
#[derive(Debug, Clone)]
pub struct EnvironmentProbe {
    preference: BackendPreference,
    ffmpeg_path: Option<PathBuf>,
    search_path: Option<std::ffi::OsString>,
}

impl EnvironmentProbe {
    pub fn new(preference: BackendPreference, ffmpeg_path: Option<PathBuf>) -> Self {
        Self {
            preference,
            ffmpeg_path,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Replace the `PATH` value searched for the executable
    pub fn with_search_path(mut self, search_path: Option<std::ffi::OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Locate the native executable: configured path first, then `PATH`
    pub fn locate_ffmpeg(&self) -> Option<PathBuf> {
        if let Some(path) = &self.ffmpeg_path {
            if path.is_file() {
                return Some(path.clone());
            }
            debug!("Configured ffmpeg path does not exist: {}", path.display());
        }

        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .map(|dir| dir.join(FFMPEG_BINARY))
            .find(|candidate| candidate.is_file())
    }

    /// Backend selected for this environment.
    ///
    /// `Auto` prefers the native executable, then the in-process library.
    /// When neither is present it still answers `Native`, whose load will
    /// report the missing executable.
    pub fn detect(&self) -> EngineBackend {
        match self.preference {
            BackendPreference::Native => EngineBackend::Native,
            BackendPreference::Libav => EngineBackend::InProcess,
            BackendPreference::Auto => {
                if self.locate_ffmpeg().is_some() {
                    EngineBackend::Native
                } else if LIBAV_COMPILED {
                    EngineBackend::InProcess
                } else {
                    EngineBackend::Native
                }
            }
        }
    }

    /// Build the engine handle for the detected backend
    pub fn build_engine(&self) -> Arc<dyn TranscodeEngine> {
        let backend = self.detect();
        info!("Selected engine backend: {} ({})", backend, backend.label());

        match backend {
            EngineBackend::Native => {
                let path = self
                    .locate_ffmpeg()
                    .or_else(|| self.ffmpeg_path.clone())
                    .unwrap_or_else(|| PathBuf::from(FFMPEG_BINARY));
                Arc::new(NativeFfmpegEngine::new(path))
            }
            EngineBackend::InProcess => in_process_engine(),
        }
    }
}

#[cfg(feature = "libav")]
fn in_process_engine() -> Arc<dyn TranscodeEngine> {
    Arc::new(crate::adapters::exec_libav::LibavEngine::new())
}

#[cfg(not(feature = "libav"))]
fn in_process_engine() -> Arc<dyn TranscodeEngine> {
    Arc::new(UnavailableEngine::new(
        EngineBackend::InProcess,
        "this build does not include the libav backend (enable the `libav` feature)",
    ))
}

/// Stand-in for a backend this build or host cannot provide; never loads
pub struct UnavailableEngine {
    backend: EngineBackend,
    reason: String,
    events: broadcast::Sender<EngineEvent>,
}

impl UnavailableEngine {
    pub fn new(backend: EngineBackend, reason: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(ENGINE_EVENT_CAPACITY);
        Self {
            backend,
            reason: reason.into(),
            events,
        }
    }
}

#[async_trait]
impl TranscodeEngine for UnavailableEngine {
    fn backend(&self) -> EngineBackend {
        self.backend
    }

    async fn load(&self) -> Result<(), DomainError> {
        Err(DomainError::EngineUnavailable(self.reason.clone()))
    }

    fn is_loaded(&self) -> bool {
        false
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn transcode(&self, _args: &[String], _input: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        Err(DomainError::EngineNotReady(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_ffmpeg_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FFMPEG_BINARY), b"").unwrap();
        dir
    }

    #[test]
    fn test_explicit_preference_wins() {
        let probe = EnvironmentProbe::new(BackendPreference::Libav, None).with_search_path(None);
        assert_eq!(probe.detect(), EngineBackend::InProcess);

        let probe = EnvironmentProbe::new(BackendPreference::Native, None).with_search_path(None);
        assert_eq!(probe.detect(), EngineBackend::Native);
    }

    #[test]
    fn test_auto_finds_ffmpeg_on_search_path() {
        let dir = fake_ffmpeg_dir();
        let probe = EnvironmentProbe::new(BackendPreference::Auto, None)
            .with_search_path(Some(dir.path().as_os_str().to_os_string()));

        assert_eq!(probe.locate_ffmpeg(), Some(dir.path().join(FFMPEG_BINARY)));
        assert_eq!(probe.detect(), EngineBackend::Native);
    }

    #[test]
    fn test_configured_path_takes_precedence() {
        let dir = fake_ffmpeg_dir();
        let configured = dir.path().join(FFMPEG_BINARY);
        let probe = EnvironmentProbe::new(BackendPreference::Auto, Some(configured.clone()))
            .with_search_path(None);
        assert_eq!(probe.locate_ffmpeg(), Some(configured));
    }

    #[test]
    fn test_auto_without_ffmpeg() {
        let empty = TempDir::new().unwrap();
        let probe = EnvironmentProbe::new(BackendPreference::Auto, None)
            .with_search_path(Some(empty.path().as_os_str().to_os_string()));

        assert_eq!(probe.locate_ffmpeg(), None);
        let expected = if LIBAV_COMPILED {
            EngineBackend::InProcess
        } else {
            EngineBackend::Native
        };
        assert_eq!(probe.detect(), expected);
    }

    #[tokio::test]
    async fn test_unavailable_engine_never_loads() {
        let engine = UnavailableEngine::new(EngineBackend::InProcess, "missing");
        let err = engine.load().await.unwrap_err();
        assert_eq!(err, DomainError::EngineUnavailable("missing".to_string()));
        assert!(!engine.is_loaded());
        assert!(matches!(
            engine.transcode(&[], Vec::new()).await,
            Err(DomainError::EngineNotReady(_))
        ));
    }

    #[cfg(not(feature = "libav"))]
    #[tokio::test]
    async fn test_libav_request_without_feature() {
        let probe = EnvironmentProbe::new(BackendPreference::Libav, None);
        let engine = probe.build_engine();
        assert_eq!(engine.backend(), EngineBackend::InProcess);
        assert!(engine.load().await.is_err());
    }
}
