use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{ConsoleFeed, EnvironmentProbe, FeedStyle, TracingLogAdapter};
use crate::app::controller::CompressionController;
use crate::config_initialization::AppConfig;
use crate::ports::{SessionObserver, TranscodeEngine};

/// Wiring of the adapters behind the ports
pub trait AppContainer: Send + Sync {
    fn engine(&self) -> Arc<dyn TranscodeEngine>;
    fn controller(&self, feed: FeedStyle) -> CompressionController;
}

pub struct DefaultAppContainer {
    config: AppConfig,
    engine: Arc<dyn TranscodeEngine>,
    log_observer: Arc<dyn SessionObserver>,
}

impl DefaultAppContainer {
    /// Probe the environment once and build the shared engine
    pub fn new(config: AppConfig) -> Self {
        let probe = EnvironmentProbe::new(config.backend, config.ffmpeg_path.clone());
        let engine = probe.build_engine();
        Self::with_engine(config, engine)
    }

    /// Use a pre-built engine instead of probing
    pub fn with_engine(config: AppConfig, engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            config,
            engine,
            log_observer: Arc::new(TracingLogAdapter::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl AppContainer for DefaultAppContainer {
    fn engine(&self) -> Arc<dyn TranscodeEngine> {
        Arc::clone(&self.engine)
    }

    fn controller(&self, feed: FeedStyle) -> CompressionController {
        CompressionController::new(self.engine())
            .with_analysis_delay(Duration::from_millis(self.config.analysis_delay_ms))
            .with_observer(Arc::clone(&self.log_observer))
            .with_observer(Arc::new(ConsoleFeed::new(feed)))
    }
}
