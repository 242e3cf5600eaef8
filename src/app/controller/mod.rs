// Compression controller - drives one session through the E-PROC lifecycle

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::{percent_from_ratio, EncodePreset};
use crate::output::ResultWriter;
use crate::ports::*;

/// Owner of the live session and the only caller of the engine
pub struct CompressionController {
    engine: Arc<dyn TranscodeEngine>,
    observers: Vec<Arc<dyn SessionObserver>>,
    session: Session,
    report: Option<ComplianceReport>,
    preset: EncodePreset,
    analysis_delay: Duration,
}

impl CompressionController {
    /// Create a controller around an injected engine
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            engine,
            observers: Vec::new(),
            session: Session::new(),
            report: None,
            preset: EncodePreset::eproc(),
            analysis_delay: Duration::from_millis(
                crate::config_initialization::DEFAULT_ANALYSIS_DELAY_MS,
            ),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn progress(&self) -> u8 {
        self.session.progress()
    }

    pub fn logs(&self) -> &[LogEntry] {
        self.session.logs()
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.session.source()
    }

    /// Verdict of the last analysis, if it succeeded
    pub fn report(&self) -> Option<&ComplianceReport> {
        self.report.as_ref()
    }

    pub fn result(&self) -> Option<&[u8]> {
        self.session.result()
    }

    pub fn engine_ready(&self) -> bool {
        self.engine.is_loaded()
    }

    pub fn backend(&self) -> EngineBackend {
        self.engine.backend()
    }

    /// Load the engine. Safe to call again after success.
    pub async fn initialize_engine(&mut self) -> Result<(), DomainError> {
        let backend = self.engine.backend();
        self.log(
            format!("Iniciando motor ({})...", backend.label()),
            Severity::Info,
        );

        match self.engine.load().await {
            Ok(()) => {
                self.log("Motor de compressão carregado e pronto.", Severity::Success);
                if backend == EngineBackend::Native {
                    self.log(
                        "Aceleração de hardware habilitada (Ambiente Desktop).",
                        Severity::Success,
                    );
                }
                Ok(())
            }
            Err(e) => {
                self.log(
                    format!("Erro de inicialização: {}", e.detail()),
                    Severity::Error,
                );
                if backend == EngineBackend::InProcess {
                    self.log(
                        "Atenção: A biblioteca integrada tem limitações de performance. O FFmpeg nativo é recomendado.",
                        Severity::Warning,
                    );
                }
                Err(e)
            }
        }
    }

    /// `Idle -> Analyzing`. Starts a fresh feed for the new file.
    pub fn select_file(&mut self, file: SourceFile) -> Result<(), DomainError> {
        let state = self.state();
        if state != SessionState::Idle {
            return Err(DomainError::InvalidState(format!(
                "Cannot select a file while {}",
                state
            )));
        }

        let name = file.name.clone();
        self.session.set_source(file);
        self.report = None;
        self.session.clear_logs();
        self.transition(SessionState::Analyzing);
        self.log(format!("Arquivo selecionado: {}", name), Severity::Info);
        Ok(())
    }

    /// `Analyzing -> Ready`, after the analysis delay.
    ///
    /// A failing check is logged and does not stop the session.
    pub async fn complete_analysis(&mut self) -> Result<(), DomainError> {
        let state = self.state();
        if state != SessionState::Analyzing {
            return Err(DomainError::InvalidState(format!(
                "No analysis pending while {}",
                state
            )));
        }

        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }

        let outcome = match self.session.source() {
            Some(file) => ComplianceChecker::analyze(&file.name, file.size, &file.mime_type),
            None => Err(DomainError::InternalError("Session has no file".to_string())),
        };

        match outcome {
            Ok(report) => {
                let severity = if report.is_compliant {
                    Severity::Success
                } else {
                    Severity::Warning
                };
                self.log(format!("Análise: {}", report.message), severity);
                self.report = Some(report);
            }
            Err(e) => {
                debug!("Compliance check failed: {}", e);
                self.log("Erro na análise preliminar.", Severity::Error);
            }
        }

        self.transition(SessionState::Ready);
        Ok(())
    }

    /// `select_file` followed by `complete_analysis`
    pub async fn analyze(&mut self, file: SourceFile) -> Result<(), DomainError> {
        self.select_file(file)?;
        self.complete_analysis().await
    }

    /// `Ready -> Compressing -> Completed | Error`.
    ///
    /// Refusals leave the state untouched. Every failure after the run
    /// started is terminal and leaves the session in `Error`.
    pub async fn start_compression(&mut self) -> Result<(), DomainError> {
        match self.state() {
            SessionState::Ready => {}
            SessionState::Compressing => {
                self.log(
                    "Erro: Uma compressão já está em andamento.",
                    Severity::Error,
                );
                return Err(DomainError::InvalidState(
                    "A compression run is already in progress".to_string(),
                ));
            }
            other => {
                return Err(DomainError::InvalidState(format!(
                    "Cannot start compression while {}",
                    other
                )));
            }
        }

        let source = match self.session.source() {
            Some(file) if self.engine.is_loaded() => file.clone(),
            _ => {
                self.log("Erro: O motor não está pronto.", Severity::Error);
                return Err(DomainError::EngineNotReady(
                    "Engine has not been loaded".to_string(),
                ));
            }
        };

        self.transition(SessionState::Compressing);
        self.apply_percent(0);
        self.log("Iniciando compressão E-PROC...", Severity::Info);

        let input = match tokio::fs::read(&source.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return self.fail(DomainError::FsFail(format!(
                    "Falha ao ler {}: {}",
                    source.path.display(),
                    e
                )))
            }
        };

        self.log(
            "Executando script de otimização (H.264/AAC)...",
            Severity::Warning,
        );

        let output = match self.run_engine(input).await {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e),
        };
        self.log("Codificação finalizada.", Severity::Info);

        if output.is_empty() {
            return self.fail(DomainError::ProcessingError(
                "o motor não produziu nenhum dado".to_string(),
            ));
        }

        let new_size = output.len() as u64;
        self.session.store_result(output);
        self.apply_percent(100);
        self.transition(SessionState::Completed);
        self.log(
            format!(
                "Sucesso: {}MB -> {}MB",
                format_megabytes(source.size),
                format_megabytes(new_size)
            ),
            Severity::Success,
        );
        Ok(())
    }

    /// Save the result as `EPROC_<name>` in `dir`. Only valid in `Completed`.
    pub fn save_result(&mut self, dir: &Path) -> Result<PathBuf, DomainError> {
        let saved = match (self.session.result(), self.session.source()) {
            (Some(bytes), Some(file)) => ResultWriter::save(dir, &file.name, bytes),
            _ => {
                return Err(DomainError::InvalidState(format!(
                    "No result to save while {}",
                    self.state()
                )))
            }
        };

        match saved {
            Ok(path) => {
                self.log(
                    format!("Arquivo salvo em {}.", path.display()),
                    Severity::Success,
                );
                Ok(path)
            }
            Err(e) => {
                self.log(
                    format!("Falha ao salvar arquivo: {}", e.detail()),
                    Severity::Error,
                );
                Err(e)
            }
        }
    }

    /// Discard the session. Only valid from `Completed` or `Error`.
    pub fn reset(&mut self) -> Result<(), DomainError> {
        let from = self.state();
        if !from.is_terminal() {
            return Err(DomainError::InvalidState(format!(
                "Cannot reset while {}",
                from
            )));
        }

        self.session = Session::new();
        self.report = None;
        for observer in &self.observers {
            observer.on_state_change(from, SessionState::Idle);
            observer.on_reset();
        }
        Ok(())
    }

    /// Await the encode while relaying its events into the session
    async fn run_engine(&mut self, input: Vec<u8>) -> Result<Vec<u8>, DomainError> {
        let engine = Arc::clone(&self.engine);
        let args = self.preset.to_args();
        let mut events = engine.subscribe();

        let job = engine.transcode(&args, input);
        tokio::pin!(job);

        let outcome = loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Skipped {} engine events", skipped);
                    }
                    Err(RecvError::Closed) => break (&mut job).await,
                },
                result = &mut job => break result,
            }
        };

        loop {
            match events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        outcome
    }

    fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(ratio) => match percent_from_ratio(ratio) {
                Some(percent) => self.apply_percent(percent),
                None => warn!("Ignoring non-finite progress value {}", ratio),
            },
            EngineEvent::Log(line) => {
                for observer in &self.observers {
                    observer.on_engine_log(&line);
                }
            }
        }
    }

    fn apply_percent(&mut self, percent: u8) {
        self.session.set_progress(percent);
        let shown = self.session.progress();
        for observer in &self.observers {
            observer.on_progress(shown);
        }
    }

    fn fail(&mut self, error: DomainError) -> Result<(), DomainError> {
        self.log(
            format!("Falha na compressão: {}", error.detail()),
            Severity::Error,
        );
        self.transition(SessionState::Error);
        Err(error)
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.session.state();
        self.session.set_state(to);
        for observer in &self.observers {
            observer.on_state_change(from, to);
        }
    }

    fn log(&mut self, message: impl Into<String>, severity: Severity) {
        let entry = LogEntry::new(message, severity);
        for observer in &self.observers {
            observer.on_log(&entry);
        }
        self.session.push_log(entry);
    }
}
