// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;

    fn sample_source() -> SourceFile {
        SourceFile::new("audiencia.mp4", 42 * BYTES_PER_MB, "video/mp4", "/tmp/audiencia.mp4")
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(0), "0.00");
        assert_eq!(format_megabytes(BYTES_PER_MB), "1.00");
        assert_eq!(format_megabytes(BYTES_PER_MB + BYTES_PER_MB / 2), "1.50");
        assert_eq!(sample_source().size_mb(), "42.00");
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.progress(), 0);
        assert!(session.logs().is_empty());
        assert!(session.source().is_none());
        assert!(session.result().is_none());
    }

    #[test]
    fn test_result_only_visible_when_completed() {
        let mut session = Session::new();
        session.set_source(sample_source());
        session.set_state(SessionState::Compressing);
        session.store_result(vec![1, 2, 3]);
        assert!(session.result().is_none());

        session.set_state(SessionState::Completed);
        assert_eq!(session.result(), Some(&[1u8, 2, 3][..]));

        session.set_state(SessionState::Error);
        assert!(session.result().is_none());
        session.set_state(SessionState::Completed);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_empty_result_is_never_exposed() {
        let mut session = Session::new();
        session.store_result(Vec::new());
        session.set_state(SessionState::Completed);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut session = Session::new();
        session.set_progress(250);
        assert_eq!(session.progress(), 100);
    }

    #[test]
    fn test_state_badge() {
        assert_eq!(SessionState::Compressing.badge(), "PROCESSANDO");
        assert_eq!(SessionState::Ready.badge(), "READY");
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(!SessionState::Ready.is_terminal());
    }

    #[test]
    fn test_log_entry_clock_format() {
        let entry = LogEntry::new("Arquivo selecionado: a.mp4", Severity::Info);
        let clock = entry.clock();
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.matches(':').count(), 2);
    }

    #[test]
    fn test_compliance_report_serializes_camel_case() {
        let report = ComplianceReport {
            is_compliant: true,
            message: "ok".to_string(),
            suggested_action: "Carregar Diretamente".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["isCompliant"], true);
        assert_eq!(json["suggestedAction"], "Carregar Diretamente");
    }

    #[test]
    fn test_backend_preference_parse() {
        assert_eq!(BackendPreference::parse("auto").unwrap(), BackendPreference::Auto);
        assert_eq!(BackendPreference::parse("NATIVE").unwrap(), BackendPreference::Native);
        assert_eq!(BackendPreference::parse("libav").unwrap(), BackendPreference::Libav);
        assert!(matches!(
            BackendPreference::parse("wasm"),
            Err(DomainError::BadArgs(_))
        ));
    }

    #[tokio::test]
    async fn test_source_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depoimento.MOV");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let source = SourceFile::from_path(&path, None).await.unwrap();
        assert_eq!(source.name, "depoimento.MOV");
        assert_eq!(source.size, 2048);
        assert_eq!(source.mime_type, "video/quicktime");

        let overridden = SourceFile::from_path(&path, Some("video/mp4")).await.unwrap();
        assert_eq!(overridden.mime_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_source_file_missing() {
        let result = SourceFile::from_path(std::path::Path::new("/nonexistent/x.mp4"), None).await;
        assert!(matches!(result, Err(DomainError::FileNotFound(_))));
    }
}
