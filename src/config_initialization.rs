//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::toml_config::TomlConfigAdapter;
use crate::cli::{Cli, Commands};
use crate::domain::model::BackendPreference;
use crate::error::{CompressorError, CompressorResult};
use crate::utils::logging::LogLevel;

/// Default pause before the compliance verdict is shown
pub const DEFAULT_ANALYSIS_DELAY_MS: u64 = 800;

/// Effective settings of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Which engine backend to use
    pub backend: BackendPreference,
    /// Explicit location of the `ffmpeg` executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    /// Where saved results go
    pub output_dir: PathBuf,
    /// Pause between selecting a file and the analysis verdict
    pub analysis_delay_ms: u64,
    /// Minimum level of diagnostic logs
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            ffmpeg_path: None,
            output_dir: PathBuf::from("."),
            analysis_delay_ms: DEFAULT_ANALYSIS_DELAY_MS,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn log_level(&self) -> CompressorResult<LogLevel> {
        LogLevel::parse(&self.log_level)
    }

    /// Check the values that serde cannot
    pub fn validate(&self) -> CompressorResult<()> {
        self.log_level()?;
        if self.output_dir.as_os_str().is_empty() {
            return Err(CompressorError::Config {
                message: "output_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Build the configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration(cli: &Cli) -> CompressorResult<AppConfig> {
    // Step 1 and 2: defaults, replaced by a file when one is found
    let mut config = match cli.config.clone().or_else(TomlConfigAdapter::discover) {
        Some(path) => TomlConfigAdapter::load(&path)?,
        None => AppConfig::default(),
    };

    // Step 3: environment variables
    let env_overrides = apply_environment_overrides(&mut config, |key| std::env::var(key).ok())?;
    if env_overrides > 0 {
        debug!("Applied {} environment variable overrides", env_overrides);
    }

    // Step 4: command-line flags
    apply_cli_overrides(&mut config, cli)?;

    config.validate()?;
    Ok(config)
}

/// Apply `EPROC_*` variables; returns how many were set
pub fn apply_environment_overrides<F>(config: &mut AppConfig, lookup: F) -> CompressorResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;

    if let Some(value) = lookup("EPROC_BACKEND") {
        config.backend = parse_backend(&value)?;
        applied += 1;
    }
    if let Some(value) = lookup("EPROC_FFMPEG_PATH") {
        config.ffmpeg_path = Some(PathBuf::from(value));
        applied += 1;
    }
    if let Some(value) = lookup("EPROC_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(value);
        applied += 1;
    }
    if let Some(value) = lookup("EPROC_ANALYSIS_DELAY_MS") {
        config.analysis_delay_ms = value.trim().parse().map_err(|_| CompressorError::Config {
            message: format!("EPROC_ANALYSIS_DELAY_MS must be a number of milliseconds, got '{}'", value),
        })?;
        applied += 1;
    }
    if let Some(value) = lookup("EPROC_LOG_LEVEL") {
        config.log_level = value;
        applied += 1;
    }

    Ok(applied)
}

/// Apply command-line overrides
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) -> CompressorResult<()> {
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(backend) = &cli.backend {
        config.backend = parse_backend(backend)?;
    }
    if let Some(path) = &cli.ffmpeg {
        config.ffmpeg_path = Some(path.clone());
    }

    if let Commands::Compress(args) = &cli.command {
        if let Some(dir) = &args.output_dir {
            config.output_dir = dir.clone();
        }
    }

    Ok(())
}

fn parse_backend(value: &str) -> CompressorResult<BackendPreference> {
    Ok(BackendPreference::parse(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.backend, BackendPreference::Auto);
        assert_eq!(config.analysis_delay_ms, 800);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = AppConfig::default();
        let applied = apply_environment_overrides(
            &mut config,
            lookup_from(&[
                ("EPROC_BACKEND", "native"),
                ("EPROC_FFMPEG_PATH", "/usr/local/bin/ffmpeg"),
                ("EPROC_ANALYSIS_DELAY_MS", "0"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 3);
        assert_eq!(config.backend, BackendPreference::Native);
        assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/usr/local/bin/ffmpeg")));
        assert_eq!(config.analysis_delay_ms, 0);
    }

    #[test]
    fn test_environment_rejects_garbage() {
        let mut config = AppConfig::default();
        assert!(apply_environment_overrides(&mut config, lookup_from(&[("EPROC_BACKEND", "gpu")])).is_err());
        assert!(apply_environment_overrides(
            &mut config,
            lookup_from(&[("EPROC_ANALYSIS_DELAY_MS", "soon")])
        )
        .is_err());
    }

    #[test]
    fn test_bad_backend_keeps_domain_error() {
        let mut config = AppConfig::default();
        let err = apply_environment_overrides(&mut config, lookup_from(&[("EPROC_BACKEND", "gpu")]))
            .unwrap_err();
        assert!(matches!(
            err,
            CompressorError::Domain(crate::domain::errors::DomainError::BadArgs(_))
        ));
        assert!(err.to_string().contains("Invalid backend: gpu"));
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig {
            backend: BackendPreference::Native,
            ..AppConfig::default()
        };
        let cli = Cli::parse_from([
            "eproc",
            "--backend",
            "libav",
            "--log-level",
            "debug",
            "compress",
            "--input",
            "video.mp4",
            "--output-dir",
            "out",
        ]);
        apply_cli_overrides(&mut config, &cli).unwrap();

        assert_eq!(config.backend, BackendPreference::Libav);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let config = AppConfig {
            log_level: "loud".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(CompressorError::Config { .. })));
    }

    #[test]
    fn test_initialize_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("eproc.toml");
        std::fs::write(&path, "[eproc]\nanalysis_delay_ms = 42\n").unwrap();

        let cli = Cli::parse_from([
            "eproc",
            "--config",
            path.to_str().unwrap(),
            "engine",
        ]);
        let config = initialize_configuration(&cli).unwrap();
        assert_eq!(config.analysis_delay_ms, 42);
    }
}
