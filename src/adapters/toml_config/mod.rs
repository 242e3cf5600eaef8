// TOML config adapter - reads the `[eproc]` section of a config file

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config_initialization::AppConfig;
use crate::error::{CompressorError, CompressorResult};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "eproc.toml";

/// Name of the table holding our settings
const SECTION: &str = "eproc";

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse configuration text.
    ///
    /// Settings live under `[eproc]`; a file without that table yields the
    /// defaults. Unknown keys are rejected.
    pub fn parse(content: &str) -> CompressorResult<AppConfig> {
        let mut parsed: toml::Table = toml::from_str(content)?;
        match parsed.remove(SECTION) {
            Some(section) => Ok(section.try_into::<AppConfig>()?),
            None => Ok(AppConfig::default()),
        }
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> CompressorResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| CompressorError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Per-user config file location
    pub fn default_config_path() -> Option<PathBuf> {
        // On Windows, use %APPDATA%/EprocCompressor/config.toml
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Some(
                PathBuf::from(appdata)
                    .join("EprocCompressor")
                    .join("config.toml"),
            );
        }
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("eproc")
                .join("config.toml")
        })
    }

    /// First existing config file among the working directory and the user
    /// config location
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::default_config_path().filter(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::BackendPreference;

    #[test]
    fn test_parse_section() {
        let config = TomlConfigAdapter::parse(
            r#"
            [eproc]
            backend = "native"
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            output_dir = "out"
            analysis_delay_ms = 0
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendPreference::Native);
        assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.analysis_delay_ms, 0);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_section_gives_defaults() {
        let config = TomlConfigAdapter::parse("[other]\nkey = 1\n").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = TomlConfigAdapter::parse("[eproc]\nbackend = \"libav\"\n").unwrap();
        assert_eq!(config.backend, BackendPreference::Libav);
        assert_eq!(config.analysis_delay_ms, 800);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TomlConfigAdapter::parse("[eproc]\nbackend = \"gpu\"\n").is_err());
        assert!(TomlConfigAdapter::parse("[eproc]\nunknown_key = 1\n").is_err());
        assert!(TomlConfigAdapter::parse("not toml at all [").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[eproc]\nanalysis_delay_ms = 5\n").unwrap();
        assert_eq!(TomlConfigAdapter::load(&path).unwrap().analysis_delay_ms, 5);

        let err = TomlConfigAdapter::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, CompressorError::Config { .. }));
    }
}
