//! Session configuration, read from a RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use session_logging::{parse_level, session_info, LogDestination, LogSettings, LoggingError};
use thiserror::Error;

pub const CONFIG_FILENAME: &str = ".rerun_session.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config from {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub log_level: String,
    /// When set, logs go to this file as well as the terminal.
    pub log_file: Option<PathBuf>,
    pub folder_watch_blacklist: Vec<String>,
    /// Rerun the script when a watched source file changes.
    pub run_on_save: bool,
    pub file_poll_interval_ms: u64,
    pub idle_poll_interval_ms: u64,
    pub extra_search_paths: Vec<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            folder_watch_blacklist: Vec::new(),
            run_on_save: true,
            file_poll_interval_ms: 200,
            idle_poll_interval_ms: 20,
            extra_search_paths: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn log_settings(&self) -> Result<LogSettings, LoggingError> {
        let destination = match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        };
        Ok(LogSettings {
            level: parse_level(&self.log_level)?,
            destination,
            time_format_rfc3339: true,
        })
    }

    pub fn file_poll_interval(&self) -> Duration {
        Duration::from_millis(self.file_poll_interval_ms)
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }
}

/// Loads the config at `path`. A missing file yields the defaults.
///
/// Runs before logging is initialized, so it reports through its result only.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SessionConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn log_loaded(path: &Path, config: &SessionConfig) {
    session_info!(
        "Session config from {:?}: run_on_save={} file_poll={}ms blacklist={:?}",
        path,
        config.run_on_save,
        config.file_poll_interval_ms,
        config.folder_watch_blacklist
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"(log_level: "debug", folder_watch_blacklist: ["/data"], run_on_save: false)"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.folder_watch_blacklist, vec!["/data".to_string()]);
        assert!(!config.run_on_save);
        assert_eq!(config.file_poll_interval_ms, 200);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(&path, "(log_level: ").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn log_settings_follow_config() {
        let config = SessionConfig {
            log_level: "warning".to_string(),
            log_file: Some(PathBuf::from("session.log")),
            ..SessionConfig::default()
        };
        let settings = config.log_settings().unwrap();
        assert_eq!(settings.level, LevelFilter::Warn);
        assert_eq!(
            settings.destination,
            LogDestination::Both(PathBuf::from("session.log"))
        );

        let bad = SessionConfig {
            log_level: "chatty".to_string(),
            ..SessionConfig::default()
        };
        assert!(bad.log_settings().is_err());
    }
}
