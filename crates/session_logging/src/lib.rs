#![deny(missing_docs)]
//! Logging context for the rerun workspace.
//!
//! Logging is set up from an explicit [`LogSettings`] value that the binary
//! builds from its configuration and hands to [`initialize`]. Nothing here is
//! initialized on first access; library crates only use the `session_*`
//! macros, which forward to the `log` facade.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use thiserror::Error;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level name is not one we know.
    #[error("undefined log level \"{0}\"")]
    UnknownLevel(String),
    /// The log file could not be created.
    #[error("could not create log file at {path:?}: {source}")]
    File {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },
    /// A global logger was already installed.
    #[error("a logger is already installed")]
    AlreadyInitialized,
}

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the terminal.
    Terminal,
    /// Write to the given file, truncating it.
    File(PathBuf),
    /// Write to both the terminal and the given file.
    Both(PathBuf),
}

/// Everything needed to install the process logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Maximum level that is emitted.
    pub level: LevelFilter,
    /// Where records go.
    pub destination: LogDestination,
    /// Prefix records with an RFC 3339 timestamp instead of the local clock time.
    pub time_format_rfc3339: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            destination: LogDestination::Terminal,
            time_format_rfc3339: true,
        }
    }
}

/// Parses a level name such as `"info"` or `"WARNING"`.
///
/// `critical` is accepted and maps to [`LevelFilter::Error`], the most severe
/// level the `log` facade has.
pub fn parse_level(name: &str) -> Result<LevelFilter, LoggingError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "critical" | "error" => Ok(LevelFilter::Error),
        "warning" | "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(LoggingError::UnknownLevel(name.to_string())),
    }
}

/// Installs the global logger described by `settings`.
///
/// Must be called once, before any session is constructed.
pub fn initialize(settings: &LogSettings) -> Result<(), LoggingError> {
    let config = build_config(settings);
    let level = settings.level;

    let loggers: Vec<Box<dyn SharedLogger>> = match &settings.destination {
        LogDestination::Terminal => vec![terminal_logger(level, config)],
        LogDestination::File(path) => vec![file_logger(level, config, path)?],
        LogDestination::Both(path) => {
            vec![
                terminal_logger(level, config.clone()),
                file_logger(level, config, path)?,
            ]
        }
    };

    CombinedLogger::init(loggers).map_err(|_| LoggingError::AlreadyInitialized)
}

fn build_config(settings: &LogSettings) -> Config {
    let mut builder = ConfigBuilder::new();
    if settings.time_format_rfc3339 {
        builder.set_time_format_rfc3339();
    }
    builder.set_target_level(LevelFilter::Error).build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn file_logger(
    level: LevelFilter,
    config: Config,
    path: &Path,
) -> Result<Box<dyn SharedLogger>, LoggingError> {
    let file = File::create(path).map_err(|source| LoggingError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(WriteLogger::new(level, config, file))
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! session_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! session_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! session_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! session_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! session_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
