use std::fmt;
use std::path::PathBuf;

use rerun_core::WidgetStates;
use thiserror::Error;

pub type RunId = u64;

/// A module (or any other source unit) a run pulled in, with the files backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub name: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub output: String,
    pub loaded_modules: Vec<LoadedModule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    RunStarted {
        run_id: RunId,
        query_string: String,
    },
    RunFinished {
        run_id: RunId,
        summary: RunSummary,
        interrupted: bool,
        widget_states: WidgetStates,
    },
    RunFailed {
        run_id: RunId,
        error: String,
    },
    /// A stop request was processed.
    Stopped,
    ShutdownComplete,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("script failed: {message}")]
    Failed { message: String },
    #[error("script interrupted")]
    Interrupted,
}

impl ScriptError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn script runner thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("runner thread panicked")]
    Panicked,
    #[error("runner thread already joined")]
    AlreadyJoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    ShuttingDown,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Running => write!(f, "running"),
            RunPhase::ShuttingDown => write!(f, "shutting down"),
        }
    }
}
