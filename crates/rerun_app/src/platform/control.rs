use rerun_core::WidgetStates;
use thiserror::Error;

/// A line typed on stdin.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// `rerun [query]`: rerun keeping the previous widget state.
    Rerun(String),
    /// `set <json>`: rerun with the given widget states.
    Set(WidgetStates),
    Stop,
    Quit,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("invalid widget states: {0}")]
    InvalidStates(#[from] serde_json::Error),
}

pub fn parse_command(line: &str) -> Result<ControlCommand, ControlError> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));

    match word {
        "" => Err(ControlError::Empty),
        "rerun" | "r" => Ok(ControlCommand::Rerun(rest.to_string())),
        "set" => Ok(ControlCommand::Set(serde_json::from_str(rest)?)),
        "stop" => Ok(ControlCommand::Stop),
        "quit" | "exit" => Ok(ControlCommand::Quit),
        other => Err(ControlError::Unknown(other.to_string())),
    }
}
