use crate::WidgetStates;

/// The three kinds of control request a session can send to its runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Interrupt the current run but keep the runner alive.
    Stop,
    /// Run the script again.
    Rerun,
    /// Stop any current run and terminate the runner.
    Shutdown,
}

/// Data attached to a rerun request. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RerunPayload {
    pub query_string: String,
    /// `None` means "rerun with whatever state the previous run ended with",
    /// which is not the same as an empty state.
    pub widget_states: Option<WidgetStates>,
}

impl RerunPayload {
    pub fn new(query_string: impl Into<String>, widget_states: Option<WidgetStates>) -> Self {
        Self {
            query_string: query_string.into(),
            widget_states,
        }
    }

    /// A rerun that keeps the previous run's widget state.
    pub fn with_previous_state(query_string: impl Into<String>) -> Self {
        Self::new(query_string, None)
    }
}

/// An entry in the [`ScriptRequestQueue`](crate::ScriptRequestQueue).
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptRequest {
    Stop,
    Rerun(RerunPayload),
    Shutdown,
}

impl ScriptRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ScriptRequest::Stop => RequestKind::Stop,
            ScriptRequest::Rerun(_) => RequestKind::Rerun,
            ScriptRequest::Shutdown => RequestKind::Shutdown,
        }
    }

    pub fn is_rerun(&self) -> bool {
        matches!(self, ScriptRequest::Rerun(_))
    }
}

/// What [`ScriptRequestQueue::enqueue`](crate::ScriptRequestQueue::enqueue)
/// did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Added at the back of the queue.
    Appended,
    /// Shutdown placed at the front.
    Preempted,
    /// Took the place of a pending rerun that had no widget states.
    Replaced,
    /// Folded into a pending rerun by merging widget states.
    Merged,
    /// Discarded: a pending rerun already carries concrete widget states.
    Dropped,
}

impl EnqueueOutcome {
    /// True if the request's query string now drives the next run.
    pub fn is_kept(self) -> bool {
        !matches!(self, EnqueueOutcome::Dropped)
    }
}
