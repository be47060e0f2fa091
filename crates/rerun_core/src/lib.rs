//! Rerun core: the script request queue and widget-state coalescing.
mod merge;
mod queue;
mod request;
mod widget;

pub use merge::{coalesce_widget_states, LatestValueMerger, WidgetStateMerger};
pub use queue::ScriptRequestQueue;
pub use request::{EnqueueOutcome, RequestKind, RerunPayload, ScriptRequest};
pub use widget::{WidgetId, WidgetStates, WidgetValue};
