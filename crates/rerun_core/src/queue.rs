use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use session_logging::session_debug;

use crate::{
    EnqueueOutcome, LatestValueMerger, RequestKind, RerunPayload, ScriptRequest, WidgetStateMerger,
};

/// Thread-safe mailbox from the session to its script runner.
///
/// Any number of threads may enqueue; a single runner thread dequeues.
/// Requests are coalesced on the way in:
/// - `Shutdown` jumps to the front of the queue.
/// - There is never more than one pending `Rerun`; a new one is folded into it.
/// - `Stop` is appended in order.
pub struct ScriptRequestQueue {
    requests: Mutex<VecDeque<ScriptRequest>>,
    merger: Box<dyn WidgetStateMerger>,
}

impl ScriptRequestQueue {
    pub fn new() -> Self {
        Self::with_merger(Box::new(LatestValueMerger))
    }

    pub fn with_merger(merger: Box<dyn WidgetStateMerger>) -> Self {
        Self {
            requests: Mutex::new(VecDeque::new()),
            merger,
        }
    }

    /// True if the queue holds at least one request.
    pub fn has_request(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_request()
    }

    /// Kinds of the pending requests, front first, taken under a single lock.
    pub fn pending_kinds(&self) -> Vec<RequestKind> {
        self.lock().iter().map(ScriptRequest::kind).collect()
    }

    /// Adds a request, possibly coalescing it with one already pending.
    pub fn enqueue(&self, request: ScriptRequest) -> EnqueueOutcome {
        let mut requests = self.lock();
        match request {
            ScriptRequest::Shutdown => {
                session_debug!(
                    "Shutdown request preempts {} pending request(s)",
                    requests.len()
                );
                requests.push_front(ScriptRequest::Shutdown);
                EnqueueOutcome::Preempted
            }
            ScriptRequest::Rerun(payload) => self.enqueue_rerun(&mut requests, payload),
            ScriptRequest::Stop => {
                requests.push_back(ScriptRequest::Stop);
                EnqueueOutcome::Appended
            }
        }
    }

    fn enqueue_rerun(
        &self,
        requests: &mut VecDeque<ScriptRequest>,
        payload: RerunPayload,
    ) -> EnqueueOutcome {
        let existing = requests.iter_mut().find_map(|request| match request {
            ScriptRequest::Rerun(existing) => Some(existing),
            _ => None,
        });

        let Some(existing) = existing else {
            session_debug!("Rerun request appended");
            requests.push_back(ScriptRequest::Rerun(payload));
            return EnqueueOutcome::Appended;
        };

        let (widget_states, outcome) =
            match (existing.widget_states.as_ref(), payload.widget_states) {
                // The pending rerun wants "whatever the last run had", so there is
                // nothing to merge with: the new request replaces it outright.
                (None, new_states) => {
                    session_debug!("Pending rerun replaced");
                    (new_states, EnqueueOutcome::Replaced)
                }
                (Some(old_states), Some(new_states)) => {
                    session_debug!("Pending rerun merged with new widget states");
                    (
                        Some(self.merger.merge(old_states, &new_states)),
                        EnqueueOutcome::Merged,
                    )
                }
                // Redundant: the pending rerun already carries concrete state.
                // The new query string is dropped along with the request.
                (Some(_), None) => {
                    session_debug!("Rerun request without widget states dropped");
                    return EnqueueOutcome::Dropped;
                }
            };

        *existing = RerunPayload {
            query_string: payload.query_string,
            widget_states,
        };
        outcome
    }

    /// Removes and returns the front-most request, or `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<ScriptRequest> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ScriptRequest>> {
        // Every critical section leaves the deque consistent, so a panic
        // elsewhere while holding the lock does not invalidate it.
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ScriptRequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptRequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRequestQueue")
            .field("requests", &*self.lock())
            .finish_non_exhaustive()
    }
}
