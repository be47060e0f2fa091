use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use rerun_core::{RerunPayload, ScriptRequest, ScriptRequestQueue, WidgetStates};
use session_logging::{session_debug, session_info, session_warn};

use crate::{RunId, RunPhase, RunSummary, RunnerError, RunnerEvent, ScriptError};

/// Runs the user script. Supplied by the embedding application.
pub trait ScriptExecutor: Send {
    fn execute(&mut self, ctx: &mut RunContext<'_>) -> Result<RunSummary, ScriptError>;
}

/// What an executor sees of the current run.
pub struct RunContext<'a> {
    run_id: RunId,
    query_string: String,
    widget_states: WidgetStates,
    queue: &'a ScriptRequestQueue,
}

impl<'a> RunContext<'a> {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Widget states for this run, already resolved against the previous run.
    pub fn widget_states(&self) -> &WidgetStates {
        &self.widget_states
    }

    pub fn widget_states_mut(&mut self) -> &mut WidgetStates {
        &mut self.widget_states
    }

    /// True once the session has queued another request. Executors should
    /// check this at convenient points and bail out with
    /// [`ScriptError::Interrupted`].
    pub fn should_interrupt(&self) -> bool {
        self.queue.has_request()
    }
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub idle_poll_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            idle_poll_interval: Duration::from_millis(20),
        }
    }
}

pub struct RunnerHandle {
    event_rx: mpsc::Receiver<RunnerEvent>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RunnerHandle {
    pub fn try_recv(&self) -> Option<RunnerEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RunnerEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Waits for the runner thread to exit. Only returns once a shutdown
    /// request has been processed.
    pub fn join(&mut self) -> Result<(), RunnerError> {
        let thread = self.thread.take().ok_or(RunnerError::AlreadyJoined)?;
        thread.join().map_err(|_| RunnerError::Panicked)
    }
}

/// Consumer side of a [`ScriptRequestQueue`].
pub struct ScriptRunner<E> {
    queue: Arc<ScriptRequestQueue>,
    executor: E,
    settings: RunnerSettings,
    event_tx: mpsc::Sender<RunnerEvent>,
    last_widget_states: WidgetStates,
    next_run_id: RunId,
    phase: RunPhase,
}

impl<E: ScriptExecutor + 'static> ScriptRunner<E> {
    /// Starts the runner on its own thread.
    pub fn spawn(
        queue: Arc<ScriptRequestQueue>,
        executor: E,
        settings: RunnerSettings,
    ) -> Result<RunnerHandle, RunnerError> {
        let (event_tx, event_rx) = mpsc::channel();
        let runner = ScriptRunner {
            queue,
            executor,
            settings,
            event_tx,
            last_widget_states: WidgetStates::new(),
            next_run_id: 1,
            phase: RunPhase::Idle,
        };
        let thread = thread::Builder::new()
            .name("script-runner".to_string())
            .spawn(move || runner.run_loop())?;

        Ok(RunnerHandle {
            event_rx,
            thread: Some(thread),
        })
    }
}

impl<E: ScriptExecutor> ScriptRunner<E> {
    fn run_loop(mut self) {
        session_info!("Script runner started");
        loop {
            match self.queue.dequeue() {
                None => thread::sleep(self.settings.idle_poll_interval),
                Some(ScriptRequest::Stop) => {
                    session_debug!("Stop request processed while {}", self.phase);
                    self.emit(RunnerEvent::Stopped);
                }
                Some(ScriptRequest::Rerun(payload)) => self.run_script(payload),
                Some(ScriptRequest::Shutdown) => {
                    self.set_phase(RunPhase::ShuttingDown);
                    self.emit(RunnerEvent::ShutdownComplete);
                    break;
                }
            }
        }
        session_info!("Script runner exited");
    }

    fn run_script(&mut self, payload: RerunPayload) {
        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let widget_states = payload
            .widget_states
            .unwrap_or_else(|| self.last_widget_states.clone());

        self.set_phase(RunPhase::Running);
        self.emit(RunnerEvent::RunStarted {
            run_id,
            query_string: payload.query_string.clone(),
        });

        let mut ctx = RunContext {
            run_id,
            query_string: payload.query_string,
            widget_states,
            queue: &self.queue,
        };
        let result = self.executor.execute(&mut ctx);
        let widget_states = ctx.widget_states;

        let event = match result {
            Ok(summary) => RunnerEvent::RunFinished {
                run_id,
                summary,
                interrupted: false,
                widget_states: widget_states.clone(),
            },
            Err(ScriptError::Interrupted) => {
                session_debug!("Run {} interrupted", run_id);
                RunnerEvent::RunFinished {
                    run_id,
                    summary: RunSummary::default(),
                    interrupted: true,
                    widget_states: widget_states.clone(),
                }
            }
            Err(err) => {
                session_warn!("Run {} failed: {}", run_id, err);
                RunnerEvent::RunFailed {
                    run_id,
                    error: err.to_string(),
                }
            }
        };

        // Triggers only fire for the run that carried them.
        self.last_widget_states = widget_states;
        self.last_widget_states.reset_triggers();
        self.set_phase(RunPhase::Idle);
        self.emit(event);
    }

    fn set_phase(&mut self, phase: RunPhase) {
        if self.phase != phase {
            session_debug!("Script runner {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn emit(&self, event: RunnerEvent) {
        let _ = self.event_tx.send(event);
    }
}
