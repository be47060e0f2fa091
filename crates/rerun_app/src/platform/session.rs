use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rerun_core::{EnqueueOutcome, RerunPayload, ScriptRequest, ScriptRequestQueue};
use rerun_engine::{
    FolderBlacklist, LocalSourcesWatcher, RunnerError, RunnerEvent, RunnerHandle,
    RunnerSettings, ScriptCache, ScriptExecutor, ScriptRunner,
};
use session_logging::{session_debug, session_info};

use super::config::SessionConfig;
use super::executor::CommandExecutor;
use super::poller::ChangePoller;

/// Controller side of a session: the only producer of script requests apart
/// from the file-change callback it installs.
pub struct AppSession {
    queue: Arc<ScriptRequestQueue>,
    runner: RunnerHandle,
    watcher: Arc<Mutex<LocalSourcesWatcher>>,
    last_query: Arc<Mutex<String>>,
    poller: Option<ChangePoller>,
}

impl AppSession {
    pub fn start(script: PathBuf, config: &SessionConfig) -> Result<Self, RunnerError> {
        let cache = ScriptCache::new();
        let executor = CommandExecutor::new(script.clone(), cache.clone());
        let mut session = Self::with_executor(script, config, cache, executor)?;
        session.poller = Some(ChangePoller::spawn(
            Arc::clone(&session.watcher),
            config.file_poll_interval(),
        ));
        Ok(session)
    }

    /// Builds a session without the background change poller; file changes
    /// are delivered through [`AppSession::watcher`].
    pub fn with_executor<E: ScriptExecutor + 'static>(
        script: PathBuf,
        config: &SessionConfig,
        cache: ScriptCache,
        executor: E,
    ) -> Result<Self, RunnerError> {
        let queue = Arc::new(ScriptRequestQueue::new());
        let last_query = Arc::new(Mutex::new(String::new()));

        let blacklist = FolderBlacklist::new(&config.folder_watch_blacklist);
        let mut watcher = LocalSourcesWatcher::new(script, blacklist, cache)
            .with_extra_roots(config.extra_search_paths.clone());
        if config.run_on_save {
            let queue = Arc::clone(&queue);
            let last_query = Arc::clone(&last_query);
            watcher.register_file_change_callback(Box::new(move || {
                let query = lock(&last_query).clone();
                session_debug!("Source change requested a rerun");
                queue.enqueue(ScriptRequest::Rerun(RerunPayload::with_previous_state(
                    query,
                )));
            }));
        }

        let settings = RunnerSettings {
            idle_poll_interval: config.idle_poll_interval(),
        };
        let runner = ScriptRunner::spawn(Arc::clone(&queue), executor, settings)?;

        Ok(Self {
            queue,
            runner,
            watcher: Arc::new(Mutex::new(watcher)),
            last_query,
            poller: None,
        })
    }

    /// Queues a rerun. The query string is remembered for file-change reruns
    /// only if the queue kept the request.
    pub fn request_rerun(&self, payload: RerunPayload) -> EnqueueOutcome {
        let mut last_query = lock(&self.last_query);
        let query = payload.query_string.clone();
        let outcome = self.queue.enqueue(ScriptRequest::Rerun(payload));
        if outcome.is_kept() {
            *last_query = query;
        } else {
            session_debug!("Rerun for {:?} dropped, keeping {:?}", query, *last_query);
        }
        outcome
    }

    pub fn last_query(&self) -> String {
        lock(&self.last_query).clone()
    }

    pub fn request_stop(&self) {
        self.queue.enqueue(ScriptRequest::Stop);
    }

    pub fn watcher(&self) -> &Arc<Mutex<LocalSourcesWatcher>> {
        &self.watcher
    }

    /// Drains runner events, watching any modules a finished run loaded.
    pub fn poll_events(&self) -> Vec<RunnerEvent> {
        let events: Vec<_> = std::iter::from_fn(|| self.runner.try_recv()).collect();
        for event in &events {
            if let RunnerEvent::RunFinished { summary, .. } = event {
                lock(&self.watcher).update_watched_modules(&summary.loaded_modules);
            }
        }
        events
    }

    /// Sends a shutdown request and waits for the runner to exit.
    pub fn shutdown(mut self) -> Result<(), RunnerError> {
        session_info!("Shutting down session");
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.queue.enqueue(ScriptRequest::Shutdown);
        let result = self.runner.join();
        lock(&self.watcher).close();
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
