use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use rerun_engine::LocalSourcesWatcher;
use session_logging::{session_debug, session_info};

/// Remembers the last seen modification time of each path.
#[derive(Debug, Default)]
pub struct MtimeTracker {
    seen: HashMap<PathBuf, SystemTime>,
}

impl MtimeTracker {
    /// Returns the paths whose modification time moved since the previous
    /// call. Paths seen for the first time are recorded, not reported.
    pub fn changed(&mut self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for path in paths {
            let Ok(modified) = fs::metadata(path).and_then(|meta| meta.modified()) else {
                continue;
            };
            match self.seen.insert(path.clone(), modified) {
                Some(previous) if previous != modified => changed.push(path.clone()),
                _ => {}
            }
        }
        self.seen.retain(|path, _| paths.contains(path));
        changed
    }
}

/// Background thread feeding file changes into a [`LocalSourcesWatcher`].
pub struct ChangePoller {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ChangePoller {
    pub fn spawn(watcher: Arc<Mutex<LocalSourcesWatcher>>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut tracker = MtimeTracker::default();
                while !stop.load(Ordering::Relaxed) {
                    let watcher = watcher.lock().unwrap_or_else(|p| p.into_inner());
                    if watcher.is_closed() {
                        break;
                    }
                    for path in tracker.changed(&watcher.watched_paths()) {
                        session_info!("Source changed: {:?}", path);
                        watcher.on_file_changed(&path);
                    }
                    drop(watcher);
                    thread::sleep(interval);
                }
                session_debug!("Change poller exited");
            })
        };
        Self {
            stop,
            thread: Some(thread),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ChangePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
