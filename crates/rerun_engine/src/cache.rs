use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use session_logging::session_debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read script source {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

#[derive(Debug, Default)]
struct CacheInner {
    generation: u64,
    sources: HashMap<PathBuf, Arc<str>>,
}

/// Script sources read during runs, shared between the runner and the
/// sources watcher.
///
/// Any watched file change drops every entry: there is no dependency graph,
/// so the next run re-reads everything from disk.
#[derive(Debug, Clone, Default)]
pub struct ScriptCache {
    inner: Arc<Mutex<CacheInner>>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached source for `path`, reading it on a miss.
    pub fn load(&self, path: &Path) -> Result<Arc<str>, CacheError> {
        if let Some(source) = self.lock().sources.get(path) {
            return Ok(Arc::clone(source));
        }

        // Read outside the lock; a concurrent invalidation just means the
        // entry we insert belongs to the newer generation.
        let text = fs::read_to_string(path).map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let source: Arc<str> = Arc::from(text);
        self.lock()
            .sources
            .insert(path.to_path_buf(), Arc::clone(&source));
        Ok(source)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().sources.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.lock().sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped by every [`invalidate_all`](Self::invalidate_all).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        session_debug!(
            "Invalidating {} cached script source(s), generation {}",
            inner.sources.len(),
            inner.generation
        );
        inner.sources.clear();
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
