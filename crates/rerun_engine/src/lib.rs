//! Rerun engine: the script runner loop and the sources it watches.
mod cache;
mod runner;
mod types;
mod watcher;

pub use cache::{CacheError, ScriptCache};
pub use runner::{RunContext, RunnerHandle, RunnerSettings, ScriptExecutor, ScriptRunner};
pub use types::{
    LoadedModule, RunId, RunPhase, RunSummary, RunnerError, RunnerEvent, ScriptError,
};
pub use watcher::{
    file_is_in_folder_glob, FileChangeCallback, FolderBlacklist, LocalSourcesWatcher,
    WatchedModule, DEFAULT_FOLDER_BLACKLIST,
};
