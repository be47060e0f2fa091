use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glob::Pattern;
use session_logging::{session_debug, session_error, session_warn};

use crate::{LoadedModule, ScriptCache};

/// Folders that are never watched, on top of any user-supplied entries.
pub const DEFAULT_FOLDER_BLACKLIST: &[&str] = &[
    "**/.*",
    "**/anaconda",
    "**/anaconda2",
    "**/anaconda3",
    "**/dist-packages",
    "**/miniconda",
    "**/miniconda2",
    "**/miniconda3",
    "**/node_modules",
    "**/pyenv",
    "**/site-packages",
    "**/venv",
    "**/virtualenv",
];

/// Tests whether `file` lives somewhere under `folder_glob`.
///
/// The glob gets `/*` appended unless it already ends in `*`, and is matched
/// against the file's directory with a trailing `/`, so files in nested
/// subfolders match too. Invalid globs never match.
pub fn file_is_in_folder_glob(file: &Path, folder_glob: &str) -> bool {
    folder_pattern(folder_glob).is_some_and(|pattern| file_in_folder(file, &pattern))
}

fn folder_pattern(folder_glob: &str) -> Option<Pattern> {
    let mut glob = folder_glob.to_string();
    if !glob.ends_with('*') {
        glob.push_str(if glob.ends_with('/') { "*" } else { "/*" });
    }
    match Pattern::new(&glob) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            session_warn!("Ignoring invalid folder glob {:?}: {}", folder_glob, err);
            None
        }
    }
}

fn file_in_folder(file: &Path, pattern: &Pattern) -> bool {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    let dir = format!("{}/", dir.to_string_lossy());
    pattern.matches(&dir)
}

#[derive(Debug, Clone)]
pub struct FolderBlacklist {
    patterns: Vec<Pattern>,
}

impl FolderBlacklist {
    /// Builds a blacklist from user globs plus [`DEFAULT_FOLDER_BLACKLIST`].
    pub fn new<I, S>(folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = folders
            .into_iter()
            .map(|folder| folder.as_ref().to_string())
            .chain(DEFAULT_FOLDER_BLACKLIST.iter().map(|s| s.to_string()))
            .filter_map(|folder| folder_pattern(&folder))
            .collect();
        Self { patterns }
    }

    pub fn is_blacklisted(&self, file: &Path) -> bool {
        self.patterns
            .iter()
            .any(|pattern| file_in_folder(file, pattern))
    }
}

impl Default for FolderBlacklist {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedModule {
    /// `None` only for the main script.
    pub module_name: Option<String>,
}

pub type FileChangeCallback = Box<dyn Fn() + Send>;

/// Keeps track of which source files a session depends on and reacts when
/// the embedding application reports that one of them changed.
pub struct LocalSourcesWatcher {
    main_script: PathBuf,
    script_folder: PathBuf,
    extra_roots: Vec<PathBuf>,
    blacklist: FolderBlacklist,
    cache: ScriptCache,
    watched: BTreeMap<PathBuf, WatchedModule>,
    callbacks: Vec<FileChangeCallback>,
    closed: bool,
}

impl LocalSourcesWatcher {
    pub fn new(main_script: PathBuf, blacklist: FolderBlacklist, cache: ScriptCache) -> Self {
        let script_folder = main_script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut watcher = Self {
            main_script: main_script.clone(),
            script_folder,
            extra_roots: Vec::new(),
            blacklist,
            cache,
            watched: BTreeMap::new(),
            callbacks: Vec::new(),
            closed: false,
        };
        watcher.register(main_script, None);
        watcher
    }

    /// Directories outside the script folder whose files are also watched.
    pub fn with_extra_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.extra_roots = roots;
        self
    }

    pub fn main_script(&self) -> &Path {
        &self.main_script
    }

    pub fn register_file_change_callback(&mut self, callback: FileChangeCallback) {
        self.callbacks.push(callback);
    }

    pub fn on_file_changed(&self, path: &Path) {
        if !self.watched.contains_key(path) {
            session_error!("Received event for non-watched file: {:?}", path);
            return;
        }

        self.cache.invalidate_all();
        for callback in &self.callbacks {
            callback();
        }
    }

    /// Starts watching any new files the last run loaded.
    pub fn update_watched_modules<'m, I>(&mut self, modules: I)
    where
        I: IntoIterator<Item = &'m LoadedModule>,
    {
        if self.closed {
            return;
        }

        for module in modules {
            for path in &module.paths {
                if self.blacklist.is_blacklisted(path) || !self.should_watch(path) {
                    continue;
                }
                self.register(path.clone(), Some(module.name.clone()));
            }
        }
    }

    pub fn deregister(&mut self, path: &Path) {
        if path == self.main_script {
            return;
        }
        if self.watched.remove(path).is_some() {
            session_debug!("Stopped watching {:?}", path);
        }
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched.keys().cloned().collect()
    }

    pub fn watched_module(&self, path: &Path) -> Option<&WatchedModule> {
        self.watched.get(path)
    }

    pub fn close(&mut self) {
        self.watched.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn should_watch(&self, path: &Path) -> bool {
        !self.watched.contains_key(path)
            && (path.starts_with(&self.script_folder)
                || self.extra_roots.iter().any(|root| path.starts_with(root)))
    }

    fn register(&mut self, path: PathBuf, module_name: Option<String>) {
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::PermissionDenied => return,
            Err(err) => {
                session_warn!("Not watching {:?}: {}", path, err);
                return;
            }
        }
        session_debug!("Watching {:?} (module {:?})", path, module_name);
        self.watched.insert(path, WatchedModule { module_name });
    }
}
