//! Runs the session script as a shell process.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use rerun_engine::{
    LoadedModule, RunContext, RunSummary, ScriptCache, ScriptError, ScriptExecutor,
};
use session_logging::{session_debug, session_warn};

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct CommandExecutor {
    script: PathBuf,
    shell: String,
    cache: ScriptCache,
}

impl CommandExecutor {
    pub fn new(script: PathBuf, cache: ScriptCache) -> Self {
        Self {
            script,
            shell: "sh".to_string(),
            cache,
        }
    }

    fn script_dir(&self) -> PathBuf {
        self.script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Files pulled in with `source` or `.`, loaded through the cache so a
    /// change to any of them is picked up on the next run.
    fn sourced_modules(&self, source: &str) -> Vec<LoadedModule> {
        let dir = self.script_dir();
        sourced_paths(source)
            .into_iter()
            .map(|relative| dir.join(relative))
            .filter(|path| match self.cache.load(path) {
                Ok(_) => true,
                Err(err) => {
                    session_warn!("Skipping sourced file: {}", err);
                    false
                }
            })
            .map(|path| LoadedModule {
                name: path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                paths: vec![path],
            })
            .collect()
    }
}

impl ScriptExecutor for CommandExecutor {
    fn execute(&mut self, ctx: &mut RunContext<'_>) -> Result<RunSummary, ScriptError> {
        let source = self
            .cache
            .load(&self.script)
            .map_err(|err| ScriptError::failed(err.to_string()))?;
        let loaded_modules = self.sourced_modules(&source);
        let states = serde_json::to_string(ctx.widget_states())
            .map_err(|err| ScriptError::failed(err.to_string()))?;

        session_debug!(
            "Run {} executing {:?} with {} widget state(s)",
            ctx.run_id(),
            self.script,
            ctx.widget_states().len()
        );
        let mut child = Command::new(&self.shell)
            .arg(&self.script)
            .current_dir(self.script_dir())
            .env("RERUN_QUERY_STRING", ctx.query_string())
            .env("RERUN_WIDGET_STATES", states)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let output = spawn_output_reader(&mut child);

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if ctx.should_interrupt() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ScriptError::Interrupted);
            }
            thread::sleep(CHILD_POLL_INTERVAL);
        };

        let output = output
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(ScriptError::failed(format!("exited with {status}")));
        }

        Ok(RunSummary {
            output,
            loaded_modules,
        })
    }
}

fn spawn_output_reader(child: &mut Child) -> Option<thread::JoinHandle<String>> {
    let mut stdout = child.stdout.take()?;
    Some(thread::spawn(move || {
        let mut output = String::new();
        let _ = stdout.read_to_string(&mut output);
        output
    }))
}

fn sourced_paths(source: &str) -> Vec<&str> {
    source
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("source ")
                .or_else(|| line.strip_prefix(". "))
        })
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|path| path.trim_matches(['"', '\''].as_ref()))
        .filter(|path| !path.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sourced_paths_handles_both_spellings() {
        let source = "#!/bin/sh\nsource ./lib.sh\n  . \"helpers/util.sh\" arg\necho . done\n";
        assert_eq!(sourced_paths(source), vec!["./lib.sh", "helpers/util.sh"]);
    }

    #[test]
    fn sourced_modules_skip_missing_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("app.sh");
        std::fs::write(temp.path().join("lib.sh"), "X=1\n").unwrap();
        let source = "source lib.sh\nsource missing.sh\n";

        let executor = CommandExecutor::new(script, ScriptCache::new());
        let modules = executor.sourced_modules(source);

        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "lib");
        assert_eq!(modules[0].paths, vec![temp.path().join("lib.sh")]);
    }
}
