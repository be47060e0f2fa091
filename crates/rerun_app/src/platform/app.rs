use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use rerun_core::RerunPayload;
use rerun_engine::RunnerEvent;
use session_logging::{session_info, session_warn};

use super::config::{self, CONFIG_FILENAME};
use super::control::{parse_command, ControlCommand};
use super::session::AppSession;

const MAIN_LOOP_INTERVAL: Duration = Duration::from_millis(50);

/// `rerun_app <script> [config]`
pub fn run_app() -> anyhow::Result<()> {
    let mut args = std::env::args_os().skip(1);
    let Some(script) = args.next().map(PathBuf::from) else {
        bail!("usage: rerun_app <script> [config.ron]");
    };
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
    let script = script
        .canonicalize()
        .with_context(|| format!("script not found: {}", script.display()))?;

    // Config first, then logging, then the session.
    let config = config::load_config(&config_path)?;
    session_logging::initialize(&config.log_settings()?)
        .context("failed to initialize logging")?;
    config::log_loaded(&config_path, &config);

    let session =
        AppSession::start(script.clone(), &config).context("failed to start script runner")?;
    session_info!("Session started for {:?}", script);
    session.request_rerun(RerunPayload::default());

    let commands = spawn_stdin_reader();
    'main: loop {
        while let Ok(line) = commands.try_recv() {
            match parse_command(&line) {
                Ok(ControlCommand::Rerun(query)) => {
                    session.request_rerun(RerunPayload::with_previous_state(query));
                }
                Ok(ControlCommand::Set(states)) => {
                    let payload = RerunPayload::new(session.last_query(), Some(states));
                    session.request_rerun(payload);
                }
                Ok(ControlCommand::Stop) => session.request_stop(),
                Ok(ControlCommand::Quit) => break 'main,
                Err(err) => session_warn!("{}", err),
            }
        }

        for event in session.poll_events() {
            report(event);
        }
        thread::sleep(MAIN_LOOP_INTERVAL);
    }

    session
        .shutdown()
        .context("script runner did not shut down cleanly")
}

/// Forwards stdin lines; closing stdin reads as `quit`.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                return;
            }
        }
        let _ = tx.send("quit".to_string());
    });
    rx
}

fn report(event: RunnerEvent) {
    let now = Utc::now().to_rfc3339();
    match event {
        RunnerEvent::RunStarted {
            run_id,
            query_string,
        } => session_info!("[{}] run {} started query={:?}", now, run_id, query_string),
        RunnerEvent::RunFinished {
            run_id,
            summary,
            interrupted,
            widget_states,
        } => {
            session_info!(
                "[{}] run {} {} ({} widget state(s), {} sourced module(s))",
                now,
                run_id,
                if interrupted { "interrupted" } else { "finished" },
                widget_states.len(),
                summary.loaded_modules.len()
            );
            print!("{}", summary.output);
        }
        RunnerEvent::RunFailed { run_id, error } => {
            session_warn!("[{}] run {} failed: {}", now, run_id, error)
        }
        RunnerEvent::Stopped => session_info!("[{}] stopped", now),
        RunnerEvent::ShutdownComplete => session_info!("[{}] runner shut down", now),
    }
}
