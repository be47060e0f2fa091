mod app;
mod config;
mod control;
mod executor;
mod poller;
mod session;

pub use app::run_app;
