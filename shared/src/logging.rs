//! Shared logging utilities for consistent tracing across the runner and its helpers

use crate::errors::{SharedError, SharedResult};
use crate::types::ServiceRole;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::path::Path;
use tracing::{error, info, warn};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Build the tracing filter directive for a log level
///
/// `RUST_LOG` still takes precedence when it is set.
pub fn filter_directive(log_level: &str) -> SharedResult<String> {
    let level = log_level.to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(SharedError::InvalidConfig {
            field: "log_level".to_string(),
            value: log_level.to_string(),
        });
    }
    Ok(format!("testrunner={level},shared={level},reqwest=warn,hyper=warn"))
}

/// Initialize tracing subscriber for a runner process
pub fn init_tracing(log_level: &str) -> SharedResult<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let directive = filter_directive(log_level)?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| SharedError::TracingInit { message: e.to_string() })
}

/// Wall-clock time of day attached to every role-tagged event
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Emit an event at `$level` tagged with the service role it concerns
#[doc(hidden)]
#[macro_export]
macro_rules! role_event {
    ($level:ident, $role:expr, $($arg:tt)*) => {
        tracing::$level!(
            role = %$role,
            at = $crate::logging::format_timestamp(),
            $($arg)*
        )
    };
}

#[macro_export]
macro_rules! process_info {
    ($role:expr, $($arg:tt)*) => { $crate::role_event!(info, $role, $($arg)*) };
}

#[macro_export]
macro_rules! process_warn {
    ($role:expr, $($arg:tt)*) => { $crate::role_event!(warn, $role, $($arg)*) };
}

#[macro_export]
macro_rules! process_error {
    ($role:expr, $($arg:tt)*) => { $crate::role_event!(error, $role, $($arg)*) };
}

#[macro_export]
macro_rules! process_debug {
    ($role:expr, $($arg:tt)*) => { $crate::role_event!(debug, $role, $($arg)*) };
}

/// A run of the given test type begins
pub fn log_run_started(run_id: &dyn Display, kind: &dyn Display) {
    info!(role = %ServiceRole::Runner, at = format_timestamp(), %run_id, "▶ {} tests starting", kind);
}

pub fn log_scratch_ready(dir: &Path, service_configs: usize) {
    info!(
        role = %ServiceRole::Runner,
        at = format_timestamp(),
        "📁 scratch dir {} ready with {} service config(s)",
        dir.display(),
        service_configs
    );
}

/// A terminating signal ends the run and its services
pub fn log_signal(signal: &str) {
    warn!(role = %ServiceRole::Runner, at = format_timestamp(), %signal, "⏹ {} received, stopping services", signal);
}

pub fn log_run_failed(error: &dyn Display) {
    error!(role = %ServiceRole::Runner, at = format_timestamp(), error = %error, "✗ run failed: {}", error);
}

pub fn log_teardown_failed(error: &dyn Display) {
    error!(role = %ServiceRole::Runner, at = format_timestamp(), error = %error, "✗ cleanup failed: {}", error);
}

/// Every service is stopped and the scratch dir handled
pub fn log_run_finished(tests_ran: bool) {
    let summary = if tests_ran { "tests passed" } else { "tests skipped" };
    info!(role = %ServiceRole::Runner, at = format_timestamp(), "✓ {}, services stopped", summary);
}

pub fn log_suite_passed(step: &str) {
    info!(role = %ServiceRole::TestDriver, at = format_timestamp(), "✓ {} passed", step);
}

/// A one-shot set-up step owned by `role` finished
pub fn log_step_done(role: &ServiceRole, step: &str) {
    info!(role = %role, at = format_timestamp(), "✓ {}", step);
}
