//! Top-level run control
//!
//! resolve → prepare scratch → strategy → (wait for a signal when the tests
//! are skipped) → teardown. Teardown runs on every path once a context exists.

use clap::error::ErrorKind;
use clap::CommandFactory;
use std::future::Future;
use tracing::Instrument;

use crate::config::{ArgumentResolver, CliArgs, ProcessEnv, ResolvedRun};
use crate::context::RunContext;
use crate::error::{RunnerError, RunnerResult};
use crate::signals::SignalListener;
use crate::strategy::RunOutcome;
use shared::{logging, process_info, process_warn, ServiceRole};

/// Run the whole pipeline for parsed command line arguments
pub async fn run(args: CliArgs) -> RunnerResult<RunOutcome> {
    let mut signals = SignalListener::install()?;
    let cwd = std::env::current_dir()?;

    let resolver = ArgumentResolver::new(cwd, &ProcessEnv);
    let resolved = match resolver.resolve(args.to_run_configuration(), args.json.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            if e.is_usage_error() {
                report_usage_error(&e);
            }
            return Err(e);
        }
    };

    let mut ctx = RunContext::for_config(&resolved.config)?;
    let span = tracing::info_span!("run", id = %ctx.run_id(), kind = %resolved.kind);
    supervise(&resolved, &mut ctx, signals.next_terminating())
        .instrument(span)
        .await
}

fn usage_error(error: &RunnerError) -> clap::Error {
    CliArgs::command().error(ErrorKind::ValueValidation, error)
}

/// Print a usage error the way clap prints its own parse errors
pub fn report_usage_error(error: &RunnerError) {
    if let Err(e) = usage_error(error).print() {
        process_warn!(ServiceRole::Runner, "Could not print usage error ({}): {}", e, error);
    }
}

/// Prepare the scratch tree and hand over to the selected strategy
pub async fn execute_run(resolved: &ResolvedRun, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
    logging::log_run_started(&ctx.run_id(), &resolved.kind);
    ctx.prepare_scratch(&resolved.config).await?;
    resolved.kind.strategy().execute(&resolved.config, ctx).await
}

/// Execute a resolved run until it finishes or `shutdown` fires, then tear down
///
/// When the tests are skipped the services stay up until `shutdown` fires.
/// The first error wins; a teardown failure is reported only when the run
/// itself succeeded.
pub async fn supervise<F>(resolved: &ResolvedRun, ctx: &mut RunContext, shutdown: F) -> RunnerResult<RunOutcome>
where
    F: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);

    let result = tokio::select! {
        result = execute_run(resolved, ctx) => result,
        signal = &mut shutdown => Err(RunnerError::Interrupted { signal: signal.to_string() }),
    };

    let result = match result {
        Ok(RunOutcome::ServicesOnly) => {
            process_info!(
                ServiceRole::Runner,
                "Services are up and the tests were skipped; press Ctrl+C to stop them"
            );
            let signal = (&mut shutdown).await;
            logging::log_signal(signal);
            Ok(RunOutcome::ServicesOnly)
        }
        Err(RunnerError::Interrupted { signal }) => {
            logging::log_signal(&signal);
            Err(RunnerError::Interrupted { signal })
        }
        other => other,
    };

    if let Err(e) = &result {
        logging::log_run_failed(e);
    }

    let teardown = ctx.teardown().await;
    match (result, teardown) {
        (Ok(outcome), Ok(())) => {
            logging::log_run_finished(outcome == RunOutcome::Completed);
            Ok(outcome)
        }
        (Ok(_), Err(e)) => {
            logging::log_teardown_failed(&e);
            Err(e)
        }
        (Err(e), teardown) => {
            if let Err(cleanup) = teardown {
                process_warn!(ServiceRole::Runner, "Teardown also failed: {}", cleanup);
            }
            Err(e)
        }
    }
}
