//! Main entry point for the test runner binary

use clap::Parser;
use std::process::ExitCode;

use shared::{process_debug, ServiceRole};
use testrunner::{controller, CliArgs, RunOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = shared::logging::init_tracing(&args.log_level) {
        eprintln!("{e}");
        return ExitCode::from(1);
    }

    // Picks up credentials such as AWS_API_PORT or NEO4J_ENDPOINT from a local .env
    if let Err(e) = dotenv::dotenv() {
        process_debug!(ServiceRole::Runner, "No .env file loaded: {}", e);
    }

    match controller::run(args).await {
        Ok(RunOutcome::Completed) | Ok(RunOutcome::ServicesOnly) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(1),
    }
}
