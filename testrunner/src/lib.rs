//! Test runner library for driving the database test suites
//!
//! Resolves a run configuration from the command line and an optional JSON
//! file, prepares a disposable scratch tree, starts the auxiliary services a
//! suite needs, runs the suite, and always tears everything down again.

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod services;
pub mod signals;
pub mod strategy;
pub mod traits;

// Re-export commonly used types
pub use config::{ArgumentResolver, CliArgs, ResolvedRun, RunConfiguration};
pub use context::RunContext;
pub use strategy::RunOutcome;
pub use error::{RunnerError, RunnerResult};
pub use strategy::{GraphSubKind, StrategyKind, TestStrategy};
pub use traits::{Completion, KillReport, LaunchSpec, MockSupervisor, OutputSink, Readiness, Supervisor};
