//! Test strategies
//!
//! One strategy per test type. Each knows which collaborators its suite
//! needs, how to fill their defaults, how to validate them, and how to start
//! them before running the suite.

pub mod common;
pub mod compiled;
pub mod graph;
pub mod interpreted;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::config::{EnvSource, RunConfiguration};
use crate::context::RunContext;
use crate::error::RunnerResult;

pub use compiled::{NonRemoteCompiled, RemoteCompiled};
pub use graph::{classify, GraphBackend, GraphSubKind};
pub use interpreted::{NonRemoteInterpreted, RemoteInterpreted};

/// Which test suite to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
pub enum StrategyKind {
    /// Non-remote googletest suite
    #[serde(rename = "ut")]
    #[value(name = "ut")]
    NonRemoteCompiled,
    /// Remote googletest suite against the object store
    #[serde(rename = "ru")]
    #[value(name = "ru")]
    RemoteCompiled,
    /// Non-remote Python suite
    #[serde(rename = "pt")]
    #[value(name = "pt")]
    NonRemoteInterpreted,
    /// Remote Python suite against the object store
    #[serde(rename = "rp")]
    #[value(name = "rp")]
    RemoteInterpreted,
    /// Graph-database googletest suites
    #[serde(rename = "neo")]
    #[value(name = "neo")]
    GraphBackend,
}

impl StrategyKind {
    /// The single dispatch site from test type to strategy
    pub fn strategy(self) -> Box<dyn TestStrategy> {
        match self {
            StrategyKind::NonRemoteCompiled => Box::new(NonRemoteCompiled),
            StrategyKind::RemoteCompiled => Box::new(RemoteCompiled),
            StrategyKind::NonRemoteInterpreted => Box::new(NonRemoteInterpreted),
            StrategyKind::RemoteInterpreted => Box::new(RemoteInterpreted),
            StrategyKind::GraphBackend => Box::new(GraphBackend),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            StrategyKind::NonRemoteCompiled => "ut",
            StrategyKind::RemoteCompiled => "ru",
            StrategyKind::NonRemoteInterpreted => "pt",
            StrategyKind::RemoteInterpreted => "rp",
            StrategyKind::GraphBackend => "neo",
        }
    }

    /// Suites driven by the googletest binary
    pub fn uses_compiled_binary(self) -> bool {
        !matches!(self, StrategyKind::NonRemoteInterpreted | StrategyKind::RemoteInterpreted)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// How a run ended when no error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The suite ran and passed
    Completed,
    /// Services were started but the suite was skipped on request
    ServicesOnly,
}

/// Per-test-type behavior
#[async_trait]
pub trait TestStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Check the merged configuration before any default is filled
    fn validate(&self, config: &RunConfiguration) -> RunnerResult<()>;

    /// Fill this strategy's defaults; only unset fields change
    fn resolve_defaults(&self, config: &mut RunConfiguration, cwd: &Path, env: &dyn EnvSource) -> RunnerResult<()>;

    /// Start the collaborators and run the suite
    async fn execute(&self, config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome>;
}
