//! Python-suite strategies

use async_trait::async_trait;
use std::path::Path;

use super::common::{self, DISCOVERY_FILTER};
use super::{RunOutcome, StrategyKind, TestStrategy};
use crate::config::{EnvSource, RunConfiguration};
use crate::context::RunContext;
use crate::error::RunnerResult;

pub const NON_REMOTE_CONFIG_FILES: [&str; 2] = ["python/config-tests.json", "python/config-tls-tests.json"];
pub const REMOTE_CONFIG_FILES: [&str; 2] = ["python/config-aws-tests.json", "python/config-tls-aws-tests.json"];

/// Tells the Python suite to skip cases needing a second remote server
pub const SKIP_REMOTE_ENV: &str = "VDMS_SKIP_REMOTE_PYTHON_TESTS";

fn inherited_path() -> Option<String> {
    std::env::var("PYTHONPATH").ok()
}

/// Python client tests against local servers (`pt`)
pub struct NonRemoteInterpreted;

#[async_trait]
impl TestStrategy for NonRemoteInterpreted {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NonRemoteInterpreted
    }

    fn validate(&self, config: &RunConfiguration) -> RunnerResult<()> {
        common::validate_server_values(config)?;
        common::validate_compiled_binary(config)
    }

    fn resolve_defaults(&self, config: &mut RunConfiguration, cwd: &Path, _env: &dyn EnvSource) -> RunnerResult<()> {
        common::fill_test_filter(config, DISCOVERY_FILTER);
        common::fill_server_values(config, cwd, &NON_REMOTE_CONFIG_FILES)
    }

    async fn execute(&self, config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
        common::set_interpreter_path(config, ctx, inherited_path())?;
        common::prep_certs(config, ctx).await?;
        common::start_servers(config, ctx).await?;
        common::run_interpreted_suite(config, ctx).await
    }
}

/// Python client tests against local servers backed by the object store (`rp`)
pub struct RemoteInterpreted;

#[async_trait]
impl TestStrategy for RemoteInterpreted {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RemoteInterpreted
    }

    fn validate(&self, config: &RunConfiguration) -> RunnerResult<()> {
        common::validate_object_store(config)?;
        common::validate_server_values(config)?;
        common::validate_compiled_binary(config)
    }

    fn resolve_defaults(&self, config: &mut RunConfiguration, cwd: &Path, env: &dyn EnvSource) -> RunnerResult<()> {
        common::fill_test_filter(config, DISCOVERY_FILTER);
        common::fill_server_values(config, cwd, &REMOTE_CONFIG_FILES)?;
        common::fill_object_store(config, env)
    }

    async fn execute(&self, config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
        common::set_interpreter_path(config, ctx, inherited_path())?;
        common::prep_certs(config, ctx).await?;
        common::start_servers(config, ctx).await?;
        common::start_object_store(config, ctx).await?;
        ctx.set_env(SKIP_REMOTE_ENV, "True");
        common::run_interpreted_suite(config, ctx).await
    }
}
