//! Graph-database strategy
//!
//! One test type covers three suites. Which one runs, and so which
//! collaborators are needed, is decided by the test filter's prefix.

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::common;
use super::{RunOutcome, StrategyKind, TestStrategy};
use crate::config::{EnvSource, RunConfiguration};
use crate::context::RunContext;
use crate::error::{RunnerError, RunnerResult};
use shared::{process_info, ServiceRole};

pub const DEFAULT_FILTER: &str = "OpsIOCoordinatorTest.*";
pub const INFRA_CONFIG_FILES: [&str; 1] = ["unit_tests/config-aws-tests.json"];
pub const END_TO_END_CONFIG_FILES: [&str; 1] = ["unit_tests/config-neo4j-e2e.json"];

pub const INFRA_ALIAS: &str = "opsio_tester";
pub const END_TO_END_ALIAS: &str = "e2e_tester";

/// The graph suite selected by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphSubKind {
    /// Coordinator tests against the object store
    InfraCoordinator,
    /// Object store, graph database and servers together
    EndToEnd,
    /// Graph database backend only
    BackendOnly,
}

impl GraphSubKind {
    fn patterns() -> &'static [(GraphSubKind, Regex)] {
        static PATTERNS: OnceLock<Vec<(GraphSubKind, Regex)>> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            [
                (GraphSubKind::InfraCoordinator, "OpsIOCoordinatorTest"),
                (GraphSubKind::EndToEnd, "Neo4JE2ETest"),
                (GraphSubKind::BackendOnly, "Neo4jBackendTest"),
            ]
            .into_iter()
            .filter_map(|(kind, suite)| {
                Regex::new(&format!(r"^{suite}\.|^'{suite}\.[^']+'"))
                    .ok()
                    .map(|pattern| (kind, pattern))
            })
            .collect()
        })
    }
}

/// Map a test filter to the graph suite it selects
pub fn classify(filter: &str) -> Option<GraphSubKind> {
    GraphSubKind::patterns()
        .iter()
        .find(|(_, pattern)| pattern.is_match(filter))
        .map(|(kind, _)| *kind)
}

fn sub_kind(config: &RunConfiguration) -> RunnerResult<GraphSubKind> {
    config
        .test_filter()
        .and_then(classify)
        .ok_or_else(|| RunnerError::validation("test_name", "invalid test filter"))
}

/// Graph-database googletest suites (`neo`)
pub struct GraphBackend;

#[async_trait]
impl TestStrategy for GraphBackend {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GraphBackend
    }

    fn validate(&self, config: &RunConfiguration) -> RunnerResult<()> {
        match sub_kind(config)? {
            GraphSubKind::InfraCoordinator => common::validate_object_store(config)?,
            GraphSubKind::EndToEnd => {
                common::validate_object_store(config)?;
                common::validate_graph_db(config)?;
                common::validate_server_values(config)?;
            }
            GraphSubKind::BackendOnly => common::validate_graph_db(config)?,
        }
        common::validate_compiled_binary(config)
    }

    fn resolve_defaults(&self, config: &mut RunConfiguration, cwd: &Path, env: &dyn EnvSource) -> RunnerResult<()> {
        common::fill_test_filter(config, DEFAULT_FILTER);
        common::fill_compiled_binary(config)?;
        match sub_kind(config)? {
            GraphSubKind::InfraCoordinator => {
                common::fill_server_values(config, cwd, &INFRA_CONFIG_FILES)?;
                common::fill_object_store(config, env)?;
                config.minio_alias_name = Some(INFRA_ALIAS.to_string());
            }
            GraphSubKind::EndToEnd => {
                common::fill_server_values(config, cwd, &END_TO_END_CONFIG_FILES)?;
                common::fill_object_store(config, env)?;
                common::fill_graph_db(config, env)?;
                config.minio_alias_name = Some(END_TO_END_ALIAS.to_string());
            }
            GraphSubKind::BackendOnly => {
                config.config_files_for_vdms = Some(Vec::new());
                common::fill_graph_db(config, env)?;
            }
        }
        Ok(())
    }

    async fn execute(&self, config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
        let suite = sub_kind(config)?;
        process_info!(ServiceRole::Runner, "Graph suite: {:?}", suite);
        match suite {
            GraphSubKind::InfraCoordinator => {
                common::start_object_store(config, ctx).await?;
            }
            GraphSubKind::EndToEnd => {
                common::start_object_store(config, ctx).await?;
                common::export_graph_db_env(config, ctx)?;
                common::start_servers(config, ctx).await?;
            }
            GraphSubKind::BackendOnly => {
                common::export_graph_db_env(config, ctx)?;
            }
        }
        common::run_compiled_binary(config, ctx).await
    }
}
