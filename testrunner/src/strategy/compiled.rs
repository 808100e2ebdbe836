//! googletest-driven strategies

use async_trait::async_trait;
use std::path::Path;

use super::common;
use super::{RunOutcome, StrategyKind, TestStrategy};
use crate::config::{EnvSource, RunConfiguration};
use crate::context::RunContext;
use crate::error::RunnerResult;

pub const NON_REMOTE_FILTER: &str = "-RemoteConnectionTest.*:Neo4jBackendTest.*:OpsIOCoordinatorTest.*:Neo4JE2ETest.*";
pub const NON_REMOTE_CONFIG_FILES: [&str; 2] = ["unit_tests/config-tests.json", "unit_tests/config-client-tests.json"];

pub const REMOTE_FILTER: &str = "RemoteConnectionTest.*";
pub const REMOTE_CONFIG_FILES: [&str; 1] = ["unit_tests/config-aws-tests.json"];

/// Unit tests against local servers and UDF dispatchers (`ut`)
pub struct NonRemoteCompiled;

#[async_trait]
impl TestStrategy for NonRemoteCompiled {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NonRemoteCompiled
    }

    fn validate(&self, config: &RunConfiguration) -> RunnerResult<()> {
        common::validate_server_values(config)?;
        common::validate_compiled_binary(config)
    }

    fn resolve_defaults(&self, config: &mut RunConfiguration, cwd: &Path, _env: &dyn EnvSource) -> RunnerResult<()> {
        common::fill_test_filter(config, NON_REMOTE_FILTER);
        common::fill_server_values(config, cwd, &NON_REMOTE_CONFIG_FILES)?;
        common::fill_compiled_binary(config)
    }

    async fn execute(&self, config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
        common::start_udf_dispatchers(config, ctx).await?;
        common::prep_certs(config, ctx).await?;
        common::start_servers(config, ctx).await?;
        common::run_compiled_binary(config, ctx).await
    }
}

/// Unit tests against the object-store emulator (`ru`)
pub struct RemoteCompiled;

#[async_trait]
impl TestStrategy for RemoteCompiled {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RemoteCompiled
    }

    fn validate(&self, config: &RunConfiguration) -> RunnerResult<()> {
        common::validate_object_store(config)?;
        common::validate_compiled_binary(config)
    }

    fn resolve_defaults(&self, config: &mut RunConfiguration, cwd: &Path, env: &dyn EnvSource) -> RunnerResult<()> {
        common::fill_test_filter(config, REMOTE_FILTER);
        common::fill_object_store(config, env)?;
        common::fill_server_values(config, cwd, &REMOTE_CONFIG_FILES)?;
        common::fill_compiled_binary(config)
    }

    async fn execute(&self, config: &RunConfiguration, ctx: &mut RunContext) -> RunnerResult<RunOutcome> {
        common::start_object_store(config, ctx).await?;
        common::run_compiled_binary(config, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::apply_common;
    use crate::config::Secret;
    use crate::error::RunnerError;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn resolved(kind: StrategyKind, mut config: RunConfiguration, env: &HashMap<String, String>) -> RunConfiguration {
        let cwd = Path::new("/repo/tests");
        config.type_of_test = Some(kind);
        apply_common(&mut config, cwd).unwrap();
        kind.strategy().resolve_defaults(&mut config, cwd, env).unwrap();
        config
    }

    #[test]
    fn test_non_remote_defaults() {
        let config = resolved(StrategyKind::NonRemoteCompiled, RunConfiguration::default(), &HashMap::new());

        assert_eq!(config.test_name.as_deref(), Some(NON_REMOTE_FILTER));
        assert_eq!(
            config.service_config_files(),
            &[
                PathBuf::from("/repo/tests/unit_tests/config-tests.json"),
                PathBuf::from("/repo/tests/unit_tests/config-client-tests.json"),
            ]
        );
        assert_eq!(config.vdms_app_path, Some(PathBuf::from("/repo/build/vdms")));
        assert_eq!(config.googletest_path, Some(PathBuf::from("/repo/build/tests/unit_tests")));
    }

    #[test]
    fn test_quoted_empty_filter_uses_default() {
        let config = RunConfiguration {
            test_name: Some("''".to_string()),
            ..Default::default()
        };
        let config = resolved(StrategyKind::NonRemoteCompiled, config, &HashMap::new());
        assert_eq!(config.test_name.as_deref(), Some(NON_REMOTE_FILTER));
    }

    #[test]
    fn test_default_filling_is_idempotent() {
        let env: HashMap<String, String> = [("AWS_API_PORT".to_string(), "9300".to_string())].into();
        let config = RunConfiguration {
            minio_username: Some("admin".to_string()),
            minio_password: Some(Secret::new("secret")),
            ..Default::default()
        };
        let once = resolved(StrategyKind::RemoteCompiled, config, &env);
        let twice = resolved(StrategyKind::RemoteCompiled, once.clone(), &env);

        assert_eq!(once, twice);
        assert_eq!(once.minio_port, Some(9300));
        assert_eq!(once.minio_console_port, Some(9001));
        assert_eq!(once.minio_alias_name.as_deref(), Some("myminio"));
        assert_eq!(once.minio_tmp_dir_name, Some(PathBuf::from("/repo/tests/tests_output_dir/minio_files")));
    }

    #[test]
    fn test_object_store_data_stays_in_scratch_dir() {
        let config = RunConfiguration {
            minio_username: Some("admin".to_string()),
            minio_password: Some(Secret::new("secret")),
            minio_tmp_dir_name: Some(PathBuf::from("/var/lib/minio-data")),
            ..Default::default()
        };

        let filled = resolved(StrategyKind::RemoteCompiled, config, &HashMap::new());

        assert_eq!(filled.minio_tmp_dir_name, Some(PathBuf::from("/repo/tests/tests_output_dir/minio_files")));
    }

    #[test]
    fn test_remote_requires_object_store_credentials() {
        let missing_user = RunConfiguration::default();
        let result = RemoteCompiled.validate(&missing_user);
        assert!(matches!(result, Err(RunnerError::ValidationError { ref field, .. }) if field == "minio_username"));

        let missing_password = RunConfiguration {
            minio_username: Some("admin".to_string()),
            ..Default::default()
        };
        let result = RemoteCompiled.validate(&missing_password);
        assert!(matches!(result, Err(RunnerError::ValidationError { ref field, .. }) if field == "minio_password"));
    }

    #[test]
    fn test_missing_explicit_binary_fails_validation() {
        let config = RunConfiguration {
            googletest_path: Some(PathBuf::from("/nonexistent/unit_tests")),
            ..Default::default()
        };
        let result = NonRemoteCompiled.validate(&config);
        assert!(matches!(result, Err(RunnerError::ValidationError { ref field, .. }) if field == "googletest_path"));
    }
}
