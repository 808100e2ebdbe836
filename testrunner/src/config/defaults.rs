//! Built-in defaults and the common default-filling pass

use std::path::Path;

use super::run_config::{fill_path, fill_str, RunConfiguration};
use crate::error::RunnerResult;
use crate::services::log_files::LogTarget;

pub const DEFAULT_SCRATCH_DIR_NAME: &str = "tests_output_dir";
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_MINIO_ALIAS: &str = "myminio";
pub const DEFAULT_MINIO_PORT: u16 = 9000;
pub const DEFAULT_MINIO_CONSOLE_PORT: u16 = 9001;
pub const MINIO_TMP_DIR_NAME: &str = "minio_files";
pub const MINIO_BUCKET: &str = "minio-bucket";
pub const MINIO_CLIENT: &str = "mc";

pub const DEFAULT_NEO4J_PORT: u16 = 7687;
pub const DEFAULT_NEO4J_ENDPOINT: &str = "neo4j://neo4j:7687";

pub const DEFAULT_SERVER_PORT: u16 = 55555;
pub const UDF_SERVER_PORT: u16 = 5010;
pub const DEFAULT_UDF_LOCAL_PORT: u16 = 5555;

pub const STOP_ON_FAILURE_FLAG: &str = "--gtest_fail_fast";
pub const PYTHON: &str = "python3";

pub const ENV_MINIO_PORT: &str = "AWS_API_PORT";
pub const ENV_MINIO_CONSOLE_PORT: &str = "AWS_CONSOLE_PORT";
pub const ENV_NEO4J_PORT: &str = "NEO_TEST_PORT";
pub const ENV_NEO4J_ENDPOINT: &str = "NEO4J_ENDPOINT";

/// Log file prefix per target, `<prefix>_stdout_log.log` / `<prefix>_stderr_log.log`
pub fn log_prefix(target: LogTarget) -> &'static str {
    match target {
        LogTarget::Tests => "tests",
        LogTarget::UdfLocal => "udf_local",
        LogTarget::UdfServer => "udf_server",
        LogTarget::Tls => "tls",
        LogTarget::Minio => "minio",
        LogTarget::Vdms => "vdms",
    }
}

/// Apply the defaults every strategy shares
///
/// Runs before the strategy-specific pass. Only unset fields are filled, so
/// running it twice leaves the configuration unchanged.
pub fn apply_common(config: &mut RunConfiguration, cwd: &Path) -> RunnerResult<()> {
    let kind = config.kind()?;

    if kind.uses_compiled_binary() {
        config.stop_tests_on_failure.get_or_insert(false);
    } else {
        config.stop_tests_on_failure = None;
    }

    fill_path(&mut config.tmp_tests_dir, || cwd.join(DEFAULT_SCRATCH_DIR_NAME));
    fill_path(&mut config.repo_root, || {
        cwd.parent().unwrap_or(cwd).to_path_buf()
    });

    for target in LogTarget::ALL {
        let prefix = log_prefix(target);
        let (stdout, stderr) = config.log_file_slots(target);
        fill_str(stdout, || format!("{prefix}_stdout_log.log"));
        fill_str(stderr, || format!("{prefix}_stderr_log.log"));
    }

    config.keep_tmp_tests_dir.get_or_insert(false);
    config.run.get_or_insert(true);
    config.startup_timeout_secs.get_or_insert(DEFAULT_STARTUP_TIMEOUT_SECS);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;
    use std::path::PathBuf;

    fn config_for(kind: StrategyKind) -> RunConfiguration {
        RunConfiguration {
            type_of_test: Some(kind),
            ..Default::default()
        }
    }

    #[test]
    fn test_common_defaults_for_compiled_strategy() {
        let mut config = config_for(StrategyKind::NonRemoteCompiled);
        apply_common(&mut config, Path::new("/repo/tests")).unwrap();

        assert_eq!(config.tmp_tests_dir, Some(PathBuf::from("/repo/tests/tests_output_dir")));
        assert_eq!(config.repo_root, Some(PathBuf::from("/repo")));
        assert_eq!(config.stop_tests_on_failure, Some(false));
        assert_eq!(config.keep_tmp_tests_dir, Some(false));
        assert_eq!(config.run, Some(true));
        assert_eq!(config.vdms_stderr_filename.as_deref(), Some("vdms_stderr_log.log"));
        assert_eq!(config.stdout_filename.as_deref(), Some("tests_stdout_log.log"));
        assert_eq!(config.udf_local_stdout_filename.as_deref(), Some("udf_local_stdout_log.log"));
    }

    #[test]
    fn test_stop_on_failure_cleared_for_interpreted_strategy() {
        let mut config = config_for(StrategyKind::NonRemoteInterpreted);
        config.stop_tests_on_failure = Some(true);

        apply_common(&mut config, Path::new("/repo/tests")).unwrap();

        assert_eq!(config.stop_tests_on_failure, None);
    }

    #[test]
    fn test_explicit_values_survive() {
        let mut config = config_for(StrategyKind::RemoteCompiled);
        config.stop_tests_on_failure = Some(true);
        config.stderr_filename = Some("custom_err.log".to_string());
        config.tmp_tests_dir = Some(PathBuf::from("/scratch"));

        apply_common(&mut config, Path::new("/repo/tests")).unwrap();

        assert_eq!(config.stop_tests_on_failure, Some(true));
        assert_eq!(config.stderr_filename.as_deref(), Some("custom_err.log"));
        assert_eq!(config.tmp_tests_dir, Some(PathBuf::from("/scratch")));
    }
}
