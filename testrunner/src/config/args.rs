//! Command line arguments

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use super::run_config::{RunConfiguration, Secret};
use crate::strategy::StrategyKind;

/// Run the database test suites with every service they depend on
#[derive(Parser, Debug, Default)]
#[command(name = "testrunner")]
#[command(about = "Run all the tests according to the arguments given")]
pub struct CliArgs {
    /// Path to a JSON config file; command line values take priority over it
    #[arg(short = 'j', long = "json", value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Name of the test or pattern of test names
    #[arg(short = 'n', long = "test_name")]
    pub test_name: Option<String>,

    /// Type of test to run
    #[arg(short = 't', long = "type_of_test", value_enum)]
    pub type_of_test: Option<StrategyKind>,

    /// Config file for one server instance (repeatable)
    #[arg(short = 'c', long = "config_files_for_vdms", value_name = "PATH", action = ArgAction::Append)]
    pub config_files_for_vdms: Vec<PathBuf>,

    /// Scratch directory for everything the tests create
    #[arg(short = 'd', long = "tmp_tests_dir", value_name = "PATH")]
    pub tmp_tests_dir: Option<PathBuf>,

    /// File receiving the tests' stderr
    #[arg(short = 'e', long = "stderr_filename", value_name = "PATH")]
    pub stderr_filename: Option<String>,

    /// File receiving the tests' stdout
    #[arg(short = 'o', long = "stdout_filename", value_name = "PATH")]
    pub stdout_filename: Option<String>,

    /// Compiled googletest binary
    #[arg(short = 'g', long = "googletest_path", value_name = "PATH")]
    pub googletest_path: Option<PathBuf>,

    /// Server-under-test binary
    #[arg(short = 'v', long = "vdms_app_path", value_name = "PATH")]
    pub vdms_app_path: Option<PathBuf>,

    /// Object-store emulator binary
    #[arg(short = 'm', long = "minio_app_path", value_name = "PATH")]
    pub minio_app_path: Option<PathBuf>,

    /// Object-store API port
    #[arg(short = 'a', long = "minio_port", value_name = "PORT")]
    pub minio_port: Option<u16>,

    /// Object-store console port
    #[arg(short = 'y', long = "minio_console_port", value_name = "PORT")]
    pub minio_console_port: Option<u16>,

    /// Object-store username
    #[arg(short = 'u', long = "minio_username")]
    pub minio_username: Option<String>,

    /// Object-store password
    #[arg(short = 'p', long = "minio_password")]
    pub minio_password: Option<String>,

    /// Object-store client alias
    #[arg(long = "minio_alias_name")]
    pub minio_alias_name: Option<String>,

    /// Graph database port
    #[arg(short = 'r', long = "neo4j_port", value_name = "PORT")]
    pub neo4j_port: Option<u16>,

    /// Graph database username
    #[arg(short = 'x', long = "neo4j_username", value_name = "USERNAME")]
    pub neo4j_username: Option<String>,

    /// Graph database password
    #[arg(short = 'w', long = "neo4j_password", value_name = "PASSWORD")]
    pub neo4j_password: Option<String>,

    /// Graph database endpoint
    #[arg(short = 'z', long = "neo4j_endpoint", value_name = "ENDPOINT")]
    pub neo4j_endpoint: Option<String>,

    /// Keep the scratch directory after the run
    #[arg(short = 'k', long = "keep_tmp_tests_dir")]
    pub keep_tmp_tests_dir: bool,

    /// Stop at the first failing test (googletest only)
    #[arg(short = 's', long = "stop_tests_on_failure")]
    pub stop_tests_on_failure: bool,

    /// Run the tests after the services are up (the default)
    #[arg(long = "run", conflicts_with = "no_run")]
    pub run: bool,

    /// Start the services but do not run the tests; keep them up until Ctrl+C
    #[arg(short = 'b', long = "no-run")]
    pub no_run: bool,

    /// Repository root used to locate binaries and helper scripts
    #[arg(long = "repo_root", value_name = "PATH")]
    pub repo_root: Option<PathBuf>,

    /// Seconds a service may take to become ready
    #[arg(long = "startup_timeout_secs", value_name = "SECONDS")]
    pub startup_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log_level", default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    /// Only flags actually given on the command line become set fields
    pub fn to_run_configuration(&self) -> RunConfiguration {
        let run = match (self.run, self.no_run) {
            (_, true) => Some(false),
            (true, false) => Some(true),
            (false, false) => None,
        };

        RunConfiguration {
            test_name: self.test_name.clone(),
            type_of_test: self.type_of_test,
            tmp_tests_dir: self.tmp_tests_dir.clone(),
            config_files_for_vdms: (!self.config_files_for_vdms.is_empty())
                .then(|| self.config_files_for_vdms.clone()),
            stderr_filename: self.stderr_filename.clone(),
            stdout_filename: self.stdout_filename.clone(),
            googletest_path: self.googletest_path.clone(),
            vdms_app_path: self.vdms_app_path.clone(),
            minio_app_path: self.minio_app_path.clone(),
            minio_port: self.minio_port,
            minio_console_port: self.minio_console_port,
            minio_username: self.minio_username.clone(),
            minio_password: self.minio_password.clone().map(Secret::new),
            minio_alias_name: self.minio_alias_name.clone(),
            neo4j_port: self.neo4j_port,
            neo4j_username: self.neo4j_username.clone(),
            neo4j_password: self.neo4j_password.clone().map(Secret::new),
            neo4j_endpoint: self.neo4j_endpoint.clone(),
            keep_tmp_tests_dir: self.keep_tmp_tests_dir.then_some(true),
            stop_tests_on_failure: self.stop_tests_on_failure.then_some(true),
            run,
            repo_root: self.repo_root.clone(),
            startup_timeout_secs: self.startup_timeout_secs,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_flags_stay_unset() {
        let args = CliArgs::try_parse_from(["testrunner", "-t", "ut"]).unwrap();
        let config = args.to_run_configuration();

        assert_eq!(config.type_of_test, Some(StrategyKind::NonRemoteCompiled));
        assert_eq!(config.keep_tmp_tests_dir, None);
        assert_eq!(config.stop_tests_on_failure, None);
        assert_eq!(config.run, None);
        assert_eq!(config.config_files_for_vdms, None);
    }

    #[test]
    fn test_short_flags_and_repeatable_config_files() {
        let args = CliArgs::try_parse_from([
            "testrunner", "-t", "neo", "-n", "Neo4jBackendTest.*", "-c", "a.json", "-c", "b.json", "-k", "-s", "-b",
            "-r", "7688",
        ])
        .unwrap();
        let config = args.to_run_configuration();

        assert_eq!(config.type_of_test, Some(StrategyKind::GraphBackend));
        assert_eq!(config.service_config_files().len(), 2);
        assert_eq!(config.keep_tmp_tests_dir, Some(true));
        assert_eq!(config.stop_tests_on_failure, Some(true));
        assert_eq!(config.run, Some(false));
        assert_eq!(config.neo4j_port, Some(7688));
    }

    #[test]
    fn test_run_and_no_run_conflict() {
        let result = CliArgs::try_parse_from(["testrunner", "--run", "--no-run"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_test_type_is_rejected() {
        let result = CliArgs::try_parse_from(["testrunner", "-t", "bogus"]);
        assert!(result.is_err());
    }
}
