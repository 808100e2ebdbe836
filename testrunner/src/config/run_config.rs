//! Run configuration shared by the command line and the JSON config file

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RunnerError, RunnerResult};
use crate::services::log_files::LogTarget;
use crate::strategy::StrategyKind;

/// A credential value that never shows up in debug output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"***\"")
    }
}

/// Every setting of one test run
///
/// All fields start unset. The command line and the JSON file each produce
/// one of these; they are merged, validated and then filled with defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RunConfiguration {
    pub test_name: Option<String>,
    pub type_of_test: Option<StrategyKind>,
    pub tmp_tests_dir: Option<PathBuf>,
    pub config_files_for_vdms: Option<Vec<PathBuf>>,

    pub stderr_filename: Option<String>,
    pub stdout_filename: Option<String>,
    pub udf_local_stderr_filename: Option<String>,
    pub udf_local_stdout_filename: Option<String>,
    pub udf_server_stderr_filename: Option<String>,
    pub udf_server_stdout_filename: Option<String>,
    pub tls_stderr_filename: Option<String>,
    pub tls_stdout_filename: Option<String>,
    pub minio_stderr_filename: Option<String>,
    pub minio_stdout_filename: Option<String>,
    pub vdms_stderr_filename: Option<String>,
    pub vdms_stdout_filename: Option<String>,

    pub googletest_path: Option<PathBuf>,
    pub vdms_app_path: Option<PathBuf>,

    pub minio_app_path: Option<PathBuf>,
    pub minio_tmp_dir_name: Option<PathBuf>,
    pub minio_port: Option<u16>,
    pub minio_console_port: Option<u16>,
    pub minio_username: Option<String>,
    pub minio_password: Option<Secret>,
    pub minio_alias_name: Option<String>,

    pub neo4j_port: Option<u16>,
    pub neo4j_username: Option<String>,
    pub neo4j_password: Option<Secret>,
    pub neo4j_endpoint: Option<String>,

    pub keep_tmp_tests_dir: Option<bool>,
    pub stop_tests_on_failure: Option<bool>,
    pub run: Option<bool>,

    pub repo_root: Option<PathBuf>,
    pub startup_timeout_secs: Option<u64>,
}

macro_rules! overlay_fields {
    ($base:ident, $over:ident; $($field:ident),+ $(,)?) => {
        $(
            if $over.$field.is_some() {
                $base.$field = $over.$field;
            }
        )+
    };
}

/// Treat empty strings and the quoted empty filter `''` as unset
pub fn is_blank(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(text) => {
            let trimmed = text.trim();
            trimmed.is_empty() || trimmed == "''"
        }
    }
}

/// Fill an unset or blank string field
pub fn fill_str(slot: &mut Option<String>, value: impl FnOnce() -> String) {
    if is_blank(slot.as_deref()) {
        *slot = Some(value());
    }
}

/// Fill an unset or empty path field
pub fn fill_path(slot: &mut Option<PathBuf>, value: impl FnOnce() -> PathBuf) {
    if slot.as_ref().is_none_or(|path| path.as_os_str().is_empty()) {
        *slot = Some(value());
    }
}

/// Borrow a field that must be present after default-filling
pub fn required<'a, T>(field: &str, value: &'a Option<T>) -> RunnerResult<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| RunnerError::validation(field, "no value after default resolution"))
}

fn absolutize_path(cwd: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = cwd.join(&*path);
    }
}

impl RunConfiguration {
    /// Load a strict JSON config file
    pub fn from_json_file(path: &Path) -> RunnerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::config(format!("cannot read JSON config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| RunnerError::config(format!("invalid JSON config {}: {e}", path.display())))
    }

    /// Overlay every field that is set in `cli` on top of `self`
    pub fn merged_with(mut self, cli: RunConfiguration) -> Self {
        overlay_fields!(self, cli;
            test_name, type_of_test, tmp_tests_dir, config_files_for_vdms,
            stderr_filename, stdout_filename,
            udf_local_stderr_filename, udf_local_stdout_filename,
            udf_server_stderr_filename, udf_server_stdout_filename,
            tls_stderr_filename, tls_stdout_filename,
            minio_stderr_filename, minio_stdout_filename,
            vdms_stderr_filename, vdms_stdout_filename,
            googletest_path, vdms_app_path,
            minio_app_path, minio_tmp_dir_name, minio_port, minio_console_port,
            minio_username, minio_password, minio_alias_name,
            neo4j_port, neo4j_username, neo4j_password, neo4j_endpoint,
            keep_tmp_tests_dir, stop_tests_on_failure, run,
            repo_root, startup_timeout_secs,
        );
        self
    }

    /// Resolve every relative path field against the working directory
    pub fn absolutize(&mut self, cwd: &Path) {
        for slot in [
            &mut self.tmp_tests_dir,
            &mut self.googletest_path,
            &mut self.vdms_app_path,
            &mut self.minio_app_path,
            &mut self.minio_tmp_dir_name,
            &mut self.repo_root,
        ] {
            if let Some(path) = slot.as_mut() {
                absolutize_path(cwd, path);
            }
        }
        if let Some(files) = self.config_files_for_vdms.as_mut() {
            for path in files.iter_mut() {
                absolutize_path(cwd, path);
            }
        }
    }

    pub fn kind(&self) -> RunnerResult<StrategyKind> {
        self.type_of_test
            .ok_or_else(|| RunnerError::validation("type_of_test", "a test type is required"))
    }

    /// The test filter, ignoring blank values
    pub fn test_filter(&self) -> Option<&str> {
        let filter = self.test_name.as_deref();
        if is_blank(filter) { None } else { filter }
    }

    pub fn scratch_dir(&self) -> RunnerResult<&Path> {
        required("tmp_tests_dir", &self.tmp_tests_dir).map(PathBuf::as_path)
    }

    pub fn repo(&self) -> RunnerResult<&Path> {
        required("repo_root", &self.repo_root).map(PathBuf::as_path)
    }

    pub fn service_config_files(&self) -> &[PathBuf] {
        self.config_files_for_vdms.as_deref().unwrap_or_default()
    }

    pub fn keep_scratch(&self) -> bool {
        self.keep_tmp_tests_dir.unwrap_or(false)
    }

    pub fn should_run(&self) -> bool {
        self.run.unwrap_or(true)
    }

    pub fn stop_on_failure(&self) -> bool {
        self.stop_tests_on_failure.unwrap_or(false)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(
            self.startup_timeout_secs
                .unwrap_or(super::defaults::DEFAULT_STARTUP_TIMEOUT_SECS),
        )
    }

    /// Configured (stdout, stderr) log file names for a log target
    pub fn log_file_names(&self, target: LogTarget) -> (Option<&str>, Option<&str>) {
        let (stdout, stderr) = match target {
            LogTarget::Tests => (&self.stdout_filename, &self.stderr_filename),
            LogTarget::UdfLocal => (&self.udf_local_stdout_filename, &self.udf_local_stderr_filename),
            LogTarget::UdfServer => (&self.udf_server_stdout_filename, &self.udf_server_stderr_filename),
            LogTarget::Tls => (&self.tls_stdout_filename, &self.tls_stderr_filename),
            LogTarget::Minio => (&self.minio_stdout_filename, &self.minio_stderr_filename),
            LogTarget::Vdms => (&self.vdms_stdout_filename, &self.vdms_stderr_filename),
        };
        (stdout.as_deref(), stderr.as_deref())
    }

    /// Mutable slots for a log target's (stdout, stderr) names
    pub(crate) fn log_file_slots(&mut self, target: LogTarget) -> (&mut Option<String>, &mut Option<String>) {
        match target {
            LogTarget::Tests => (&mut self.stdout_filename, &mut self.stderr_filename),
            LogTarget::UdfLocal => (&mut self.udf_local_stdout_filename, &mut self.udf_local_stderr_filename),
            LogTarget::UdfServer => (&mut self.udf_server_stdout_filename, &mut self.udf_server_stderr_filename),
            LogTarget::Tls => (&mut self.tls_stdout_filename, &mut self.tls_stderr_filename),
            LogTarget::Minio => (&mut self.minio_stdout_filename, &mut self.minio_stderr_filename),
            LogTarget::Vdms => (&mut self.vdms_stdout_filename, &mut self.vdms_stderr_filename),
        }
    }
}
