//! Tests for the log file registry

use std::io::Write;

use crate::services::log_files::{LogRegistry, LogTarget};
use crate::traits::OutputSink;

/// Test that one target opens one pair no matter how often it is used
#[test]
fn test_sink_opens_pair_once_per_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut logs = LogRegistry::new(dir.path());

    let first = logs.sink(LogTarget::Vdms, "vdms_stdout_log.log", "vdms_stderr_log.log").unwrap();
    let second = logs.sink(LogTarget::Vdms, "vdms_stdout_log.log", "vdms_stderr_log.log").unwrap();
    logs.sink(LogTarget::Minio, "minio_stdout_log.log", "minio_stderr_log.log").unwrap();

    assert_eq!(logs.open_count(), 2);
    assert!(dir.path().join("vdms_stdout_log.log").exists());
    assert!(dir.path().join("minio_stderr_log.log").exists());

    // both handles append to the same file
    for sink in [first, second] {
        match sink {
            OutputSink::Files { mut stdout, .. } => writeln!(stdout, "line").unwrap(),
            other => panic!("unexpected sink {other:?}"),
        }
    }
    let content = std::fs::read_to_string(dir.path().join("vdms_stdout_log.log")).unwrap();
    assert_eq!(content, "line\nline\n");
}

/// Test that captured output lands in the pair and close_all empties the registry
#[test]
fn test_append_and_close_all() {
    let dir = tempfile::tempdir().unwrap();
    let mut logs = LogRegistry::new(dir.path());

    logs.append(
        LogTarget::Tests,
        ("tests_stdout_log.log", "tests_stderr_log.log"),
        "ok\n",
        "warn\n",
    )
    .unwrap();

    assert_eq!(logs.close_all(), 1);
    assert_eq!(logs.open_count(), 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("tests_stderr_log.log")).unwrap(),
        "warn\n"
    );
}

/// Test that opening inside a missing directory is a resource error
#[test]
fn test_missing_directory_is_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut logs = LogRegistry::new(dir.path().join("missing"));

    let result = logs.sink(LogTarget::Tls, "tls_stdout_log.log", "tls_stderr_log.log");

    assert!(matches!(result, Err(crate::error::RunnerError::ResourceError { .. })));
}
