//! Tests for the scratch directory lifecycle
//!
//! These cover scratch creation, config materialization, storage-root
//! rewriting and teardown.

use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::fs;

use crate::error::RunnerError;
use crate::services::scratch::{strip_line_comments, ResourceLifecycleManager, ScratchDirectory};

/// Test that creating the scratch dir twice yields an empty dir each time
#[tokio::test]
async fn test_create_scratch_dir_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("tests_output_dir");

    ResourceLifecycleManager::create_scratch_dir(&scratch).await.unwrap();
    fs::write(scratch.join("leftover.txt"), "stale").await.unwrap();
    fs::create_dir_all(scratch.join("nested/dir")).await.unwrap();

    ResourceLifecycleManager::create_scratch_dir(&scratch).await.unwrap();

    assert!(scratch.is_dir());
    let mut entries = fs::read_dir(&scratch).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none(), "scratch dir should be empty");
}

/// Test that configs are copied under their own file names
#[tokio::test]
async fn test_materialize_config_files_copies_by_basename() {
    let root = tempfile::tempdir().unwrap();
    let sources_dir = root.path().join("unit_tests");
    let scratch = root.path().join("scratch");
    fs::create_dir_all(&sources_dir).await.unwrap();
    fs::create_dir_all(&scratch).await.unwrap();
    let source = sources_dir.join("config-tests.json");
    fs::write(&source, r#"{"port": 55557}"#).await.unwrap();

    let copies = ResourceLifecycleManager::materialize_config_files(&[source.clone()], &scratch)
        .await
        .unwrap();

    assert_eq!(copies, vec![scratch.join("config-tests.json")]);
    assert_eq!(
        fs::read_to_string(&copies[0]).await.unwrap(),
        fs::read_to_string(&source).await.unwrap()
    );
}

/// Test that a missing source fails fast with a resource error
#[tokio::test]
async fn test_materialize_missing_source_fails() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("nope.json");

    let result = ResourceLifecycleManager::materialize_config_files(&[missing], root.path()).await;

    assert!(matches!(result, Err(RunnerError::ResourceError { .. })));
}

/// Test that only the storage root changes and comments are tolerated
#[tokio::test]
async fn test_rewrite_storage_root_only_touches_storage_root() {
    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().to_path_buf();
    let config = scratch.join("config-tests.json");
    fs::write(
        &config,
        r#"{
    // server settings
    "port": 55557,
    "db_root_path": "/a/b/mydata", // persisted here
    "more-info": "http://example.com/docs",
    "nested": {"autodelete_interval_s": 3}
}"#,
    )
    .await
    .unwrap();

    ResourceLifecycleManager::rewrite_storage_root(&[config.clone()], &scratch)
        .await
        .unwrap();

    let rewritten: Value = serde_json::from_str(&fs::read_to_string(&config).await.unwrap()).unwrap();
    assert_eq!(
        rewritten["db_root_path"],
        Value::String(scratch.join("mydata").display().to_string())
    );
    assert_eq!(rewritten["port"], json!(55557));
    assert_eq!(rewritten["more-info"], json!("http://example.com/docs"));
    assert_eq!(rewritten["nested"], json!({"autodelete_interval_s": 3}));

    let keys: Vec<_> = rewritten.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["port", "db_root_path", "more-info", "nested"]);
}

/// Test that a config without a storage root is left untouched
#[tokio::test]
async fn test_rewrite_without_storage_root_keeps_file() {
    let root = tempfile::tempdir().unwrap();
    let config = root.path().join("config-client-tests.json");
    let original = "{\"port\": 55558}";
    fs::write(&config, original).await.unwrap();

    ResourceLifecycleManager::rewrite_storage_root(&[config.clone()], root.path())
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&config).await.unwrap(), original);
}

/// Test comment stripping leaves strings alone
#[test]
fn test_strip_line_comments_respects_strings() {
    let stripped = strip_line_comments("{\"url\": \"http://x\\\"//y\"} // trailing\n// whole line");
    assert_eq!(stripped, "{\"url\": \"http://x\\\"//y\"} \n\n");
}

/// Test teardown removes, retains, and tolerates a missing dir
#[tokio::test]
async fn test_teardown_behaviour() {
    let root = tempfile::tempdir().unwrap();
    let path: PathBuf = root.path().join("scratch");
    fs::create_dir_all(path.join("db")).await.unwrap();

    ResourceLifecycleManager::teardown(&ScratchDirectory::new(&path, true))
        .await
        .unwrap();
    assert!(path.exists(), "retained scratch dir should survive");

    ResourceLifecycleManager::teardown(&ScratchDirectory::new(&path, false))
        .await
        .unwrap();
    assert!(!path.exists());

    // already gone counts as success
    ResourceLifecycleManager::teardown(&ScratchDirectory::new(&path, false))
        .await
        .unwrap();
}
