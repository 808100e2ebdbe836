//! Scratch directory lifecycle and service config materialization

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{RunnerError, RunnerResult};
use shared::{process_debug, process_info, ServiceRole};

/// Key naming the directory a server-under-test persists data in
pub const STORAGE_ROOT_KEY: &str = "db_root_path";

/// Disposable per-run directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDirectory {
    pub path: PathBuf,
    pub retain: bool,
}

impl ScratchDirectory {
    pub fn new(path: impl Into<PathBuf>, retain: bool) -> Self {
        Self { path: path.into(), retain }
    }
}

/// Remove `//` line comments outside of string literals
pub fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut in_string = false;
        let mut escaped = false;
        let mut cut = line.len();
        let bytes = line.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
            } else if b == b'"' {
                in_string = true;
            } else if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
                cut = i;
                break;
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}

/// Read a comment-tolerant service config file
pub async fn read_service_config(path: &Path) -> RunnerResult<Value> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| RunnerError::resource("read service config", path, e))?;
    serde_json::from_str(&strip_line_comments(&text))
        .map_err(|e| RunnerError::resource("parse service config", path, e))
}

/// Creates, fills and removes the scratch tree
pub struct ResourceLifecycleManager;

impl ResourceLifecycleManager {
    /// Delete anything at `path`, then create it fresh
    pub async fn create_scratch_dir(path: &Path) -> RunnerResult<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => process_debug!(ServiceRole::Runner, "Removed stale scratch dir {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RunnerError::resource("remove scratch dir", path, e)),
        }
        fs::create_dir_all(path)
            .await
            .map_err(|e| RunnerError::resource("create scratch dir", path, e))
    }

    /// Copy each service config into the scratch dir, keeping its file name
    pub async fn materialize_config_files(sources: &[PathBuf], scratch_dir: &Path) -> RunnerResult<Vec<PathBuf>> {
        let mut copies = Vec::with_capacity(sources.len());
        for source in sources {
            let name = source
                .file_name()
                .ok_or_else(|| RunnerError::resource("copy service config", source, "path has no file name"))?;
            let target = scratch_dir.join(name);
            fs::copy(source, &target)
                .await
                .map_err(|e| RunnerError::resource("copy service config", source, e))?;
            copies.push(target);
        }
        Ok(copies)
    }

    /// Point each copied config's storage root into the scratch dir
    ///
    /// `/a/b/mydata` becomes `<scratch_dir>/mydata`. Every other field keeps
    /// its value and position. Files without a storage root are left alone.
    pub async fn rewrite_storage_root(copies: &[PathBuf], scratch_dir: &Path) -> RunnerResult<()> {
        for path in copies {
            let mut config = read_service_config(path).await?;
            let Some(old_root) = config.get(STORAGE_ROOT_KEY).and_then(Value::as_str).map(PathBuf::from) else {
                process_debug!(ServiceRole::Runner, "{} has no {}", path.display(), STORAGE_ROOT_KEY);
                continue;
            };
            let base = old_root
                .file_name()
                .ok_or_else(|| RunnerError::resource("rewrite storage root", path, "storage root has no final component"))?;
            let new_root = scratch_dir.join(base);
            config[STORAGE_ROOT_KEY] = Value::String(new_root.display().to_string());

            let text = serde_json::to_string_pretty(&config)
                .map_err(|e| RunnerError::resource("serialize service config", path, e))?;
            fs::write(path, text)
                .await
                .map_err(|e| RunnerError::resource("write service config", path, e))?;
            process_debug!(
                ServiceRole::Runner,
                "{}: {} -> {}",
                path.display(),
                old_root.display(),
                new_root.display()
            );
        }
        Ok(())
    }

    /// Remove the scratch dir unless it is retained; already gone is fine
    pub async fn teardown(scratch: &ScratchDirectory) -> RunnerResult<()> {
        if scratch.retain {
            process_info!(ServiceRole::Runner, "Keeping scratch dir {}", scratch.path.display());
            return Ok(());
        }
        match fs::remove_dir_all(&scratch.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RunnerError::resource("remove scratch dir", &scratch.path, e)),
        }
    }
}
