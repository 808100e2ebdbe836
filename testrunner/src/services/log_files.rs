//! Per-service log file registry
//!
//! Log pairs are opened lazily inside the scratch directory the first time a
//! service of that kind is launched, shared by every later launch of the same
//! kind, and all closed together at teardown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RunnerError, RunnerResult};
use crate::traits::OutputSink;
use shared::{process_debug, ServiceRole};

/// Group of processes sharing one stdout/stderr log pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTarget {
    Tests,
    UdfLocal,
    UdfServer,
    Tls,
    Minio,
    Vdms,
}

impl LogTarget {
    pub const ALL: [LogTarget; 6] = [
        LogTarget::Tests,
        LogTarget::UdfLocal,
        LogTarget::UdfServer,
        LogTarget::Tls,
        LogTarget::Minio,
        LogTarget::Vdms,
    ];
}

#[derive(Debug)]
struct LogPair {
    stdout: File,
    stderr: File,
}

/// Open log handles for one run, in the order they were opened
#[derive(Debug)]
pub struct LogRegistry {
    dir: PathBuf,
    open: Vec<(LogTarget, LogPair)>,
}

fn open_append(path: &Path) -> RunnerResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RunnerError::resource("open log file", path, e))
}

impl LogRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), open: Vec::new() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn pair(&mut self, target: LogTarget, stdout_name: &str, stderr_name: &str) -> RunnerResult<&LogPair> {
        let index = match self.open.iter().position(|(t, _)| *t == target) {
            Some(index) => index,
            None => {
                let pair = LogPair {
                    stdout: open_append(&self.dir.join(stdout_name))?,
                    stderr: open_append(&self.dir.join(stderr_name))?,
                };
                process_debug!(
                    ServiceRole::Runner,
                    "Opened log pair {:?}: {} / {}",
                    target,
                    stdout_name,
                    stderr_name
                );
                self.open.push((target, pair));
                self.open.len() - 1
            }
        };
        Ok(&self.open[index].1)
    }

    /// Output routing for a child writing into this target's log pair
    pub fn sink(&mut self, target: LogTarget, stdout_name: &str, stderr_name: &str) -> RunnerResult<OutputSink> {
        let dir = self.dir.clone();
        let pair = self.pair(target, stdout_name, stderr_name)?;
        let stdout = pair
            .stdout
            .try_clone()
            .map_err(|e| RunnerError::resource("duplicate log handle", &dir.join(stdout_name), e))?;
        let stderr = pair
            .stderr
            .try_clone()
            .map_err(|e| RunnerError::resource("duplicate log handle", &dir.join(stderr_name), e))?;
        Ok(OutputSink::Files { stdout, stderr })
    }

    /// Write captured output into this target's log pair
    pub fn append(
        &mut self,
        target: LogTarget,
        (stdout_name, stderr_name): (&str, &str),
        stdout: &str,
        stderr: &str,
    ) -> RunnerResult<()> {
        let dir = self.dir.clone();
        let pair = self.pair(target, stdout_name, stderr_name)?;
        (&pair.stdout)
            .write_all(stdout.as_bytes())
            .map_err(|e| RunnerError::resource("write log file", &dir.join(stdout_name), e))?;
        (&pair.stderr)
            .write_all(stderr.as_bytes())
            .map_err(|e| RunnerError::resource("write log file", &dir.join(stderr_name), e))?;
        Ok(())
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Flush and drop every handle; returns how many pairs were closed
    pub fn close_all(&mut self) -> usize {
        let closed = self.open.len();
        for (target, pair) in self.open.drain(..) {
            if let Err(e) = pair.stdout.sync_all().and_then(|_| pair.stderr.sync_all()) {
                process_debug!(ServiceRole::Runner, "Could not sync {:?} logs: {}", target, e);
            }
        }
        closed
    }
}
