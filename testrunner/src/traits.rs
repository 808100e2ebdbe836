//! Trait definitions with mockall annotations for testing
//!
//! The supervisor trait is the seam between the test strategies and the
//! operating system. Strategies describe what to launch with a `LaunchSpec`;
//! the supervisor decides how to spawn, watch and kill it.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{RunnerError, RunnerResult};
use shared::ServiceRole;

/// Where a child's stdout and stderr go
#[derive(Debug)]
pub enum OutputSink {
    /// Share the runner's own terminal
    Inherit,
    /// Append to an opened log pair
    Files { stdout: File, stderr: File },
    /// Collect into memory and hand back in the `Completion`
    Capture,
}

/// Everything needed to launch one child process
#[derive(Debug)]
pub struct LaunchSpec {
    pub role: ServiceRole,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    pub output: OutputSink,
    /// Positions in `args` that must not be logged
    pub redacted: Vec<usize>,
}

impl LaunchSpec {
    pub fn new(role: ServiceRole, program: impl AsRef<Path>) -> Self {
        Self {
            role,
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
            output: OutputSink::Inherit,
            redacted: Vec::new(),
        }
    }

    /// Append one argument (fluent API)
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments (fluent API)
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append an argument that is passed through but never logged (fluent API)
    pub fn secret_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.redacted.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Add environment variables on top of the inherited environment (fluent API)
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// Configure output routing (fluent API)
    pub fn output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    /// Configure working directory (fluent API)
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program and arguments as a single printable line
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for (index, arg) in self.args.iter().enumerate() {
            line.push(' ');
            if self.redacted.contains(&index) {
                line.push_str("***");
            } else {
                line.push_str(&arg.to_string_lossy());
            }
        }
        line
    }
}

/// How to decide that a freshly started service is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Consider the process ready as soon as it has been spawned
    Immediate,
    /// A TCP connection to this local port succeeds
    Tcp { port: u16 },
    /// An HTTP GET to this URL returns a success status
    Http { url: String },
}

/// Result of a run-to-completion step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Exit code, `None` when the process was ended by a signal
    pub code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl Completion {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into an execution error naming the step
    pub fn into_result(self, step: &str) -> RunnerResult<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = self
            .code
            .map(|code| format!("exit code {code}"))
            .unwrap_or_else(|| "termination by signal".to_string());
        Err(RunnerError::execution(format!("{step} finished with {status}")))
    }
}

/// Outcome of a kill pass over the process registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    /// Processes in the order they were handled
    pub handled: Vec<(ServiceRole, u32)>,
    /// Processes that had already exited before the kill
    pub already_exited: Vec<u32>,
    /// One message per process that could not be killed
    pub failures: Vec<String>,
}

impl KillReport {
    pub fn into_result(self) -> RunnerResult<()> {
        match self.failures.into_iter().next() {
            Some(first) => Err(RunnerError::process(ServiceRole::Runner, first)),
            None => Ok(()),
        }
    }
}

/// Process supervision abstraction for dependency injection
///
/// Owns the registry of long-running services started for one run. Every
/// started service stays registered until `kill_all` handles it.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Supervisor: Send {
    /// Spawn a long-running service and wait until it is ready
    ///
    /// # Returns
    /// The OS process id of the new service. The process is registered even
    /// when the readiness check fails, so a later `kill_all` still reaps it.
    async fn start(&mut self, spec: LaunchSpec, readiness: Readiness) -> RunnerResult<u32>;

    /// Run a one-shot command and wait for it to exit
    ///
    /// A non-zero exit is reported in the `Completion`, not as an error.
    async fn run_to_completion(&mut self, spec: LaunchSpec) -> RunnerResult<Completion>;

    /// Kill every registered service, most recently started first
    ///
    /// Each process leaves the registry as it is handled; a process that has
    /// already exited counts as handled.
    async fn kill_all(&mut self) -> KillReport;

    /// Currently registered services in start order
    fn running(&self) -> Vec<(ServiceRole, u32)>;
}
