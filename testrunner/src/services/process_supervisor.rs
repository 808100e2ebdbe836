//! Real process supervision service implementation
//!
//! Spawns long-running services and one-shot commands, keeps the services in
//! an insertion-ordered registry, and kills them in reverse order.

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::{Child, Command};

use super::readiness::{wait_until_ready, ReadinessPolicy, ReadinessProbe};
use crate::error::{RunnerError, RunnerResult};
use crate::traits::{Completion, KillReport, LaunchSpec, OutputSink, Readiness, Supervisor};
use shared::{process_debug, process_error, process_info, ServiceRole};

/// Handle for a managed service
#[derive(Debug)]
pub struct ManagedProcess {
    pub role: ServiceRole,
    pub pid: u32,
    pub started_at: Instant,
    child: Child,
}

/// Real supervisor backed by OS processes
pub struct ProcessSupervisor {
    registry: Vec<ManagedProcess>,
    policy: ReadinessPolicy,
    probe: ReadinessProbe,
}

enum Termination {
    Killed,
    AlreadyExited,
}

impl ProcessSupervisor {
    /// Create new supervisor with default readiness policy
    pub fn new() -> Self {
        Self {
            registry: Vec::new(),
            policy: ReadinessPolicy::default(),
            probe: ReadinessProbe::new(),
        }
    }

    /// Configure readiness policy (fluent API)
    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn command(spec: LaunchSpec) -> (Command, bool) {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).envs(spec.env).kill_on_drop(true);
        if let Some(dir) = spec.current_dir {
            cmd.current_dir(dir);
        }
        let capture = match spec.output {
            OutputSink::Inherit => false,
            OutputSink::Files { stdout, stderr } => {
                cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
                false
            }
            OutputSink::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                true
            }
        };
        cmd.stdin(Stdio::null());
        (cmd, capture)
    }

    async fn terminate(process: &mut ManagedProcess) -> RunnerResult<Termination> {
        let role = process.role;
        match process.child.try_wait() {
            Ok(Some(status)) => {
                process_debug!(role, "Already exited with {}", status);
                return Ok(Termination::AlreadyExited);
            }
            Ok(None) => {}
            Err(e) => return Err(RunnerError::process(role, format!("cannot poll pid {}: {e}", process.pid))),
        }

        let pid = i32::try_from(process.pid)
            .map_err(|_| RunnerError::process(role, format!("pid {} out of range", process.pid)))?;
        match signal::kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return Ok(Termination::AlreadyExited),
            Err(e) => return Err(RunnerError::process(role, format!("kill pid {} failed: {e}", process.pid))),
        }
        process
            .child
            .wait()
            .await
            .map_err(|e| RunnerError::process(role, format!("reaping pid {} failed: {e}", process.pid)))?;
        Ok(Termination::Killed)
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Supervisor for ProcessSupervisor {
    async fn start(&mut self, spec: LaunchSpec, readiness: Readiness) -> RunnerResult<u32> {
        let role = spec.role;
        process_info!(role, "🚀 {}", spec.command_line());
        let (mut cmd, _) = Self::command(spec);
        let child = cmd
            .spawn()
            .map_err(|e| RunnerError::process(role, format!("spawn failed: {e}")))?;
        let pid = child
            .id()
            .ok_or_else(|| RunnerError::process(role, "process exited before its pid was read"))?;

        self.registry.push(ManagedProcess {
            role,
            pid,
            started_at: Instant::now(),
            child,
        });
        process_debug!(role, "Registered pid {} ({} managed)", pid, self.registry.len());

        if let Some(process) = self.registry.last_mut() {
            wait_until_ready(role, &mut process.child, &readiness, &self.probe, &self.policy).await?;
        }
        Ok(pid)
    }

    async fn run_to_completion(&mut self, spec: LaunchSpec) -> RunnerResult<Completion> {
        let role = spec.role;
        process_info!(role, "▶️  {}", spec.command_line());
        let (mut cmd, capture) = Self::command(spec);

        if capture {
            let output = cmd
                .output()
                .await
                .map_err(|e| RunnerError::process(role, format!("spawn failed: {e}")))?;
            return Ok(Completion {
                code: output.status.code(),
                stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
            });
        }

        let status = cmd
            .spawn()
            .map_err(|e| RunnerError::process(role, format!("spawn failed: {e}")))?
            .wait()
            .await
            .map_err(|e| RunnerError::process(role, format!("wait failed: {e}")))?;
        Ok(Completion {
            code: status.code(),
            ..Default::default()
        })
    }

    async fn kill_all(&mut self) -> KillReport {
        let mut report = KillReport::default();
        while let Some(mut process) = self.registry.pop() {
            report.handled.push((process.role, process.pid));
            match Self::terminate(&mut process).await {
                Ok(Termination::Killed) => {
                    process_debug!(
                        process.role,
                        "Killed pid {} after {:?}",
                        process.pid,
                        process.started_at.elapsed()
                    );
                }
                Ok(Termination::AlreadyExited) => report.already_exited.push(process.pid),
                Err(e) => {
                    process_error!(process.role, "{}", e);
                    report.failures.push(e.to_string());
                }
            }
        }
        report
    }

    fn running(&self) -> Vec<(ServiceRole, u32)> {
        self.registry.iter().map(|p| (p.role, p.pid)).collect()
    }
}
