//! Run-scoped state threaded through setup, execution and teardown

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::RunConfiguration;
use crate::error::RunnerResult;
use crate::services::log_files::{LogRegistry, LogTarget};
use crate::services::readiness::ReadinessPolicy;
use crate::services::scratch::{ResourceLifecycleManager, ScratchDirectory};
use crate::services::ProcessSupervisor;
use crate::traits::{Completion, LaunchSpec, OutputSink, Readiness, Supervisor};
use shared::{logging, process_debug, process_info, ServiceRole};
use uuid::Uuid;

/// Owns everything a run creates so teardown can undo it
///
/// Holds the supervisor and its process registry, the open log files, the
/// scratch directory, the materialized service configs, and the environment
/// overlay handed to every child. The runner's own environment is never
/// modified.
pub struct RunContext {
    run_id: Uuid,
    supervisor: Box<dyn Supervisor>,
    logs: LogRegistry,
    scratch: ScratchDirectory,
    service_configs: Vec<PathBuf>,
    env_overlay: BTreeMap<String, String>,
    torn_down: bool,
}

impl RunContext {
    pub fn new(supervisor: Box<dyn Supervisor>, scratch: ScratchDirectory) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            supervisor,
            logs: LogRegistry::new(&scratch.path),
            scratch,
            service_configs: Vec::new(),
            env_overlay: BTreeMap::new(),
            torn_down: false,
        }
    }

    /// Context backed by real OS processes for a resolved configuration
    pub fn for_config(config: &RunConfiguration) -> RunnerResult<Self> {
        let scratch = ScratchDirectory::new(config.scratch_dir()?, config.keep_scratch());
        let supervisor = ProcessSupervisor::new().with_policy(ReadinessPolicy::with_deadline(config.startup_timeout()));
        Ok(Self::new(Box::new(supervisor), scratch))
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn scratch(&self) -> &ScratchDirectory {
        &self.scratch
    }

    pub fn service_configs(&self) -> &[PathBuf] {
        &self.service_configs
    }

    pub fn open_log_count(&self) -> usize {
        self.logs.open_count()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Create the scratch dir and copy the service configs into it
    pub async fn prepare_scratch(&mut self, config: &RunConfiguration) -> RunnerResult<()> {
        let dir = self.scratch.path.clone();
        ResourceLifecycleManager::create_scratch_dir(&dir).await?;
        let copies = ResourceLifecycleManager::materialize_config_files(config.service_config_files(), &dir).await?;
        ResourceLifecycleManager::rewrite_storage_root(&copies, &dir).await?;
        logging::log_scratch_ready(&dir, copies.len());
        self.service_configs = copies;
        Ok(())
    }

    /// Set a variable for every child started from now on
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        process_debug!(ServiceRole::Runner, "Child environment: {}={}", key, value);
        self.env_overlay.insert(key, value);
    }

    /// Like `set_env`, for values that must stay out of the logs
    pub fn set_secret_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        process_debug!(ServiceRole::Runner, "Child environment: {}=***", key);
        self.env_overlay.insert(key, value.into());
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env_overlay.get(key).map(String::as_str)
    }

    /// A launch spec carrying the current environment overlay
    pub fn launch(&self, role: ServiceRole, program: impl AsRef<Path>) -> LaunchSpec {
        LaunchSpec::new(role, program).envs(self.env_overlay.clone())
    }

    /// Output routing into a target's configured log pair
    pub fn log_sink(&mut self, config: &RunConfiguration, target: LogTarget) -> RunnerResult<OutputSink> {
        let (stdout, stderr) = log_names(config, target)?;
        self.logs.sink(target, stdout, stderr)
    }

    /// Write a captured completion into a target's log pair
    pub fn record_output(
        &mut self,
        config: &RunConfiguration,
        target: LogTarget,
        completion: &Completion,
    ) -> RunnerResult<()> {
        let names = log_names(config, target)?;
        self.logs.append(
            target,
            names,
            completion.stdout.as_deref().unwrap_or_default(),
            completion.stderr.as_deref().unwrap_or_default(),
        )
    }

    pub async fn start(&mut self, spec: LaunchSpec, readiness: Readiness) -> RunnerResult<u32> {
        self.supervisor.start(spec, readiness).await
    }

    pub async fn run(&mut self, spec: LaunchSpec) -> RunnerResult<Completion> {
        self.supervisor.run_to_completion(spec).await
    }

    /// Kill processes, close logs, remove the scratch dir; only the first call acts
    ///
    /// Every step runs even when an earlier one fails; the first failure is
    /// returned.
    pub async fn teardown(&mut self) -> RunnerResult<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        let running = self.supervisor.running();
        let services = running.iter().filter(|(role, _)| role.is_service()).count();
        process_info!(
            ServiceRole::Runner,
            "🧹 Tearing down run {}: {} managed processes ({} services)",
            self.run_id,
            running.len(),
            services
        );

        let killed = self.supervisor.kill_all().await.into_result();
        let closed = self.logs.close_all();
        process_debug!(ServiceRole::Runner, "Closed {} log pairs", closed);
        let removed = ResourceLifecycleManager::teardown(&self.scratch).await;

        killed.and(removed)
    }
}

fn log_names(config: &RunConfiguration, target: LogTarget) -> RunnerResult<(&str, &str)> {
    match config.log_file_names(target) {
        (Some(stdout), Some(stderr)) => Ok((stdout, stderr)),
        _ => Err(crate::error::RunnerError::validation(
            format!("{target:?} log file names"),
            "no value after default resolution",
        )),
    }
}
