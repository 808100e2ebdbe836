//! Test helpers and builder patterns for test runner tests
//!
//! The supervisor builder wraps `MockSupervisor` and records every launch so
//! tests can assert on the exact order and arguments of the steps a strategy
//! took.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::fixtures::RepoFixture;
use shared::ServiceRole;
use testrunner::config::RunConfiguration;
use testrunner::services::ScratchDirectory;
use testrunner::*;

/// One recorded launch
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRecord {
    pub role: ServiceRole,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// Output collected into the `Completion` rather than streamed
    pub captured: bool,
    /// `None` for run-to-completion steps
    pub readiness: Option<Readiness>,
}

impl LaunchRecord {
    fn from_spec(spec: &LaunchSpec, readiness: Option<Readiness>) -> Self {
        Self {
            role: spec.role,
            args: spec.args.iter().map(|a| a.to_string_lossy().into_owned()).collect(),
            env: spec.env.clone(),
            current_dir: spec.current_dir.clone(),
            captured: matches!(spec.output, OutputSink::Capture),
            readiness,
        }
    }

    /// Value of a child environment variable
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Builder for a recording `MockSupervisor`
pub struct SupervisorBuilder {
    starts: RangeInclusive<usize>,
    runs: RangeInclusive<usize>,
    exit_codes: HashMap<ServiceRole, i32>,
    outputs: HashMap<ServiceRole, (String, String)>,
    on_start: Option<Arc<Notify>>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self {
            starts: 0..=0,
            runs: 0..=0,
            exit_codes: HashMap::new(),
            outputs: HashMap::new(),
            on_start: None,
        }
    }

    /// Expect exactly this many long-running services
    pub fn with_starts(mut self, count: usize) -> Self {
        self.starts = count..=count;
        self
    }

    /// Expect exactly this many run-to-completion steps
    pub fn with_runs(mut self, count: usize) -> Self {
        self.runs = count..=count;
        self
    }

    /// Accept any prefix of the expected launches, for runs cut short
    pub fn allow_partial(mut self) -> Self {
        self.starts = 0..=*self.starts.end();
        self.runs = 0..=*self.runs.end();
        self
    }

    /// Notify after every started service
    pub fn notify_on_start(mut self, notify: Arc<Notify>) -> Self {
        self.on_start = Some(notify);
        self
    }

    /// Make every one-shot step of this role exit with `code`
    pub fn with_exit_code(mut self, role: ServiceRole, code: i32) -> Self {
        self.exit_codes.insert(role, code);
        self
    }

    /// Hand this stdout and stderr back to captured one-shot steps of this role
    pub fn with_output(mut self, role: ServiceRole, stdout: &str, stderr: &str) -> Self {
        self.outputs.insert(role, (stdout.to_string(), stderr.to_string()));
        self
    }

    /// Build the mock and the shared launch log it writes to
    pub fn build(self) -> (MockSupervisor, Arc<Mutex<Vec<LaunchRecord>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let started = Arc::new(Mutex::new(Vec::new()));
        let mut supervisor = MockSupervisor::new();

        let (start_log, start_registry) = (log.clone(), started.clone());
        let on_start = self.on_start;
        supervisor
            .expect_start()
            .times(self.starts)
            .returning(move |spec, readiness| {
                start_log
                    .lock()
                    .unwrap()
                    .push(LaunchRecord::from_spec(&spec, Some(readiness)));
                let mut registry = start_registry.lock().unwrap();
                let pid = 1000 + registry.len() as u32;
                registry.push((spec.role, pid));
                if let Some(notify) = &on_start {
                    notify.notify_one();
                }
                Ok(pid)
            });

        let run_log = log.clone();
        let (exit_codes, outputs) = (self.exit_codes, self.outputs);
        supervisor
            .expect_run_to_completion()
            .times(self.runs)
            .returning(move |spec| {
                let record = LaunchRecord::from_spec(&spec, None);
                let output = outputs.get(&spec.role).filter(|_| record.captured).cloned();
                run_log.lock().unwrap().push(record);
                Ok(Completion {
                    code: Some(exit_codes.get(&spec.role).copied().unwrap_or(0)),
                    stdout: output.as_ref().map(|(stdout, _)| stdout.clone()),
                    stderr: output.map(|(_, stderr)| stderr),
                })
            });

        let running = started.clone();
        supervisor
            .expect_running()
            .times(1)
            .returning(move || running.lock().unwrap().clone());

        supervisor.expect_kill_all().times(1).returning(move || {
            let handled: Vec<_> = started.lock().unwrap().drain(..).rev().collect();
            KillReport {
                handled,
                ..Default::default()
            }
        });

        (supervisor, log)
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Resolve a configuration from the fixture's tests dir with an isolated environment
    pub fn resolve(
        fixture: &RepoFixture,
        cli: RunConfiguration,
        json: Option<&std::path::Path>,
        env: &HashMap<String, String>,
    ) -> RunnerResult<ResolvedRun> {
        ArgumentResolver::new(fixture.tests_dir(), env).resolve(cli, json)
    }

    /// Run context around a mock supervisor for a resolved run
    pub fn context(resolved: &ResolvedRun, supervisor: MockSupervisor) -> RunContext {
        let scratch = ScratchDirectory::new(resolved.config.scratch_dir().unwrap(), resolved.config.keep_scratch());
        RunContext::new(Box::new(supervisor), scratch)
    }

    /// Roles of the recorded launches in order
    pub fn roles(log: &Arc<Mutex<Vec<LaunchRecord>>>) -> Vec<ServiceRole> {
        log.lock().unwrap().iter().map(|record| record.role).collect()
    }

    /// The single recorded launch for a role
    pub fn launch_of(log: &Arc<Mutex<Vec<LaunchRecord>>>, role: ServiceRole) -> LaunchRecord {
        let log = log.lock().unwrap();
        let matching: Vec<_> = log.iter().filter(|record| record.role == role).collect();
        assert_eq!(matching.len(), 1, "expected exactly one launch of {role}");
        matching[0].clone()
    }
}
