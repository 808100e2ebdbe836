//! Argument resolution pipeline
//!
//! load JSON → merge (command line wins) → absolutize → validate →
//! common defaults → strategy defaults.

use std::path::{Path, PathBuf};

use super::credentials::EnvSource;
use super::defaults;
use super::run_config::RunConfiguration;
use crate::error::RunnerResult;
use crate::strategy::StrategyKind;
use shared::{process_debug, process_info, process_warn, ServiceRole};

/// A validated configuration with every default filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    pub kind: StrategyKind,
    pub config: RunConfiguration,
}

/// Turns command line and JSON input into a `ResolvedRun`
pub struct ArgumentResolver<'a> {
    cwd: PathBuf,
    env: &'a dyn EnvSource,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(cwd: impl Into<PathBuf>, env: &'a dyn EnvSource) -> Self {
        Self { cwd: cwd.into(), env }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Merge the two sources and make every path absolute
    pub fn load(&self, cli: RunConfiguration, json: Option<&Path>) -> RunnerResult<RunConfiguration> {
        let mut config = match json {
            Some(path) => {
                let path = if path.is_relative() { self.cwd.join(path) } else { path.to_path_buf() };
                process_info!(
                    ServiceRole::Runner,
                    "JSON config {} given; command line values take priority over it",
                    path.display()
                );
                RunConfiguration::from_json_file(&path)?.merged_with(cli)
            }
            None => cli,
        };
        config.absolutize(&self.cwd);
        Ok(config)
    }

    /// Common checks first, then the selected strategy's own validator
    pub fn validate(&self, config: &RunConfiguration) -> RunnerResult<StrategyKind> {
        let kind = config.kind()?;
        if config.stop_tests_on_failure == Some(true) && !kind.uses_compiled_binary() {
            process_warn!(
                ServiceRole::Runner,
                "stop_tests_on_failure only applies to googletest runs; ignoring it for '{}'",
                kind
            );
        }
        kind.strategy().validate(config)?;
        Ok(kind)
    }

    /// Common defaults first, then the strategy defaults
    pub fn fill_defaults(&self, config: &mut RunConfiguration) -> RunnerResult<()> {
        let kind = config.kind()?;
        defaults::apply_common(config, &self.cwd)?;
        kind.strategy().resolve_defaults(config, &self.cwd, self.env)
    }

    /// Run the whole pipeline
    pub fn resolve(&self, cli: RunConfiguration, json: Option<&Path>) -> RunnerResult<ResolvedRun> {
        let mut config = self.load(cli, json)?;
        let kind = self.validate(&config)?;
        self.fill_defaults(&mut config)?;
        process_debug!(ServiceRole::Runner, "Resolved configuration: {:?}", config);
        Ok(ResolvedRun { kind, config })
    }
}
