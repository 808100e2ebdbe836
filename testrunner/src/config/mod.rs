//! Run configuration: command line, JSON file, defaults and validation

pub mod args;
pub mod credentials;
pub mod defaults;
pub mod resolver;
pub mod run_config;

pub use args::CliArgs;
pub use credentials::{EnvSource, ProcessEnv};
pub use resolver::{ArgumentResolver, ResolvedRun};
pub use run_config::{RunConfiguration, Secret};
