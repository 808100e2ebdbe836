//! Service implementations
//!
//! This module contains the real implementations behind a test run: the
//! process supervisor, readiness polling, the scratch directory lifecycle and
//! the log file registry.

pub mod log_files;
pub mod process_supervisor;
pub mod readiness;
pub mod scratch;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use log_files::{LogRegistry, LogTarget};
pub use process_supervisor::{ManagedProcess, ProcessSupervisor};
pub use readiness::{ReadinessPolicy, ReadinessProbe};
pub use scratch::{ResourceLifecycleManager, ScratchDirectory};
