//! Common test utilities and infrastructure
//!
//! Shared fixtures and helpers used across the test runner's test suites.

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::{RepoFixture, TestFixtures};
pub use helpers::{LaunchRecord, SupervisorBuilder, TestHelpers};
