//! Shared types for the test runner workspace
//!
//! Contains the service roles used to tag managed processes and log lines,
//! the shared error type, and the tracing setup every binary uses.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
