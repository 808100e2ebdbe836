//! Runner-specific error types

use shared::SharedError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Resource operation failed: {operation} on {path}: {message}")]
    ResourceError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Process error ({role}): {message}")]
    ProcessError { role: String, message: String },

    #[error("Test execution failed: {message}")]
    ExecutionError { message: String },

    #[error("Interrupted by {signal}")]
    Interrupted { signal: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RunnerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn resource(operation: impl Into<String>, path: &Path, message: impl ToString) -> Self {
        Self::ResourceError {
            operation: operation.into(),
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn process(role: impl ToString, message: impl Into<String>) -> Self {
        Self::ProcessError {
            role: role.to_string(),
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError { message: message.into() }
    }

    /// Errors raised before any service was started
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. } | Self::ValidationError { .. })
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
