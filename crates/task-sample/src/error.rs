//! Error types for the task tracker clients.

use thiserror::Error;

/// Errors that can occur during task operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskError {
    /// The requested task was not found.
    #[error("Task not found: {0}")]
    NotFound(u64),

    /// The task was already completed.
    #[error("Task already done: {0}")]
    AlreadyDone(u64),

    /// The task data provided is invalid.
    #[error("Task validation error: {0}")]
    ValidationError(String),

    /// The server rejected the request or could not be reached.
    #[error("Task service error: {0}")]
    ServiceError(String),
}

impl From<String> for TaskError {
    fn from(msg: String) -> Self {
        TaskError::ServiceError(msg)
    }
}

/// Errors that can occur during project operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project has no owner: {0}")]
    NoOwner(String),

    #[error("Project service error: {0}")]
    ServiceError(String),
}

impl From<String> for ProjectError {
    fn from(msg: String) -> Self {
        ProjectError::ServiceError(msg)
    }
}
