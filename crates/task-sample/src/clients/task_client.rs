//! # Task Client
//!
//! Provides a high-level API for the `tasks` resource.
//! It wraps a `RepositoryStub<Task>` and exposes domain-specific methods.
use crate::error::TaskError;
use crate::model::{ProjectId, Task};
use resource_bridge::{
    BridgeError, FilterSpec, QueryParams, QuerySpec, RepositoryStub, ResourceRepository,
    SortSpec, TypedClient,
};
use tracing::{debug, info, instrument};

/// Client for the remote task repository.
#[derive(Debug, Clone)]
pub struct TaskClient {
    inner: RepositoryStub<Task>,
}

impl TaskClient {
    pub fn new(inner: RepositoryStub<Task>) -> Self {
        Self { inner }
    }
}

impl TypedClient<Task> for TaskClient {
    type Error = TaskError;

    fn inner(&self) -> &RepositoryStub<Task> {
        &self.inner
    }

    fn map_error(e: BridgeError) -> Self::Error {
        match e {
            BridgeError::NotFound { id, .. } => id
                .parse()
                .map(TaskError::NotFound)
                .unwrap_or_else(|_| TaskError::ServiceError(format!("Task not found: {id}"))),
            other => TaskError::ServiceError(other.to_string()),
        }
    }
}

impl TaskClient {
    /// Creates a task; the returned task carries the id the server assigned.
    #[instrument(skip(self))]
    pub fn create_task(&self, task: Task) -> Result<Task, TaskError> {
        debug!("Sending request");
        if task.name.trim().is_empty() {
            return Err(TaskError::ValidationError("name must not be empty".into()));
        }
        self.inner.create(task).map_err(Self::map_error)
    }

    /// Marks a task as done.
    #[instrument(skip(self))]
    pub fn complete(&self, id: u64) -> Result<Task, TaskError> {
        let mut task = self.get(id)?.ok_or(TaskError::NotFound(id))?;
        if task.done {
            return Err(TaskError::AlreadyDone(id));
        }
        task.done = true;
        let task = self.inner.update(task).map_err(Self::map_error)?;
        info!(task_id = id, "Task completed");
        Ok(task)
    }

    /// Open tasks of a project, most urgent first.
    #[instrument(skip(self))]
    pub fn open_tasks(&self, project: &ProjectId) -> Result<Vec<Task>, TaskError> {
        let query = QuerySpec::new("tasks")
            .filter(FilterSpec::eq("done", false))
            .filter(FilterSpec::eq("project", project.to_string()))
            .sort(SortSpec::desc("priority"))
            .sort(SortSpec::asc("id"));
        self.list(Some(&query))
    }

    /// Runs a query given in its URL form, e.g. `filter[priority][GE]=2&page[limit]=5`.
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> Result<Vec<Task>, TaskError> {
        debug!("Sending request");
        let params = QueryParams::parse(query).map_err(|e| TaskError::ValidationError(e.to_string()))?;
        self.inner
            .find_all_with_params(&params)
            .map_err(Self::map_error)
    }
}
