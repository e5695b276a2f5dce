//! # System Lifecycle & Wiring
//!
//! [`TaskSystem`] builds both halves of the bridge in one process and hands out the clients:
//!
//! 1. **Descriptors** - one table for people, projects and tasks.
//! 2. **Translator** - default operators everywhere, except that people cannot be filtered
//!    with `LIKE`.
//! 3. **Repositories** - in-memory stores, each registered with the capabilities it offers:
//!    tasks with meta and paging links, projects with meta only, people with neither.
//! 4. **Dispatcher** - serves all three resource types.
//! 5. **Client** - talks to the dispatcher through a [`LoopbackTransport`].
//!
//! Swapping the loopback for a real HTTP transport leaves everything above it unchanged.
//!
//! Clients only ever send references to related resources, so stored tasks know their
//! project and assignees by id. [`TaskSystem::import_tasks`] writes straight into the task
//! store instead, keeping related resources loaded so they can be included in responses.

use crate::clients::{ProjectClient, TaskClient};
use crate::model::{Person, Project, Task};
use resource_bridge::{
    BridgeClient, BridgeError, ClientConfig, DescriptorTable, FilterOperatorRegistry,
    InMemoryRepository, LoopbackTransport, QueryTranslator, RepositoryEntry, RepositoryStub,
    RequestDispatcher, ResourceRepository,
};
use std::sync::Arc;
use tracing::info;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// The task tracker: server-side repositories plus the clients that reach them.
///
/// # Example
///
/// ```rust
/// use resource_bridge::TypedClient;
/// use task_sample::lifecycle::TaskSystem;
/// use task_sample::model::Task;
///
/// let system = TaskSystem::new().unwrap();
/// let task = system.task_client.create_task(Task::new("write docs")).unwrap();
/// assert!(system.task_client.get(task.id.unwrap()).unwrap().is_some());
/// ```
#[derive(Debug)]
pub struct TaskSystem {
    /// Client for the `tasks` resource
    pub task_client: TaskClient,

    /// Client for the `projects` resource
    pub project_client: ProjectClient,

    /// Plain stub for the `people` resource
    pub people: RepositoryStub<Person>,

    dispatcher: Arc<RequestDispatcher>,
    tasks: Arc<InMemoryRepository<Task>>,
}

impl TaskSystem {
    /// Creates a system served at [`DEFAULT_BASE_URL`].
    pub fn new() -> Result<Self, BridgeError> {
        Self::with_config(ClientConfig::new(DEFAULT_BASE_URL))
    }

    /// Creates a system configured from `RESOURCE_BRIDGE_BASE_URL` and
    /// `RESOURCE_BRIDGE_ALWAYS_CREATE`.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, BridgeError> {
        let descriptors = DescriptorTable::builder()
            .register::<Person>()
            .register::<Project>()
            .register::<Task>()
            .build()?;

        let mut people_operators = FilterOperatorRegistry::with_defaults();
        people_operators.unregister("LIKE");
        let translator = Arc::new(
            QueryTranslator::new(
                Arc::new(descriptors),
                Arc::new(FilterOperatorRegistry::with_defaults()),
            )
            .with_registry_for("people", Arc::new(people_operators)),
        );

        let tasks = Arc::new(InMemoryRepository::<Task>::new().with_translator(translator.clone()));
        let projects =
            Arc::new(InMemoryRepository::<Project>::new().with_translator(translator.clone()));
        let people = InMemoryRepository::<Person>::new().with_translator(translator.clone());
        let dispatcher = RequestDispatcher::new(translator.clone())
            .register(RepositoryEntry::full(tasks.clone()))?
            .register(RepositoryEntry::new(projects.clone()).with_meta(projects))?
            .register(people.into_entry())?;
        let dispatcher = Arc::new(dispatcher);

        let transport = LoopbackTransport::new(config.base_url(), dispatcher.clone());
        info!(base_url = config.base_url(), always_create = config.always_create(), "Starting task system");
        let client = BridgeClient::new(config, translator, Arc::new(transport));

        Ok(Self {
            task_client: TaskClient::new(client.repository()?),
            project_client: ProjectClient::new(client.repository()?, client.repository()?),
            people: client.repository()?,
            dispatcher,
            tasks,
        })
    }

    /// Stores tasks server-side without going through a client.
    pub fn import_tasks(&self, tasks: impl IntoIterator<Item = Task>) -> Result<Vec<Task>, BridgeError> {
        let imported = tasks
            .into_iter()
            .map(|task| self.tasks.create(task))
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = imported.len(), "Imported tasks");
        Ok(imported)
    }

    /// The server side, for requests that do not go through a client.
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }
}
