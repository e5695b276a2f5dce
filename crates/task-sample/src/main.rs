//! # Task Tracker Demo
//!
//! Runs the full client/server round trip in one process:
//! 1.  Setting up the [`TaskSystem`].
//! 2.  Creating a person, a project and a few tasks through the clients.
//! 3.  Querying open tasks, completing one, and paging through the rest.
//!
//! ```bash
//! RUST_LOG=info cargo run -p task-sample
//! RUST_LOG=debug cargo run -p task-sample   # full documents and queries
//! ```

use resource_bridge::tracing::setup_tracing;
use resource_bridge::{ResourceRepository, TypedClient};
use task_sample::lifecycle::TaskSystem;
use task_sample::model::{Person, Project, Task};
use tracing::{error, info, info_span};

fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting task tracker");
    let system = TaskSystem::new().map_err(|e| e.to_string())?;

    let (project_id, owner_id) = info_span!("setup").in_scope(|| {
        let owner = system
            .people
            .create(Person::new("Ada", "ada@example.com"))
            .map_err(|e| e.to_string())?;
        let project_id = system
            .project_client
            .create_project(Project::new("Bridge").owned_by(owner.clone()))
            .map_err(|e| e.to_string())?;
        info!(%project_id, "Project created");
        Ok::<_, String>((project_id, owner.id.unwrap_or_default()))
    })?;

    let span = info_span!("task_creation", %project_id);
    let tasks = span.in_scope(|| {
        ["write docs", "review", "ship", "celebrate"]
            .into_iter()
            .zip([1, 3, 2, 0])
            .map(|(name, priority)| {
                system.task_client.create_task(
                    Task::new(name)
                        .with_priority(priority)
                        .in_project(project_id.clone())
                        .assigned_to(owner_id),
                )
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())
    })?;
    info!(count = tasks.len(), "Tasks created");

    let span = info_span!("task_processing");
    let _enter = span.enter();

    let open = system
        .task_client
        .open_tasks(&project_id)
        .map_err(|e| e.to_string())?;
    for task in &open {
        info!(id = ?task.id, name = %task.name, priority = task.priority, "Open task");
    }

    if let Some(id) = open.first().and_then(|task| task.id) {
        match system.task_client.complete(id) {
            Ok(task) => info!(id, name = %task.name, "Completed most urgent task"),
            Err(e) => error!(error = %e, "Completing task failed"),
        }
    }

    let page = system
        .task_client
        .search("filter[done]=false&sort=id&page[limit]=2")
        .map_err(|e| e.to_string())?;
    info!(names = ?page.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), "First page of open tasks");

    let owner = system
        .project_client
        .owner(project_id.clone())
        .map_err(|e| e.to_string())?;
    info!(owner = %owner.name, "Project owner");

    let remaining = system.task_client.list(None).map_err(|e| e.to_string())?;
    info!(total = remaining.len(), "Application completed successfully");
    Ok(())
}
