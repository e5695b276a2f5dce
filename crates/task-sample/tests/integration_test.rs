use resource_bridge::{HttpMethod, QuerySpec, Relation, ResourceRepository, TypedClient};
use task_sample::error::{ProjectError, TaskError};
use task_sample::lifecycle::TaskSystem;
use task_sample::model::{Person, Project, ProjectId, Task};

/// Full end-to-end test: clients, loopback and in-memory repositories together.
#[test]
fn test_full_task_system_integration() {
    let system = TaskSystem::new().expect("Failed to start system");

    // Create the owner and a project
    let ada = system
        .people
        .create(Person::new("Ada", "ada@example.com"))
        .expect("Failed to create person");
    assert_eq!(ada.id, Some(1));

    let project_id = system
        .project_client
        .create_project(Project::new("Bridge").owned_by(ada.clone()))
        .expect("Failed to create project");
    assert_eq!(project_id, ProjectId("project_1".into()));

    // Create tasks with different priorities
    for (name, priority) in [("write docs", 1), ("review", 3), ("ship", 2)] {
        system
            .task_client
            .create_task(Task::new(name).with_priority(priority).in_project(project_id.clone()))
            .expect("Failed to create task");
    }
    // A task outside the project
    system
        .task_client
        .create_task(Task::new("unrelated").with_priority(9))
        .expect("Failed to create task");

    // Open tasks come back most urgent first
    let open = system.task_client.open_tasks(&project_id).unwrap();
    let names: Vec<_> = open.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["review", "ship", "write docs"]);

    // Completing removes a task from the open list
    let review_id = open[0].id.unwrap();
    let done = system.task_client.complete(review_id).unwrap();
    assert!(done.done);
    assert_eq!(
        system.task_client.complete(review_id),
        Err(TaskError::AlreadyDone(review_id))
    );
    assert_eq!(system.task_client.open_tasks(&project_id).unwrap().len(), 2);

    // The owner is resolved through the people repository
    let owner = system.project_client.owner(project_id.clone()).unwrap();
    assert_eq!(owner, ada);

    // Delete and confirm
    system.task_client.delete(review_id).unwrap();
    assert_eq!(system.task_client.get(review_id).unwrap(), None);
}

#[test]
fn test_task_validation_and_missing_tasks() {
    let system = TaskSystem::new().unwrap();

    let result = system.task_client.create_task(Task::new("   "));
    assert!(matches!(result, Err(TaskError::ValidationError(_))));

    assert_eq!(system.task_client.complete(42), Err(TaskError::NotFound(42)));
    assert!(matches!(
        system.project_client.owner(ProjectId("project_9".into())),
        Err(ProjectError::NotFound(_))
    ));
}

#[test]
fn test_search_with_url_queries() {
    let system = TaskSystem::new().unwrap();
    for priority in 0..5 {
        system
            .task_client
            .create_task(Task::new(format!("task {priority}")).with_priority(priority))
            .unwrap();
    }

    let found = system
        .task_client
        .search("filter[priority][GE]=2&sort=-priority&page[limit]=2")
        .unwrap();
    let priorities: Vec<_> = found.iter().map(|t| t.priority).collect();
    assert_eq!(priorities, vec![4, 3]);

    // Unknown fields are rejected before anything is sent.
    let result = system.task_client.search("filter[colour]=red");
    assert!(matches!(result, Err(TaskError::ServiceError(ref msg)) if msg.contains("colour")));
}

#[test]
fn test_dispatcher_serves_capabilities_per_type() {
    let system = TaskSystem::new().unwrap();
    system.task_client.create_task(Task::new("a")).unwrap();
    system
        .project_client
        .create_project(Project::new("Bridge"))
        .unwrap();
    system.people.create(Person::new("Ada", "ada@example.com")).unwrap();

    let dispatcher = system.dispatcher();

    // Tasks: meta and links
    let body = dispatcher
        .dispatch_target(HttpMethod::Get, "/tasks?page[limit]=10", None)
        .body
        .unwrap();
    assert!(body.meta.is_some());
    assert!(body.links.is_some());

    // Projects: meta only
    let body = dispatcher
        .dispatch_target(HttpMethod::Get, "/projects", None)
        .body
        .unwrap();
    assert!(body.meta.is_some());
    assert!(body.links.is_none());

    // People: neither, and no LIKE filter
    let response = dispatcher.dispatch_target(HttpMethod::Get, "/people", None);
    let body = response.body.unwrap();
    assert!(body.meta.is_none());
    assert!(body.links.is_none());

    let response = dispatcher.dispatch_target(HttpMethod::Get, "/people?filter[name][LIKE]=A%25", None);
    assert_eq!(response.status, 400);
    let response = dispatcher.dispatch_target(HttpMethod::Get, "/tasks?filter[name][LIKE]=a%25", None);
    assert_eq!(response.status, 200);
}

#[test]
fn test_related_resources_included_on_request() {
    let system = TaskSystem::new().unwrap();
    let ada = system
        .people
        .create(Person::new("Ada", "ada@example.com"))
        .unwrap();
    let mut task = Task::new("pair");
    task.assignees.push(Relation::Loaded(ada.clone()));
    let task = system.import_tasks([task]).unwrap().remove(0);

    // Through the client, the assignee arrives loaded only when asked for.
    let plain = system.task_client.get(task.id.unwrap()).unwrap().unwrap();
    assert!(!plain.assignees[0].is_loaded());

    let body = system
        .dispatcher()
        .dispatch_target(
            HttpMethod::Get,
            &format!("/tasks/{}?include=assignees&fields[people]=name", task.id.unwrap()),
            None,
        )
        .body
        .unwrap();
    assert_eq!(body.included.len(), 1);
    let person = &body.included[0];
    assert_eq!(person.resource_type, "people");
    assert!(person.attributes.contains_key("name"));
    assert!(!person.attributes.contains_key("email"));

    let with_assignees = QuerySpec::new("tasks").include("assignees");
    let found = system.task_client.list(Some(&with_assignees)).unwrap();
    assert_eq!(found[0].assignees, vec![Relation::Loaded(ada)]);
}

#[test]
fn test_system_debug_output() {
    let system = TaskSystem::new().unwrap();
    system.task_client.create_task(Task::new("a")).unwrap();

    let debug = format!("{system:?}");
    assert!(debug.contains("InMemoryRepository"));
    assert!(debug.contains("size: Some(1)"));
}

#[test]
fn test_sparse_task_reads_and_filtered_paging() {
    let system = TaskSystem::new().unwrap();
    for (name, done) in [("a", false), ("b", true), ("c", false)] {
        let mut task = Task::new(name).with_priority(1);
        task.done = done;
        system.task_client.create_task(task).unwrap();
    }

    // Only `done` travels; the other attributes come back as defaults.
    let only_done = QuerySpec::new("tasks").fields("tasks", ["done"]);
    let found = system.task_client.list(Some(&only_done)).unwrap();
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|task| task.name.is_empty() && task.priority == 0));
    assert_eq!(found.iter().filter(|task| task.done).count(), 1);

    // Paging info counts only the open tasks.
    let body = system
        .dispatcher()
        .dispatch_target(HttpMethod::Get, "/tasks?filter[done]=false&page[limit]=1", None)
        .body
        .unwrap();
    assert_eq!(body.meta.unwrap().get("total").and_then(|t| t.as_u64()), Some(2));
    let links = body.links.unwrap();
    assert_eq!(
        links.next.as_deref(),
        Some("/tasks?filter[done]=false&page[limit]=1&page[offset]=1")
    );
    assert_eq!(
        links.last.as_deref(),
        Some("/tasks?filter[done]=false&page[limit]=1&page[offset]=1")
    );
}
