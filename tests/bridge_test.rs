mod common;

use common::{descriptors, translator, Project, ProjectKey, Task, BASE_URL};
use resource_bridge::{
    BridgeClient, BridgeError, ClientConfig, Document, DocumentMapper, FilterOperator, FilterSpec,
    HttpMethod, InMemoryRepository, LoopbackTransport, QueryParams, QuerySpec, RawQuery, RawResult, Relation,
    RepositoryEntry, RequestDispatcher, ResourceRepository, ResponseAssembler, SortSpec,
    TransportError,
};
use serde_json::json;
use std::sync::Arc;

fn project(id: &str, name: &str) -> Project {
    Project {
        id: Some(ProjectKey::new(id)),
        name: name.to_string(),
    }
}

fn seeded_tasks() -> InMemoryRepository<Task> {
    let tasks = ["write docs", "review", "ship"].map(|name| {
        let mut task = Task::new(name);
        task.project = Some(Relation::Loaded(project("bridge", "Bridge")));
        task
    });
    InMemoryRepository::with_entities(tasks).unwrap()
}

/// Server and client wired together in one process.
fn loopback(entry: RepositoryEntry<Task>) -> BridgeClient {
    let projects = InMemoryRepository::<Project>::new();
    let dispatcher = RequestDispatcher::new(translator())
        .register(entry)
        .unwrap()
        .register(RepositoryEntry::new(Arc::new(projects)))
        .unwrap();
    let transport = LoopbackTransport::new(BASE_URL, Arc::new(dispatcher));
    BridgeClient::new(ClientConfig::new(BASE_URL), translator(), Arc::new(transport))
}

#[test]
fn test_envelope_survives_document_round_trip() {
    let translator = translator();
    let entry = seeded_tasks().with_paging_info(translator.clone());
    let query = QuerySpec::new("tasks").include("project").limit(2);

    let items = entry.repository().find_all(Some(&query)).unwrap();
    let envelope = ResponseAssembler::new(translator.clone())
        .assemble(&entry, RawResult::Collection(items.clone()), Some(&query))
        .unwrap();
    assert_eq!(envelope.meta.as_ref().unwrap().get("total"), Some(&json!(3)));
    let links = envelope.links.as_ref().unwrap();
    assert_eq!(
        links.next.as_deref(),
        Some("/tasks?page[limit]=2&page[offset]=2&include=project")
    );

    let mapper = DocumentMapper::new(descriptors());
    let document = mapper.to_document(&envelope, Some(&query)).unwrap();
    assert_eq!(document.included.len(), 1);

    // Through JSON text and back, as a remote peer would see it.
    let text = serde_json::to_string(&document).unwrap();
    let parsed: Document = serde_json::from_str(&text).unwrap();
    assert_eq!(document, parsed);

    let rebuilt = mapper.to_collection::<Task>(&parsed).unwrap();
    assert_eq!(rebuilt, items);
}

#[test]
fn test_missing_capabilities_leave_envelope_bare() {
    let translator = translator();
    let assembler = ResponseAssembler::new(translator);
    let query = QuerySpec::new("tasks");

    let plain = seeded_tasks().into_entry();
    let items = plain.repository().find_all(None).unwrap();
    let envelope = assembler
        .assemble(&plain, RawResult::Collection(items.clone()), Some(&query))
        .unwrap();
    assert!(envelope.meta.is_none());
    assert!(envelope.links.is_none());

    let meta_only = RepositoryEntry::new(Arc::new(seeded_tasks()))
        .with_meta(Arc::new(seeded_tasks()));
    let envelope = assembler
        .assemble(&meta_only, RawResult::Collection(items), Some(&query))
        .unwrap();
    assert!(envelope.meta.is_some());
    assert!(envelope.links.is_none());
}

#[test]
fn test_flat_and_typed_queries_agree() {
    let translator = translator();
    let repository = seeded_tasks();

    let flat = QueryParams::parse("filter[id][GE]=2&sort=-id&page[limit]=1").unwrap();
    let from_flat = translator.translate_for(RawQuery::Params(flat), "tasks").unwrap();
    let typed = QuerySpec::new("tasks")
        .filter(FilterSpec::new("id", FilterOperator::GE, 2))
        .sort(SortSpec::desc("id"))
        .limit(1);
    assert_eq!(from_flat, typed);

    let a = repository.find_all(Some(&from_flat)).unwrap();
    let b = repository.find_all(Some(&typed)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a[0].id, Some(3));
}

#[test]
fn test_loopback_end_to_end() {
    let client = loopback(seeded_tasks().with_paging_info(translator()));
    let tasks = client.repository::<Task>().unwrap();

    let created = tasks.create(Task::new("celebrate")).unwrap();
    assert_eq!(created.id, Some(4));

    let found = tasks.find_one(&4, None).unwrap();
    assert_eq!(found.name, "celebrate");

    let mut renamed = found.clone();
    renamed.name = "celebrate loudly".into();
    renamed.done = true;
    tasks.update(renamed.clone()).unwrap();
    assert_eq!(tasks.find_one(&4, None).unwrap(), renamed);

    let done = QuerySpec::new("tasks").filter(FilterSpec::eq("done", true));
    let found = tasks.find_all(Some(&done)).unwrap();
    assert_eq!(found, vec![renamed]);

    let by_ids = tasks.find_all_by_ids(&[2, 1], None).unwrap();
    assert_eq!(by_ids.iter().filter_map(|t| t.id).collect::<Vec<_>>(), vec![2, 1]);

    tasks.delete(&4).unwrap();
    match tasks.find_one(&4, None) {
        Err(BridgeError::Transport(TransportError::Status { status, .. })) => assert_eq!(status, 404),
        other => panic!("Expected 404, got {other:?}"),
    }
}

#[test]
fn test_loopback_includes_related_resources() {
    let client = loopback(seeded_tasks().into_entry());
    let tasks = client.repository::<Task>().unwrap();

    let with_project = QuerySpec::new("tasks").include("project");
    let found = tasks.find_one(&1, Some(&with_project)).unwrap();
    assert_eq!(found.project, Some(Relation::Loaded(project("bridge", "Bridge"))));

    // Without the inclusion only the reference comes back.
    let found = tasks.find_one(&1, None).unwrap();
    assert_eq!(found.project, Some(Relation::reference(ProjectKey::new("bridge"))));
}

#[test]
fn test_loopback_sparse_fieldsets() {
    let client = loopback(seeded_tasks().into_entry());
    let tasks = client.repository::<Task>().unwrap();

    let only_done = QuerySpec::new("tasks").fields("tasks", ["done"]);
    let found = tasks.find_all(Some(&only_done)).unwrap();

    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|task| task.name.is_empty() && !task.done));
    assert_eq!(found.iter().filter_map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_loopback_paging_follows_filters() {
    let translator = translator();
    let projects = InMemoryRepository::<Project>::new();
    let dispatcher = RequestDispatcher::new(translator.clone())
        .register(seeded_tasks().with_paging_info(translator.clone()))
        .unwrap()
        .register(RepositoryEntry::new(Arc::new(projects)))
        .unwrap();

    let response =
        dispatcher.dispatch_target(HttpMethod::Get, "/tasks?filter[name]=review&page[limit]=1", None);
    let body = response.body.unwrap();
    assert_eq!(body.primary().len(), 1);
    assert_eq!(body.meta.unwrap().get("total"), Some(&json!(1)));
    let links = body.links.unwrap();
    assert!(links.next.is_none());
    assert_eq!(
        links.last.as_deref(),
        Some("/tasks?filter[name]=review&page[limit]=1&page[offset]=0")
    );
}

#[test]
fn test_loopback_rejects_invalid_queries() {
    let client = loopback(seeded_tasks().into_entry());
    let tasks = client.repository::<Task>().unwrap();

    let bogus = QuerySpec::new("tasks").filter(FilterSpec::eq("color", "red"));
    match tasks.find_all(Some(&bogus)) {
        Err(BridgeError::Transport(TransportError::Status { status, body })) => {
            assert_eq!(status, 400);
            let errors = body.unwrap().errors;
            assert!(errors[0].detail.as_ref().unwrap().contains("color"));
        }
        other => panic!("Expected 400, got {other:?}"),
    }
}
