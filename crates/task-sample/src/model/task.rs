use super::{Person, Project, ProjectId};
use resource_bridge::{Relation, Resource, ResourceDescriptor, ValueKind};
use serde::{Deserialize, Serialize};

/// A unit of work.
///
/// # Relationships
/// - `project` (to-one) - the project the task belongs to.
/// - `assignees` (to-many) - people working on it.
///
/// Both are sent as references unless the request includes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub project: Option<Relation<Project>>,
    #[serde(default)]
    pub assignees: Vec<Relation<Person>>,
}

impl Task {
    /// Creates an open task without an id; the store assigns one.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            done: false,
            priority: 0,
            project: None,
            assignees: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn in_project(mut self, project: ProjectId) -> Self {
        self.project = Some(Relation::reference(project));
        self
    }

    pub fn assigned_to(mut self, person: u64) -> Self {
        self.assignees.push(Relation::reference(person));
        self
    }
}

impl Resource for Task {
    type Id = u64;
    const RESOURCE_TYPE: &'static str = "tasks";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::builder(Self::RESOURCE_TYPE)
            .id("id", ValueKind::Integer)
            .attribute("name", ValueKind::String)
            .attribute("done", ValueKind::Boolean)
            .attribute("priority", ValueKind::Integer)
            .to_one("project", "projects")
            .to_many("assignees", "people")
            .build()
    }

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}
