use super::Person;
use resource_bridge::{Cardinality, Relation, Resource, ResourceDescriptor, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Type-safe identifier for Projects.
///
/// Travels as a plain string (`project_1`); ids handed out by a store are numbered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl From<u64> for ProjectId {
    fn from(id: u64) -> Self {
        Self(format!("project_{id}"))
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// A group of tasks with one owner.
///
/// The owner is always sent along with a project, whether or not the request asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProjectId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<Relation<Person>>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            owner: None,
        }
    }

    pub fn owned_by(mut self, owner: Person) -> Self {
        self.owner = Some(Relation::Loaded(owner));
        self
    }
}

impl Resource for Project {
    type Id = ProjectId;
    const RESOURCE_TYPE: &'static str = "projects";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::builder(Self::RESOURCE_TYPE)
            .id("id", ValueKind::String)
            .attribute("name", ValueKind::String)
            .relationship("owner", "people", Cardinality::ToOne, true)
            .build()
    }

    fn id(&self) -> Option<&ProjectId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: ProjectId) {
        self.id = Some(id);
    }
}
