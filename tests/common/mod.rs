//! Resources shared by the integration tests.
#![allow(dead_code)]

use resource_bridge::{
    DescriptorTable, FilterOperatorRegistry, QueryTranslator, Relation, Resource,
    ResourceDescriptor, ValueKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const BASE_URL: &str = "http://api";

/// String project id; ids handed out by an in-memory store read `p1`, `p2`, ...
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(pub String);

impl ProjectKey {
    pub fn new(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<u64> for ProjectKey {
    fn from(id: u64) -> Self {
        Self(format!("p{id}"))
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProjectKey>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub project: Option<Relation<Project>>,
}

impl Task {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            done: false,
            project: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

impl Resource for Project {
    type Id = ProjectKey;
    const RESOURCE_TYPE: &'static str = "projects";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::builder(Self::RESOURCE_TYPE)
            .id("id", ValueKind::String)
            .attribute("name", ValueKind::String)
            .build()
    }

    fn id(&self) -> Option<&ProjectKey> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: ProjectKey) {
        self.id = Some(id);
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
            .to_one("project", "projects")
            .build()
    }

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

pub fn descriptors() -> Arc<DescriptorTable> {
    Arc::new(
        DescriptorTable::builder()
            .register::<Project>()
            .register::<Task>()
            .build()
            .expect("descriptor table"),
    )
}

pub fn translator() -> Arc<QueryTranslator> {
    Arc::new(QueryTranslator::new(
        descriptors(),
        Arc::new(FilterOperatorRegistry::with_defaults()),
    ))
}
