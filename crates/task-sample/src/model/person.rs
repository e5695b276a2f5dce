use resource_bridge::{Resource, ResourceDescriptor, ValueKind};
use serde::{Deserialize, Serialize};

/// Someone who owns projects and works on tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Resource for Person {
    type Id = u64;
    const RESOURCE_TYPE: &'static str = "people";

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::builder(Self::RESOURCE_TYPE)
            .id("id", ValueKind::Integer)
            .attribute("name", ValueKind::String)
            .attribute("email", ValueKind::String)
            .build()
    }

    fn id(&self) -> Option<&u64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}
