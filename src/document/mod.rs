//! # Wire Documents
//!
//! The JSON:API shaped document tree exchanged between client and server. It derives the
//! serde traits so any collaborator can encode it; the bridge itself never deals with text.
//!
//! ```json
//! {
//!   "data": { "type": "tasks", "id": "5",
//!             "attributes": { "name": "write docs" },
//!             "relationships": { "project": { "data": { "type": "projects", "id": "p1" } } } },
//!   "included": [ { "type": "projects", "id": "p1", "attributes": { "name": "Bridge" } } ]
//! }
//! ```
//!
//! The [`DocumentMapper`] converts between these documents and typed entities.

pub mod mapper;

pub use mapper::DocumentMapper;

use crate::response::{LinksInformation, MetaInformation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A complete wire document.
///
/// `data` distinguishes an absent member (`None`) from an explicit `null`
/// (`Some(PrimaryData::Single(None))`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinksInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaInformation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<PrimaryData>, D::Error>
where
    D: Deserializer<'de>,
{
    PrimaryData::deserialize(deserializer).map(Some)
}

impl Document {
    pub fn single(resource: Option<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::Single(resource)),
            ..Self::default()
        }
    }

    pub fn collection(resources: Vec<ResourceObject>) -> Self {
        Self {
            data: Some(PrimaryData::Collection(resources)),
            ..Self::default()
        }
    }

    pub fn from_errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    /// Primary resource objects, whatever the shape of `data`.
    pub fn primary(&self) -> &[ResourceObject] {
        match &self.data {
            Some(PrimaryData::Single(Some(resource))) => std::slice::from_ref(resource),
            Some(PrimaryData::Collection(resources)) => resources,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Collection(Vec<ResourceObject>),
    Single(Option<ResourceObject>),
}

/// One resource on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl ResourceObject {
    pub fn new(resource_type: impl Into<String>, id: Option<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Type and id, if the object has an id.
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id.as_ref().map(|id| ResourceIdentifier {
            resource_type: self.resource_type.clone(),
            id: id.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: RelationshipData,
}

/// Relationship linkage: one (possibly null) identifier or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceIdentifier>),
    ToOne(Option<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// A failure reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
