//! # Resource Trait
//!
//! The `Resource` trait is the contract every entity exposed through the bridge implements. It
//! plays the role the descriptor table cannot: typed access to the id, so the bridge can decide
//! between create and update, build id-qualified URLs and generate ids in memory.
//!
//! Everything else (attributes, relationships) travels through serde. An entity serializes to a
//! JSON object whose keys are the field names listed in its [`ResourceDescriptor`].
//!
//! A response may carry only some attributes (`fields[projects]=name`), so every attribute and
//! relationship field must deserialize when absent: mark it `#[serde(default)]`.
//!
//! # Relationships
//!
//! Relationship fields are typed with [`Relation`]: either the related entity itself
//! ([`Relation::Loaded`]) or only its id ([`Relation::Reference`]). A document that links a
//! resource without including it maps back to a reference, never to an error, so partial graphs
//! are normal.
//!
//! ```rust
//! use resource_bridge::{Relation, Resource, ResourceDescriptor, ValueKind};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Project {
//!     #[serde(default, skip_serializing_if = "Option::is_none")]
//!     id: Option<u64>,
//!     #[serde(default)]
//!     name: String,
//! }
//!
//! impl Resource for Project {
//!     type Id = u64;
//!     const RESOURCE_TYPE: &'static str = "projects";
//!
//!     fn descriptor() -> ResourceDescriptor {
//!         ResourceDescriptor::builder(Self::RESOURCE_TYPE)
//!             .id("id", ValueKind::Integer)
//!             .attribute("name", ValueKind::String)
//!             .build()
//!     }
//!     fn id(&self) -> Option<&u64> { self.id.as_ref() }
//!     fn set_id(&mut self, id: u64) { self.id = Some(id); }
//! }
//!
//! let reference: Relation<Project> = Relation::reference(7);
//! assert_eq!(reference.id(), Some(&7));
//! assert!(reference.loaded().is_none());
//! ```

use crate::descriptor::ResourceDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

/// Trait that any entity must implement to be served or consumed through the bridge.
///
/// # Associated Types
/// `Id` is the typed identifier. It must print (`Display`) exactly as it appears on the wire
/// and parse back (`FromStr`) from a URL segment.
///
/// # Deserialization
/// Fields other than the id are filled by name from whatever attributes a document carries;
/// missing ones take their serde default, so they need `#[serde(default)]`.
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    type Id: Clone
        + Eq
        + Ord
        + Hash
        + Display
        + FromStr
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Wire type name, also used as the URL path segment.
    const RESOURCE_TYPE: &'static str;

    fn descriptor() -> ResourceDescriptor;

    /// The id, or `None` if the entity has not been persisted yet.
    fn id(&self) -> Option<&Self::Id>;

    fn set_id(&mut self, id: Self::Id);
}

/// Reference-only form of a related resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference<I> {
    pub id: I,
}

/// A relationship value: the related entity, or just its id when it was not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, bound = "")]
pub enum Relation<T: Resource> {
    Reference(Reference<T::Id>),
    Loaded(T),
}

impl<T: Resource> Relation<T> {
    pub fn reference(id: T::Id) -> Self {
        Relation::Reference(Reference { id })
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Relation::Loaded(entity) => Some(entity),
            Relation::Reference(_) => None,
        }
    }

    /// Id of the related resource, whichever form it takes.
    pub fn id(&self) -> Option<&T::Id> {
        match self {
            Relation::Reference(reference) => Some(&reference.id),
            Relation::Loaded(entity) => entity.id(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Relation::Loaded(_))
    }
}

impl<T: Resource> From<T> for Relation<T> {
    fn from(entity: T) -> Self {
        Relation::Loaded(entity)
    }
}
