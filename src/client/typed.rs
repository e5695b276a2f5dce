//! # TypedClient Trait
//!
//! Provides a common interface for resource-specific clients, adding default `get`, `list`
//! and `delete` methods built on top of a generic [`RepositoryStub`].

use crate::client::stub::RepositoryStub;
use crate::error::{BridgeError, TransportError};
use crate::query::QuerySpec;
use crate::repository::ResourceRepository;
use crate::resource::Resource;

/// Trait for resource-specific clients to inherit standard read and delete operations.
///
/// # Example
///
/// ```rust
/// use resource_bridge::{BridgeError, RepositoryStub, Resource, ResourceDescriptor, TypedClient};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Note { id: Option<u64>, #[serde(default)] text: String }
///
/// impl Resource for Note {
///     type Id = u64;
///     const RESOURCE_TYPE: &'static str = "notes";
///     fn descriptor() -> ResourceDescriptor { ResourceDescriptor::builder("notes").build() }
///     fn id(&self) -> Option<&u64> { self.id.as_ref() }
///     fn set_id(&mut self, id: u64) { self.id = Some(id); }
/// }
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("{0}")]
/// struct NoteError(String);
///
/// impl From<String> for NoteError {
///     fn from(s: String) -> Self { NoteError(s) }
/// }
///
/// struct NoteClient {
///     inner: RepositoryStub<Note>,
/// }
///
/// impl TypedClient<Note> for NoteClient {
///     type Error = NoteError;
///
///     fn inner(&self) -> &RepositoryStub<Note> {
///         &self.inner
///     }
///
///     fn map_error(e: BridgeError) -> Self::Error {
///         NoteError(e.to_string())
///     }
/// }
///
/// fn usage(client: &NoteClient) {
///     // get(), list() and delete() are provided automatically.
///     let _ = client.get(1);
///     let _ = client.delete(1);
/// }
/// ```
pub trait TypedClient<T: Resource>: Send + Sync {
    /// The resource-specific error type.
    type Error: From<String> + Send + Sync;

    /// Access the inner generic stub.
    fn inner(&self) -> &RepositoryStub<T>;

    /// Map bridge errors to the specific resource error type.
    fn map_error(e: BridgeError) -> Self::Error;

    /// Fetch an entity by id. A missing entity is `Ok(None)`, whether the stub reported it
    /// or the server answered 404.
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        match self.inner().find_one(&id, None) {
            Ok(entity) => Ok(Some(entity)),
            Err(BridgeError::NotFound { .. })
            | Err(BridgeError::Transport(TransportError::Status { status: 404, .. })) => Ok(None),
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Fetch every entity matching `query`.
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn list(&self, query: Option<&QuerySpec>) -> Result<Vec<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().find_all(query).map_err(Self::map_error)
    }

    /// Delete an entity by id.
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn delete(&self, id: T::Id) -> Result<(), Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete(&id).map_err(Self::map_error)
    }
}
