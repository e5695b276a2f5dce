//! # Repository Contracts
//!
//! [`ResourceRepository`] is the data-access contract shared by both sides of the bridge.
//! On the server it is implemented by the application's repositories (for example
//! [`InMemoryRepository`](crate::InMemoryRepository)); on the client by
//! [`RepositoryStub`](crate::RepositoryStub), which turns each call into a wire request.
//!
//! Meta and links are optional capabilities, each a separate trait. A repository declares
//! which of them it offers when it is wrapped into a [`RepositoryEntry`]; the resulting
//! [`Capabilities`] value is fixed from then on and is all the
//! [`ResponseAssembler`](crate::ResponseAssembler) looks at.
//!
//! # Architecture Note
//! All operations are synchronous and run on the caller's thread. Implementations must be
//! `Send + Sync` so one repository can serve concurrent callers.

use crate::error::Result;
use crate::query::{QueryParams, QuerySpec};
use crate::resource::Resource;
use crate::response::{LinksInformation, MetaInformation};
use std::fmt;
use std::sync::Arc;

/// CRUD operations over one resource type.
pub trait ResourceRepository<T: Resource>: Send + Sync {
    /// Fails with [`BridgeError::NotFound`](crate::BridgeError::NotFound) if no entity has `id`.
    fn find_one(&self, id: &T::Id, query: Option<&QuerySpec>) -> Result<T>;

    fn find_all(&self, query: Option<&QuerySpec>) -> Result<Vec<T>>;

    fn find_all_by_ids(&self, ids: &[T::Id], query: Option<&QuerySpec>) -> Result<Vec<T>>;

    /// Stores the entity, creating it when it has no id yet.
    fn save(&self, entity: T) -> Result<T>;

    fn create(&self, entity: T) -> Result<T> {
        self.save(entity)
    }

    fn delete(&self, id: &T::Id) -> Result<()>;
}

/// Optional capability: top-level meta for a response.
///
/// Receives the query in its flat encoding, as meta and links are typically derived from
/// the request parameters (page sizes, cursors).
pub trait MetaRepository<T: Resource>: Send + Sync {
    fn meta_information(
        &self,
        resources: &[T],
        params: Option<&QueryParams>,
    ) -> Result<MetaInformation>;
}

/// Optional capability: top-level links for a response.
pub trait LinksRepository<T: Resource>: Send + Sync {
    fn links_information(
        &self,
        resources: &[T],
        params: Option<&QueryParams>,
    ) -> Result<LinksInformation>;
}

/// Which optional capabilities a registered repository offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub meta: bool,
    pub links: bool,
}

/// A repository together with its optional capabilities, as registered with the bridge.
pub struct RepositoryEntry<T: Resource> {
    repository: Arc<dyn ResourceRepository<T>>,
    meta: Option<Arc<dyn MetaRepository<T>>>,
    links: Option<Arc<dyn LinksRepository<T>>>,
    capabilities: Capabilities,
}

impl<T: Resource> RepositoryEntry<T> {
    /// An entry without meta or links.
    pub fn new(repository: Arc<dyn ResourceRepository<T>>) -> Self {
        Self {
            repository,
            meta: None,
            links: None,
            capabilities: Capabilities::default(),
        }
    }

    /// An entry whose repository implements both optional capabilities.
    pub fn full<R>(repository: Arc<R>) -> Self
    where
        R: ResourceRepository<T> + MetaRepository<T> + LinksRepository<T> + 'static,
    {
        Self::new(repository.clone())
            .with_meta(repository.clone())
            .with_links(repository)
    }

    pub fn with_meta(mut self, meta: Arc<dyn MetaRepository<T>>) -> Self {
        self.meta = Some(meta);
        self.capabilities.meta = true;
        self
    }

    pub fn with_links(mut self, links: Arc<dyn LinksRepository<T>>) -> Self {
        self.links = Some(links);
        self.capabilities.links = true;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn repository(&self) -> &dyn ResourceRepository<T> {
        self.repository.as_ref()
    }

    pub fn meta(&self) -> Option<&dyn MetaRepository<T>> {
        self.meta.as_deref()
    }

    pub fn links(&self) -> Option<&dyn LinksRepository<T>> {
        self.links.as_deref()
    }
}

impl<T: Resource> Clone for RepositoryEntry<T> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            meta: self.meta.clone(),
            links: self.links.clone(),
            capabilities: self.capabilities,
        }
    }
}

impl<T: Resource> fmt::Debug for RepositoryEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryEntry")
            .field("resource_type", &T::RESOURCE_TYPE)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
