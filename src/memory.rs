//! # In-Memory Repository
//!
//! A complete [`ResourceRepository`] backed by a `BTreeMap`, for tests, demos and small
//! services. Queries are evaluated with [`QuerySpec::apply`].
//!
//! It also implements both optional capabilities: meta reports the `total` number of resources
//! matching the request's filters, and links compute `first`/`prev`/`next`/`last` from that
//! total and the request's `page[offset]` and `page[limit]`. Whether they are used is decided
//! when the repository is registered, see [`InMemoryRepository::with_paging_info`].
//!
//! Both capabilities receive the request in its flat encoding, so the repository needs a
//! [`QueryTranslator`] to read the filters back. Without one, `total` is the store size.
//!
//! # Architecture Note
//! The store sits behind an `RwLock`, so reads run in parallel and writes are serialized.
//! Ids are drawn from an atomic counter, skipping ids that are already taken.

use crate::error::{BridgeError, Result};
use crate::query::{Pagination, QueryParams, QuerySpec, QueryTranslator, RawQuery};
use crate::repository::{LinksRepository, MetaRepository, RepositoryEntry, ResourceRepository};
use crate::resource::Resource;
use crate::response::{LinksInformation, MetaInformation};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

pub struct InMemoryRepository<T: Resource> {
    store: RwLock<BTreeMap<T::Id, T>>,
    next_id: AtomicU64,
    translator: Option<Arc<QueryTranslator>>,
}

impl<T: Resource> Default for InMemoryRepository<T>
where
    T::Id: From<u64>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> InMemoryRepository<T>
where
    T::Id: From<u64>,
{
    pub fn new() -> Self {
        Self {
            store: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            translator: None,
        }
    }

    /// Evaluates queries with the translator's descriptors and lets meta and links read
    /// the request's filters.
    pub fn with_translator(mut self, translator: Arc<QueryTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Pre-populated repository. Entities without an id get one.
    pub fn with_entities(entities: impl IntoIterator<Item = T>) -> Result<Self> {
        let repository = Self::new();
        for entity in entities {
            repository.create(entity)?;
        }
        Ok(repository)
    }

    /// Registers the repository with only the mandatory operations.
    pub fn into_entry(self) -> RepositoryEntry<T> {
        RepositoryEntry::new(Arc::new(self))
    }

    /// Registers the repository with its meta and links capabilities.
    pub fn with_paging_info(self, translator: Arc<QueryTranslator>) -> RepositoryEntry<T> {
        RepositoryEntry::full(Arc::new(self.with_translator(translator)))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<T::Id, T>>> {
        self.store.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<T::Id, T>>> {
        self.store.write().map_err(|_| poisoned())
    }

    fn query(&self, items: Vec<T>, query: Option<&QuerySpec>) -> Result<Vec<T>> {
        match (query, &self.translator) {
            (Some(spec), Some(translator)) => Ok(spec.apply_with(&items, translator.descriptors())?),
            (Some(spec), None) => Ok(spec.apply(&items)?),
            (None, _) => Ok(items),
        }
    }

    /// Number of stored resources matching the filters of `params`, pagination ignored.
    fn total(&self, params: Option<&QueryParams>) -> Result<u64> {
        let (Some(params), Some(translator)) = (params, &self.translator) else {
            return Ok(self.len()? as u64);
        };
        let spec = translator
            .translate_for(RawQuery::Params(params.clone()), T::RESOURCE_TYPE)?
            .pagination(Pagination::default());
        let items: Vec<T> = self.read()?.values().cloned().collect();
        Ok(self.query(items, Some(&spec))?.len() as u64)
    }
}

impl<T: Resource> fmt::Debug for InMemoryRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.store.read().map(|store| store.len()).ok();
        f.debug_struct("InMemoryRepository")
            .field("resource_type", &T::RESOURCE_TYPE)
            .field("size", &size)
            .field("translator", &self.translator.is_some())
            .finish()
    }
}

fn poisoned() -> BridgeError {
    BridgeError::Repository("store lock poisoned".to_string())
}

impl<T: Resource> ResourceRepository<T> for InMemoryRepository<T>
where
    T::Id: From<u64>,
{
    fn find_one(&self, id: &T::Id, _query: Option<&QuerySpec>) -> Result<T> {
        debug!(resource_type = T::RESOURCE_TYPE, %id, "Find one");
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::not_found(T::RESOURCE_TYPE, id))
    }

    fn find_all(&self, query: Option<&QuerySpec>) -> Result<Vec<T>> {
        debug!(resource_type = T::RESOURCE_TYPE, ?query, "Find all");
        let items: Vec<T> = self.read()?.values().cloned().collect();
        self.query(items, query)
    }

    /// Unknown ids are skipped; the result follows the order of `ids` unless the query sorts.
    fn find_all_by_ids(&self, ids: &[T::Id], query: Option<&QuerySpec>) -> Result<Vec<T>> {
        debug!(resource_type = T::RESOURCE_TYPE, ?ids, "Find by ids");
        let items: Vec<T> = {
            let store = self.read()?;
            ids.iter().filter_map(|id| store.get(id).cloned()).collect()
        };
        self.query(items, query)
    }

    fn save(&self, entity: T) -> Result<T> {
        let Some(id) = entity.id().cloned() else {
            return self.create(entity);
        };
        debug!(resource_type = T::RESOURCE_TYPE, ?entity, "Save");
        self.write()?.insert(id.clone(), entity.clone());
        info!(resource_type = T::RESOURCE_TYPE, %id, "Saved");
        Ok(entity)
    }

    fn create(&self, mut entity: T) -> Result<T> {
        debug!(resource_type = T::RESOURCE_TYPE, ?entity, "Create");
        let mut store = self.write()?;
        let id = match entity.id() {
            Some(id) => id.clone(),
            None => loop {
                let candidate = T::Id::from(self.next_id.fetch_add(1, Ordering::Relaxed));
                if !store.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        entity.set_id(id.clone());
        store.insert(id.clone(), entity.clone());
        info!(resource_type = T::RESOURCE_TYPE, %id, size = store.len(), "Created");
        Ok(entity)
    }

    fn delete(&self, id: &T::Id) -> Result<()> {
        match self.write()?.remove(id) {
            Some(_) => {
                info!(resource_type = T::RESOURCE_TYPE, %id, "Deleted");
                Ok(())
            }
            None => {
                warn!(resource_type = T::RESOURCE_TYPE, %id, "Delete failed: not found");
                Err(BridgeError::not_found(T::RESOURCE_TYPE, id))
            }
        }
    }
}

impl<T: Resource> MetaRepository<T> for InMemoryRepository<T>
where
    T::Id: From<u64>,
{
    fn meta_information(&self, _resources: &[T], params: Option<&QueryParams>) -> Result<MetaInformation> {
        Ok(MetaInformation::new().with("total", self.total(params)?))
    }
}

impl<T: Resource> LinksRepository<T> for InMemoryRepository<T>
where
    T::Id: From<u64>,
{
    fn links_information(&self, _resources: &[T], params: Option<&QueryParams>) -> Result<LinksInformation> {
        let params = params.cloned().unwrap_or_default();
        let link = |params: &QueryParams| {
            let query = params.to_query_string();
            if query.is_empty() {
                format!("/{}", T::RESOURCE_TYPE)
            } else {
                format!("/{}?{}", T::RESOURCE_TYPE, query)
            }
        };

        let mut links = LinksInformation {
            self_link: Some(link(&params)),
            ..LinksInformation::default()
        };

        let page = params.pagination();
        let Some(limit) = page.get("limit").and_then(|l| l.parse::<u64>().ok()).filter(|l| *l > 0) else {
            return Ok(links);
        };
        let offset = page
            .get("offset")
            .and_then(|o| o.parse::<u64>().ok())
            .unwrap_or(0);
        let total = self.total(Some(&params))?;
        let at = |offset: u64| Some(link(&params.clone().with_page_param("offset", offset)));

        links.first = at(0);
        if offset > 0 {
            links.prev = at(offset.saturating_sub(limit));
        }
        // Past the end of u64 there is no next page.
        if let Some(next) = offset.checked_add(limit).filter(|next| *next < total) {
            links.next = at(next);
        }
        if total > 0 {
            links.last = at((total - 1) / limit * limit);
        }
        Ok(links)
    }
}
