//! # Repository Stub
//!
//! [`RepositoryStub<T>`] is the client-side face of a remote repository. It implements the
//! same [`ResourceRepository`] contract as server repositories, so calling code cannot tell
//! a local repository from a remote one.
//!
//! Every call maps to exactly one request:
//!
//! | Call | Verb | URL |
//! |------|------|-----|
//! | `find_one(id)` | GET | `{base}/{type}/{id}` |
//! | `find_all()` | GET | `{base}/{type}` |
//! | `find_all_by_ids(ids)` | GET | `{base}/{type}/{id1,id2}` |
//! | `create(e)` | POST | `{base}/{type}` |
//! | `save(e)` with id | PATCH | `{base}/{type}/{id}` |
//! | `save(e)` without id | POST | `{base}/{type}` |
//! | `update(e)` | PATCH | `{base}/{type}/{id}` |
//! | `delete(id)` | DELETE | `{base}/{type}/{id}` |
//!
//! With [`ClientConfig::always_create`] set, `save` and `update` POST like `create`.
//! Queries are appended in the flat encoding.

use crate::client::transport::{ClientRequest, HttpMethod, Transport};
use crate::client::url::UrlBuilder;
use crate::config::ClientConfig;
use crate::document::{Document, DocumentMapper};
use crate::error::{BridgeError, DocumentError, Result, TransportError};
use crate::query::{QueryParams, QuerySpec, QueryTranslator, RawQuery};
use crate::repository::ResourceRepository;
use crate::resource::Resource;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client stub for one resource type. Holds no per-call state.
pub struct RepositoryStub<T: Resource> {
    config: Arc<ClientConfig>,
    translator: Arc<QueryTranslator>,
    mapper: Arc<DocumentMapper>,
    urls: UrlBuilder,
    transport: Arc<dyn Transport>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> RepositoryStub<T> {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        translator: Arc<QueryTranslator>,
        mapper: Arc<DocumentMapper>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let urls = UrlBuilder::new(config.base_url());
        Self {
            config,
            translator,
            mapper,
            urls,
            transport,
            _marker: PhantomData,
        }
    }

    /// Reads with a query already in the flat encoding. The parameters are validated against
    /// the descriptors before anything is sent.
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    pub fn find_all_with_params(&self, params: &QueryParams) -> Result<Vec<T>> {
        self.translator
            .translate_for(RawQuery::Params(params.clone()), T::RESOURCE_TYPE)?;
        let url = self.urls.build(T::RESOURCE_TYPE, &[], Some(params));
        let document = self.read(url)?;
        Ok(self.mapper.to_collection(&document)?)
    }

    /// Updates an existing entity. Without an id this fails before any I/O, unless the
    /// client always creates.
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    pub fn update(&self, entity: T) -> Result<T> {
        if self.config.always_create() {
            return self.write(HttpMethod::Post, None, entity);
        }
        let id = entity
            .id()
            .map(ToString::to_string)
            .ok_or_else(|| BridgeError::MissingId {
                resource_type: T::RESOURCE_TYPE.to_string(),
            })?;
        self.write(HttpMethod::Patch, Some(id), entity)
    }

    fn url(&self, ids: &[String], query: Option<&QuerySpec>) -> Result<String> {
        let params = query
            .map(|spec| self.translator.to_params(spec))
            .transpose()?;
        Ok(self.urls.build(T::RESOURCE_TYPE, ids, params.as_ref()))
    }

    fn send(&self, method: HttpMethod, url: String, body: Option<Document>) -> Result<Option<Document>> {
        debug!(%method, %url, ?body, "Sending request");
        let response = self
            .transport
            .execute(ClientRequest {
                method,
                url: url.clone(),
                body,
            })
            .inspect_err(|e| warn!(%method, %url, error = %e, "Transport failed"))?;

        if !response.is_success() {
            warn!(%method, %url, status = response.status, "Request failed");
            return Err(TransportError::Status {
                status: response.status,
                body: response.body,
            }
            .into());
        }
        debug!(%method, %url, status = response.status, "Received response");
        Ok(response.body)
    }

    fn read(&self, url: String) -> Result<Document> {
        self.send(HttpMethod::Get, url, None)?
            .ok_or_else(|| DocumentError::MissingData.into())
    }

    fn write(&self, method: HttpMethod, id: Option<String>, entity: T) -> Result<T> {
        let document = self.mapper.to_request_document(&entity)?;
        let ids: Vec<String> = id.into_iter().collect();
        let url = self.urls.build(T::RESOURCE_TYPE, &ids, None);

        let stored = match self.send(method, url, Some(document))? {
            Some(body) if body.data.is_some() => self.mapper.to_single::<T>(&body)?.unwrap_or(entity),
            _ => entity,
        };
        info!(resource_type = T::RESOURCE_TYPE, %method, id = ?stored.id(), "Written");
        Ok(stored)
    }
}

impl<T: Resource> ResourceRepository<T> for RepositoryStub<T> {
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn find_one(&self, id: &T::Id, query: Option<&QuerySpec>) -> Result<T> {
        let url = self.url(&[id.to_string()], query)?;
        let document = self.read(url)?;
        self.mapper
            .to_single(&document)?
            .ok_or_else(|| BridgeError::not_found(T::RESOURCE_TYPE, id))
    }

    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn find_all(&self, query: Option<&QuerySpec>) -> Result<Vec<T>> {
        let url = self.url(&[], query)?;
        let document = self.read(url)?;
        Ok(self.mapper.to_collection(&document)?)
    }

    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn find_all_by_ids(&self, ids: &[T::Id], query: Option<&QuerySpec>) -> Result<Vec<T>> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let url = self.url(&ids, query)?;
        let document = self.read(url)?;
        Ok(self.mapper.to_collection(&document)?)
    }

    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn save(&self, entity: T) -> Result<T> {
        if self.config.always_create() {
            return self.create(entity);
        }
        match entity.id().map(ToString::to_string) {
            Some(id) => self.write(HttpMethod::Patch, Some(id), entity),
            None => self.create(entity),
        }
    }

    /// Never puts an id in the URL, even if the entity has one.
    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn create(&self, entity: T) -> Result<T> {
        self.write(HttpMethod::Post, None, entity)
    }

    #[tracing::instrument(skip(self), fields(resource_type = T::RESOURCE_TYPE))]
    fn delete(&self, id: &T::Id) -> Result<()> {
        let url = self.url(&[id.to_string()], None)?;
        self.send(HttpMethod::Delete, url, None)?;
        info!(resource_type = T::RESOURCE_TYPE, %id, "Deleted");
        Ok(())
    }
}

impl<T: Resource> Clone for RepositoryStub<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            translator: self.translator.clone(),
            mapper: self.mapper.clone(),
            urls: self.urls.clone(),
            transport: self.transport.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Resource> fmt::Debug for RepositoryStub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryStub")
            .field("resource_type", &T::RESOURCE_TYPE)
            .field("base_url", &self.urls.base_url())
            .field("always_create", &self.config.always_create())
            .finish()
    }
}
