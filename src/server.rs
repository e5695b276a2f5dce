//! # Request Dispatcher
//!
//! The server side of the bridge. A [`RequestDispatcher`] holds one endpoint per registered
//! resource type and runs the full server data flow for each request:
//!
//! ```text
//! QueryParams -> QueryTranslator -> QuerySpec -> repository -> RawResult
//!             -> ResponseAssembler -> Envelope -> DocumentMapper -> Document
//! ```
//!
//! | Request | Repository call | Status |
//! |---------|-----------------|--------|
//! | `GET /{type}` | `find_all` | 200 |
//! | `GET /{type}/{id}` | `find_one` | 200 |
//! | `GET /{type}/{id1,id2}` | `find_all_by_ids` | 200 |
//! | `POST /{type}` | `create` | 201 |
//! | `PATCH /{type}/{id}` | `save` | 200 |
//! | `DELETE /{type}/{id}` | `delete` | 204 |
//!
//! Failures become documents carrying an `errors` array: 400 for query errors, 404 for
//! unknown resources and types, 405 for other verbs, 422 for request bodies that do not map
//! to the resource, 500 for repository failures.
//!
//! [`LoopbackTransport`] plugs a dispatcher in as the [`Transport`] of a client, so both
//! halves of the bridge can be exercised in one process.

use crate::client::transport::{ClientRequest, ClientResponse, HttpMethod, Transport};
use crate::document::{Document, DocumentMapper, ErrorObject};
use crate::error::{BridgeError, DocumentError, QueryError, Result, TransportError};
use crate::query::{QueryParams, QuerySpec, QueryTranslator, RawQuery};
use crate::repository::RepositoryEntry;
use crate::resource::Resource;
use crate::response::{RawResult, ResponseAssembler};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A request as the dispatcher sees it: the path below the base URL, parsed query
/// parameters, and the body.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Document>,
}

impl ServerRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::default(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Document) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: Option<Document>,
}

impl ServerResponse {
    fn new(status: u16, body: Option<Document>) -> Self {
        Self { status, body }
    }

    fn error(status: u16, detail: impl Into<String>) -> Self {
        let error = ErrorObject {
            status: Some(status.to_string()),
            title: Some(reason(status).to_string()),
            detail: Some(detail.into()),
            code: None,
        };
        Self::new(status, Some(Document::from_errors(vec![error])))
    }
}

/// Type-erased handler for one resource type.
trait Endpoint: Send + Sync {
    fn handle(&self, method: HttpMethod, ids: Option<&str>, request: &ServerRequest) -> Result<ServerResponse>;
}

struct TypedEndpoint<T: Resource> {
    entry: RepositoryEntry<T>,
    translator: Arc<QueryTranslator>,
    assembler: ResponseAssembler,
    mapper: DocumentMapper,
}

impl<T: Resource> TypedEndpoint<T> {
    fn query(&self, request: &ServerRequest) -> Result<QuerySpec> {
        Ok(self
            .translator
            .translate_for(RawQuery::Params(request.query.clone()), T::RESOURCE_TYPE)?)
    }

    fn respond(&self, status: u16, raw: RawResult<T>, query: Option<&QuerySpec>) -> Result<ServerResponse> {
        let envelope = self.assembler.assemble(&self.entry, raw, query)?;
        let document = self.mapper.to_document(&envelope, query)?;
        Ok(ServerResponse::new(status, Some(document)))
    }

    fn body(&self, request: &ServerRequest) -> Result<T> {
        let document = request.body.as_ref().ok_or(DocumentError::MissingData)?;
        Ok(self
            .mapper
            .to_single::<T>(document)?
            .ok_or(DocumentError::MissingData)?)
    }
}

fn parse_id<T: Resource>(raw: &str) -> Result<T::Id> {
    let decoded = urlencoding::decode(raw).map_err(|_| QueryError::Malformed(raw.to_string()))?;
    decoded.parse::<T::Id>().map_err(|_| {
        QueryError::InvalidValue {
            field: "id".to_string(),
            value: decoded.to_string(),
            expected: format!("{} id", T::RESOURCE_TYPE),
        }
        .into()
    })
}

impl<T: Resource> Endpoint for TypedEndpoint<T> {
    fn handle(&self, method: HttpMethod, ids: Option<&str>, request: &ServerRequest) -> Result<ServerResponse> {
        let repository = self.entry.repository();
        match (method, ids) {
            (HttpMethod::Get, None) => {
                let query = self.query(request)?;
                let items = repository.find_all(Some(&query))?;
                self.respond(200, RawResult::Collection(items), Some(&query))
            }
            (HttpMethod::Get, Some(ids)) if ids.contains(',') => {
                let query = self.query(request)?;
                let ids = ids
                    .split(',')
                    .map(parse_id::<T>)
                    .collect::<Result<Vec<_>>>()?;
                let items = repository.find_all_by_ids(&ids, Some(&query))?;
                self.respond(200, RawResult::Collection(items), Some(&query))
            }
            (HttpMethod::Get, Some(id)) => {
                let query = self.query(request)?;
                let entity = repository.find_one(&parse_id::<T>(id)?, Some(&query))?;
                self.respond(200, RawResult::Single(entity), Some(&query))
            }
            (HttpMethod::Post, None) => {
                let created = repository.create(self.body(request)?)?;
                self.respond(201, RawResult::Single(created), None)
            }
            (HttpMethod::Patch, Some(id)) => {
                let mut entity = self.body(request)?;
                entity.set_id(parse_id::<T>(id)?);
                let saved = repository.save(entity)?;
                self.respond(200, RawResult::Single(saved), None)
            }
            (HttpMethod::Delete, Some(id)) => {
                repository.delete(&parse_id::<T>(id)?)?;
                Ok(ServerResponse::new(204, None))
            }
            (method, _) => Ok(ServerResponse::error(
                405,
                format!("{method} not allowed on {}", request.path),
            )),
        }
    }
}

/// Routes requests to the endpoint registered for their resource type.
pub struct RequestDispatcher {
    translator: Arc<QueryTranslator>,
    endpoints: BTreeMap<String, Box<dyn Endpoint>>,
}

impl RequestDispatcher {
    pub fn new(translator: Arc<QueryTranslator>) -> Self {
        Self {
            translator,
            endpoints: BTreeMap::new(),
        }
    }

    /// Serves `T` from `entry`. Fails if `T` has no descriptor.
    pub fn register<T: Resource>(mut self, entry: RepositoryEntry<T>) -> Result<Self> {
        let descriptors = self.translator.descriptors().clone();
        if !descriptors.contains(T::RESOURCE_TYPE) {
            return Err(DocumentError::UnknownResourceType(T::RESOURCE_TYPE.to_string()).into());
        }
        debug!(resource_type = T::RESOURCE_TYPE, capabilities = ?entry.capabilities(), "Registered");

        let endpoint = TypedEndpoint {
            entry,
            translator: self.translator.clone(),
            assembler: ResponseAssembler::new(self.translator.clone()),
            mapper: DocumentMapper::new(descriptors),
        };
        self.endpoints
            .insert(T::RESOURCE_TYPE.to_string(), Box::new(endpoint));
        Ok(self)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    pub fn dispatch(&self, request: ServerRequest) -> ServerResponse {
        debug!(method = %request.method, path = %request.path, query = ?request.query, "Dispatching");

        let mut segments = request.path.trim_matches('/').splitn(3, '/');
        let resource_type = segments.next().unwrap_or_default();
        let ids = segments.next().filter(|s| !s.is_empty());
        if segments.next().is_some() {
            return ServerResponse::error(404, format!("No route for {}", request.path));
        }

        let Some(endpoint) = self.endpoints.get(resource_type) else {
            warn!(resource_type, "Unknown resource type");
            return ServerResponse::error(404, format!("Unknown resource type: {resource_type}"));
        };

        match endpoint.handle(request.method, ids, &request) {
            Ok(response) => response,
            Err(e) => {
                let status = status_for(&e);
                warn!(method = %request.method, path = %request.path, status, error = %e, "Request failed");
                ServerResponse::error(status, e.to_string())
            }
        }
    }

    /// Dispatches a raw request target (`/tasks/5?include=project`).
    pub fn dispatch_target(&self, method: HttpMethod, target: &str, body: Option<Document>) -> ServerResponse {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let query = match QueryParams::parse(query) {
            Ok(query) => query,
            Err(e) => return ServerResponse::error(400, e.to_string()),
        };
        self.dispatch(ServerRequest {
            method,
            path: path.to_string(),
            query,
            body,
        })
    }
}

impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("resource_types", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn status_for(error: &BridgeError) -> u16 {
    match error {
        BridgeError::Query(_) => 400,
        BridgeError::NotFound { .. } => 404,
        BridgeError::Document(_) | BridgeError::MissingId { .. } => 422,
        BridgeError::Transport(TransportError::Status { status, .. }) => *status,
        BridgeError::Transport(TransportError::Connection(_)) => 502,
        BridgeError::Descriptor(_) | BridgeError::Config(_) | BridgeError::Repository(_) => 500,
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        422 => "Unprocessable Entity",
        502 => "Bad Gateway",
        _ => "Internal Server Error",
    }
}

/// A [`Transport`] that hands requests straight to a dispatcher in the same process.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    base_url: String,
    dispatcher: Arc<RequestDispatcher>,
}

impl LoopbackTransport {
    pub fn new(base_url: impl Into<String>, dispatcher: Arc<RequestDispatcher>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            dispatcher,
        }
    }
}

impl Transport for LoopbackTransport {
    fn execute(&self, request: ClientRequest) -> std::result::Result<ClientResponse, TransportError> {
        let target = request
            .url
            .strip_prefix(&self.base_url)
            .filter(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
            .ok_or_else(|| {
                TransportError::Connection(format!("{} is not below {}", request.url, self.base_url))
            })?;

        let response = self
            .dispatcher
            .dispatch_target(request.method, target, request.body);
        Ok(ClientResponse::new(response.status, response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorTable, ResourceDescriptor, ValueKind};
    use crate::document::{PrimaryData, ResourceObject};
    use crate::memory::InMemoryRepository;
    use crate::operator::FilterOperatorRegistry;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        #[serde(default)]
        text: String,
    }

    impl Resource for Note {
        type Id = u64;
        const RESOURCE_TYPE: &'static str = "notes";
        fn descriptor() -> ResourceDescriptor {
            ResourceDescriptor::builder(Self::RESOURCE_TYPE)
                .id("id", ValueKind::Integer)
                .attribute("text", ValueKind::String)
                .build()
        }
        fn id(&self) -> Option<&u64> {
            self.id.as_ref()
        }
        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }
    }

    fn dispatcher() -> RequestDispatcher {
        let table = DescriptorTable::builder().register::<Note>().build().unwrap();
        let translator = Arc::new(QueryTranslator::new(
            Arc::new(table),
            Arc::new(FilterOperatorRegistry::with_defaults()),
        ));
        let notes = InMemoryRepository::with_entities(["a", "b", "c"].map(|text| Note {
            id: None,
            text: text.to_string(),
        }))
        .unwrap();
        RequestDispatcher::new(translator.clone())
            .register(notes.with_paging_info(translator))
            .unwrap()
    }

    fn note_document(text: &str) -> Document {
        let mut note = ResourceObject::new("notes", None);
        note.attributes.insert("text".into(), json!(text));
        Document::single(Some(note))
    }

    fn first_error(response: &ServerResponse) -> &ErrorObject {
        &response.body.as_ref().unwrap().errors[0]
    }

    #[test]
    fn test_reads() {
        let dispatcher = dispatcher();

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes?filter[text]=b", None);
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body.primary().len(), 1);
        assert_eq!(body.meta.unwrap().get("total"), Some(&json!(1)));
        assert!(body.links.is_some());

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes/2", None);
        assert!(matches!(
            response.body.unwrap().data,
            Some(PrimaryData::Single(Some(ref note))) if note.id.as_deref() == Some("2")
        ));

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes/3,1", None);
        let ids: Vec<_> = response
            .body
            .unwrap()
            .primary()
            .iter()
            .filter_map(|n| n.id.clone())
            .collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_paging_links_follow_filters() {
        let dispatcher = dispatcher();

        let response =
            dispatcher.dispatch_target(HttpMethod::Get, "/notes?filter[text]=b&page[limit]=1", None);
        assert_eq!(response.status, 200);
        let links = response.body.unwrap().links.unwrap();
        assert!(links.next.is_none());
        assert_eq!(
            links.last.as_deref(),
            Some("/notes?filter[text]=b&page[limit]=1&page[offset]=0")
        );
    }

    #[test]
    fn test_huge_page_offset_is_an_empty_page() {
        let dispatcher = dispatcher();

        let response = dispatcher.dispatch_target(
            HttpMethod::Get,
            "/notes?page[offset]=18446744073709551615&page[limit]=10",
            None,
        );
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert!(body.primary().is_empty());
        assert!(body.links.unwrap().next.is_none());
    }

    #[test]
    fn test_writes() {
        let dispatcher = dispatcher();

        let created = dispatcher.dispatch(
            ServerRequest::new(HttpMethod::Post, "/notes").with_body(note_document("d")),
        );
        assert_eq!(created.status, 201);
        assert_eq!(created.body.unwrap().primary()[0].id.as_deref(), Some("4"));

        let updated = dispatcher.dispatch(
            ServerRequest::new(HttpMethod::Patch, "/notes/1").with_body(note_document("A")),
        );
        assert_eq!(updated.status, 200);
        assert_eq!(updated.body.unwrap().primary()[0].attributes["text"], json!("A"));

        let deleted = dispatcher.dispatch(ServerRequest::new(HttpMethod::Delete, "/notes/1"));
        assert_eq!(deleted.status, 204);
        assert!(deleted.body.is_none());
    }

    #[test]
    fn test_failures_carry_errors() {
        let dispatcher = dispatcher();

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes/9", None);
        assert_eq!(response.status, 404);
        assert_eq!(first_error(&response).status.as_deref(), Some("404"));

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/planets", None);
        assert_eq!(response.status, 404);

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes?filter[color]=red", None);
        assert_eq!(response.status, 400);
        assert!(first_error(&response).detail.as_ref().unwrap().contains("color"));

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes?filter[text", None);
        assert_eq!(response.status, 400);

        let response = dispatcher.dispatch_target(HttpMethod::Delete, "/notes", None);
        assert_eq!(response.status, 405);

        let response = dispatcher.dispatch(ServerRequest::new(HttpMethod::Post, "/notes"));
        assert_eq!(response.status, 422);

        let response = dispatcher.dispatch_target(HttpMethod::Get, "/notes/abc", None);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_loopback_rejects_foreign_urls() {
        let transport = LoopbackTransport::new("http://local/api/", Arc::new(dispatcher()));
        let ok = transport
            .execute(ClientRequest {
                method: HttpMethod::Get,
                url: "http://local/api/notes".into(),
                body: None,
            })
            .unwrap();
        assert_eq!(ok.status, 200);

        let err = transport
            .execute(ClientRequest {
                method: HttpMethod::Get,
                url: "http://elsewhere/notes".into(),
                body: None,
            })
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }
}
