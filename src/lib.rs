//! # Resource Bridge
//!
//! > **Typed resources on both sides of a JSON:API-style HTTP boundary.**
//!
//! This crate lets an application talk about its resources (tasks, projects, people) as plain
//! Rust structs, while the wire carries JSON:API-style documents and flat query strings such as
//! `filter[name]=foo&sort=-id&page[limit]=10`.
//!
//! ## Core Concepts
//!
//! ### Descriptors: One Table, Every Type
//! Each [`Resource`] describes its id, attributes and relationships once, in a
//! [`ResourceDescriptor`]. The [`DescriptorTable`] built from them is shared by every other
//! layer, so query validation, document mapping and URL building all agree on the same names.
//!
//! ### Two Query Shapes
//! Queries arrive either flat ([`QueryParams`], straight from a query string) or typed
//! ([`QuerySpec`], built in code). The [`QueryTranslator`] turns both into one validated
//! `QuerySpec`, and turns a `QuerySpec` back into parameters for outgoing URLs.
//!
//! ### Optional Capabilities
//! A repository only has to implement [`ResourceRepository`]. Meta and links are extra traits
//! ([`MetaRepository`], [`LinksRepository`]); whether a repository offers them is decided once,
//! when its [`RepositoryEntry`] is built, and the [`ResponseAssembler`] fills in exactly what
//! is available.
//!
//! ### Mocking: Testing without a Server
//! Clients never open sockets themselves, they go through a [`Transport`]. Tests swap in a
//! [`MockTransport`] with expected requests, or a [`LoopbackTransport`] that runs a full
//! [`RequestDispatcher`] in-process. See the [`mock`] module for a guide.
//!
//! ## Module Tour
//!
//! ### 1. The Model ([`descriptor`], [`resource`], [`operator`])
//! - **Role**: What exists. Resource types, their fields, and the filter operators that apply.
//! - **Key items**: [`Resource`], [`DescriptorTable`], [`FilterOperatorRegistry`].
//!
//! ### 2. The Query Layer ([`query`])
//! - **Role**: Parsing, translating, rendering and evaluating queries.
//! - **Key items**: [`QueryParams`], [`QuerySpec`], [`QueryTranslator`].
//!
//! ### 3. The Server Side ([`repository`], [`response`], [`server`], [`memory`])
//! - **Role**: Repositories answer queries; responses are assembled with meta and links and
//!   served through the dispatcher.
//! - **Key items**: [`RepositoryEntry`], [`ResponseAssembler`], [`RequestDispatcher`],
//!   [`InMemoryRepository`].
//!
//! ### 4. The Client Side ([`client`], [`document`], [`config`])
//! - **Role**: Repository stubs that speak HTTP verbs and documents, configured from the
//!   environment.
//! - **Key items**: [`BridgeClient`], [`RepositoryStub`], [`TypedClient`], [`DocumentMapper`].
//!
//! ### Running Tests
//!
//! ```bash
//! RUST_LOG=debug cargo test
//! ```

pub mod client;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod memory;
pub mod mock;
pub mod operator;
pub mod query;
pub mod repository;
pub mod resource;
pub mod response;
pub mod server;
pub mod tracing;

pub use client::{
    BridgeClient, ClientRequest, ClientResponse, HttpMethod, RepositoryStub, Transport,
    TypedClient, UrlBuilder,
};
pub use config::ClientConfig;
pub use descriptor::{
    Cardinality, DescriptorTable, FieldTarget, ResourceDescriptor, ValueKind,
};
pub use document::{
    Document, DocumentMapper, ErrorObject, PrimaryData, Relationship, RelationshipData,
    ResourceIdentifier, ResourceObject,
};
pub use error::{
    BridgeError, ConfigError, DescriptorError, DocumentError, QueryError, Result, TransportError,
};
pub use memory::InMemoryRepository;
pub use mock::MockTransport;
pub use operator::{FilterOperator, FilterOperatorRegistry};
pub use query::{
    Direction, FilterParam, FilterSpec, ListParam, Pagination, PathSpec, QueryParams, QuerySpec,
    QueryTranslator, RawQuery, SortSpec,
};
pub use repository::{
    Capabilities, LinksRepository, MetaRepository, RepositoryEntry, ResourceRepository,
};
pub use resource::{Reference, Relation, Resource};
pub use response::{
    Envelope, LinksInformation, MetaInformation, Payload, RawResult, ResponseAssembler,
};
pub use server::{LoopbackTransport, RequestDispatcher, ServerRequest, ServerResponse};
