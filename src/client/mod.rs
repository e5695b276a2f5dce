//! # Client Side
//!
//! A [`BridgeClient`] hands out one [`RepositoryStub`] per resource type. Stubs share the
//! client's configuration, translator, mapper and [`Transport`]; all of them are immutable, so
//! stubs can be cloned freely and used from any thread.
//!
//! ```rust
//! use resource_bridge::{
//!     BridgeClient, ClientConfig, DescriptorTable, FilterOperatorRegistry, MockTransport,
//!     QueryTranslator, ResourceDescriptor, ValueKind,
//! };
//! use std::sync::Arc;
//!
//! let table = DescriptorTable::builder()
//!     .descriptor(ResourceDescriptor::builder("tasks").id("id", ValueKind::Integer).build())
//!     .build()
//!     .unwrap();
//! let translator = QueryTranslator::new(
//!     Arc::new(table),
//!     Arc::new(FilterOperatorRegistry::with_defaults()),
//! );
//!
//! let transport = MockTransport::new();
//! let client = BridgeClient::new(
//!     ClientConfig::new("http://localhost:8080/api"),
//!     Arc::new(translator),
//!     Arc::new(transport.clone()),
//! );
//! assert_eq!(client.config().base_url(), "http://localhost:8080/api");
//! ```

pub mod stub;
pub mod transport;
pub mod typed;
pub mod url;

pub use stub::RepositoryStub;
pub use transport::{ClientRequest, ClientResponse, HttpMethod, Transport};
pub use typed::TypedClient;
pub use url::UrlBuilder;

use crate::config::ClientConfig;
use crate::document::DocumentMapper;
use crate::error::{DocumentError, Result};
use crate::query::QueryTranslator;
use crate::resource::Resource;
use std::fmt;
use std::sync::Arc;

/// Factory for repository stubs sharing one configuration and transport.
#[derive(Clone)]
pub struct BridgeClient {
    config: Arc<ClientConfig>,
    translator: Arc<QueryTranslator>,
    mapper: Arc<DocumentMapper>,
    transport: Arc<dyn Transport>,
}

impl BridgeClient {
    pub fn new(
        config: ClientConfig,
        translator: Arc<QueryTranslator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mapper = DocumentMapper::new(translator.descriptors().clone());
        Self {
            config: Arc::new(config),
            translator,
            mapper: Arc::new(mapper),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A stub for `T`. Fails if `T`'s resource type has no descriptor.
    pub fn repository<T: Resource>(&self) -> Result<RepositoryStub<T>> {
        if !self.translator.descriptors().contains(T::RESOURCE_TYPE) {
            return Err(DocumentError::UnknownResourceType(T::RESOURCE_TYPE.to_string()).into());
        }
        Ok(RepositoryStub::new(
            self.config.clone(),
            self.translator.clone(),
            self.mapper.clone(),
            self.transport.clone(),
        ))
    }
}

impl fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
