//! # Mock Transport & Testing Guide
//!
//! [`MockTransport`] implements [`Transport`] entirely in memory. Tests queue the requests
//! they expect, each with the response to hand back, then run the client code and `verify()`
//! that every expectation was consumed.
//!
//! ## When to use the Mock vs the Loopback
//!
//! | Feature | MockTransport | LoopbackTransport |
//! |---------|---------------|-------------------|
//! | **Server** | None (canned responses) | Real dispatcher and repositories |
//! | **Asserts on** | Exact verb, URL and body of each request | End-to-end behavior |
//! | **Error Injection** | Easy (`return_err`, any status) | Requires real failing state |
//! | **Use Case** | Unit testing stubs and client logic | Full system tests |
//!
//! ## Example
//!
//! ```rust
//! use resource_bridge::{
//!     BridgeClient, ClientConfig, DescriptorTable, Document, FilterOperatorRegistry, HttpMethod,
//!     MockTransport, QueryTranslator, Resource, ResourceDescriptor, ResourceObject,
//!     ResourceRepository, ValueKind,
//! };
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Task { id: Option<u64>, #[serde(default)] name: String }
//!
//! impl Resource for Task {
//!     type Id = u64;
//!     const RESOURCE_TYPE: &'static str = "tasks";
//!     fn descriptor() -> ResourceDescriptor {
//!         ResourceDescriptor::builder("tasks")
//!             .id("id", ValueKind::Integer)
//!             .attribute("name", ValueKind::String)
//!             .build()
//!     }
//!     fn id(&self) -> Option<&u64> { self.id.as_ref() }
//!     fn set_id(&mut self, id: u64) { self.id = Some(id); }
//! }
//!
//! let table = DescriptorTable::builder().register::<Task>().build().unwrap();
//! let translator = QueryTranslator::new(
//!     Arc::new(table),
//!     Arc::new(FilterOperatorRegistry::with_defaults()),
//! );
//!
//! // 1. Setup expectations
//! let mock = MockTransport::new();
//! let mut task = ResourceObject::new("tasks", Some("5".into()));
//! task.attributes.insert("name".into(), "write docs".into());
//! mock.expect_get("http://api/tasks/5")
//!     .return_ok(200, Some(Document::single(Some(task))));
//!
//! // 2. Create a client over the mock
//! let client = BridgeClient::new(
//!     ClientConfig::new("http://api"),
//!     Arc::new(translator),
//!     Arc::new(mock.clone()),
//! );
//! let tasks = client.repository::<Task>().unwrap();
//!
//! // 3. Exercise and verify
//! let found = tasks.find_one(&5, None).unwrap();
//! assert_eq!(found.name, "write docs");
//! assert_eq!(mock.requests()[0].method, HttpMethod::Get);
//! mock.verify();
//! ```

use crate::client::transport::{ClientRequest, ClientResponse, HttpMethod, Transport};
use crate::document::Document;
use crate::error::TransportError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected request and the response it gets.
struct Expectation {
    method: HttpMethod,
    url: String,
    response: Result<ClientResponse, TransportError>,
}

/// A transport with expectation tracking for fluent testing.
///
/// Clones share their expectations and recorded requests, so a test can keep one handle and
/// give another to the code under test.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    requests: Arc<Mutex<Vec<ClientRequest>>>,
}

impl MockTransport {
    /// Creates a mock transport with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a request with exactly this verb and URL.
    pub fn expect(&self, method: HttpMethod, url: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            url: url.into(),
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_get(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(HttpMethod::Get, url)
    }

    pub fn expect_post(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(HttpMethod::Post, url)
    }

    pub fn expect_patch(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(HttpMethod::Patch, url)
    }

    pub fn expect_delete(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(HttpMethod::Delete, url)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ClientRequest> {
        lock(&self.requests).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = lock(&self.expectations);
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: ClientRequest) -> Result<ClientResponse, TransportError> {
        lock(&self.requests).push(request.clone());
        let expectation = lock(&self.expectations).pop_front();

        match expectation {
            Some(exp) if exp.method == request.method && exp.url == request.url => exp.response,
            Some(exp) => panic!(
                "Expected {} {} but got {} {}",
                exp.method, exp.url, request.method, request.url
            ),
            None => panic!("Unexpected request: {} {}", request.method, request.url),
        }
    }
}

/// Builder for one expectation.
pub struct ExpectationBuilder {
    method: HttpMethod,
    url: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ExpectationBuilder {
    /// Responds with `status` and `body`. Non-2xx statuses are valid here too.
    pub fn return_ok(self, status: u16, body: Option<Document>) {
        self.push(Ok(ClientResponse::new(status, body)));
    }

    /// Fails the request at the transport level.
    pub fn return_err(self, error: TransportError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<ClientResponse, TransportError>) {
        lock(&self.expectations).push_back(Expectation {
            method: self.method,
            url: self.url,
            response,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: HttpMethod, url: &str) -> ClientRequest {
        ClientRequest {
            method,
            url: url.to_string(),
            body: None,
        }
    }

    #[test]
    fn test_expectations_are_consumed_in_order() {
        let mock = MockTransport::new();
        mock.expect_get("http://api/tasks").return_ok(200, Some(Document::collection(vec![])));
        mock.expect_delete("http://api/tasks/5").return_ok(204, None);

        let first = mock.execute(request(HttpMethod::Get, "http://api/tasks")).unwrap();
        assert_eq!(first.status, 200);
        let second = mock
            .execute(request(HttpMethod::Delete, "http://api/tasks/5"))
            .unwrap();
        assert!(second.body.is_none());

        assert_eq!(mock.requests().len(), 2);
        mock.verify();
    }

    #[test]
    fn test_error_injection() {
        let mock = MockTransport::new();
        mock.expect_post("http://api/tasks")
            .return_err(TransportError::Connection("reset".into()));

        let result = mock.execute(request(HttpMethod::Post, "http://api/tasks"));
        assert_eq!(result, Err(TransportError::Connection("reset".into())));
    }

    #[test]
    #[should_panic(expected = "Expected GET http://api/tasks/1 but got GET http://api/tasks/2")]
    fn test_mismatch_panics() {
        let mock = MockTransport::new();
        mock.expect_get("http://api/tasks/1").return_ok(200, None);
        let _ = mock.execute(request(HttpMethod::Get, "http://api/tasks/2"));
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met. 1 remaining")]
    fn test_verify_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect_patch("http://api/tasks/1").return_ok(200, None);
        mock.verify();
    }
}
