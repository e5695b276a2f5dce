//! The transport collaborator: whatever actually moves requests over the wire.

use crate::document::Document;
use crate::error::TransportError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    pub status: u16,
    pub body: Option<Document>,
}

impl ClientResponse {
    pub fn new(status: u16, body: Option<Document>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one request, blocking the calling thread until the response arrives.
///
/// A transport reports non-2xx responses as ordinary [`ClientResponse`]s; only failures to
/// exchange the request at all are [`TransportError`]s.
pub trait Transport: Send + Sync {
    fn execute(&self, request: ClientRequest) -> Result<ClientResponse, TransportError>;
}
