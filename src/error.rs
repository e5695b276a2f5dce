//! # Bridge Errors
//!
//! Every layer of the bridge has its own error enum so callers can match on exactly what went
//! wrong:
//!
//! - [`DescriptorError`] - the descriptor table could not be built.
//! - [`QueryError`] - a query could not be parsed, translated or rendered.
//! - [`DocumentError`] - an entity and a wire document could not be mapped onto each other.
//! - [`TransportError`] - the transport collaborator reported a failure.
//! - [`ConfigError`] - client configuration could not be read from the environment.
//!
//! Repository operations (server-side repositories and client stubs alike) return
//! [`BridgeError`], which wraps all of the above.

use crate::document::Document;
use thiserror::Error;

/// Convenience alias used by repository operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Errors raised while building the [`DescriptorTable`](crate::DescriptorTable).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DescriptorError {
    #[error("Resource type registered twice: {0}")]
    DuplicateResourceType(String),

    #[error("Field `{field}` declared twice on resource type `{resource_type}`")]
    DuplicateField {
        resource_type: String,
        field: String,
    },

    #[error("Relationship `{resource_type}.{relationship}` targets unknown resource type `{target}`")]
    UnknownTarget {
        resource_type: String,
        relationship: String,
        target: String,
    },
}

/// Errors raised by query parsing and translation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    /// A filter, sort, group, field or inclusion names a field the descriptor does not have.
    #[error("Unknown field `{field}` on resource type `{resource_type}`")]
    UnknownField {
        resource_type: String,
        field: String,
    },

    /// A filter names an operator token that is neither registered nor the default.
    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// A raw value could not be converted to the kind of the field it filters.
    #[error("Invalid value `{value}` for `{field}`: expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Malformed query parameter: {0}")]
    Malformed(String),

    /// The query holds a construct the flat query-parameter encoding cannot carry.
    #[error("Query cannot be expressed as query parameters: {0}")]
    NotRepresentable(String),
}

/// Errors raised while mapping between entities and wire documents.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DocumentError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Expected resource type `{expected}` but found `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error("Document carries no primary data")]
    MissingData,

    #[error("Expected {expected} primary data")]
    UnexpectedShape { expected: &'static str },
}

/// Failures reported by the transport collaborator.
///
/// Non-success responses are handed back unmodified, including any body the server sent.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Request failed with status {status}")]
    Status {
        status: u16,
        body: Option<Document>,
    },

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors raised while loading [`ClientConfig`](crate::ClientConfig) from the environment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value `{value}` for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// Errors returned by repository operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An update was requested for an entity that carries no id.
    #[error("Resource of type `{resource_type}` has no id to update")]
    MissingId { resource_type: String },

    #[error("Resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// A repository implementation failed for its own reasons.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl BridgeError {
    /// Whether this error means the entity could not be turned into a request document.
    pub fn is_serialization(&self) -> bool {
        matches!(self, BridgeError::Document(DocumentError::Serialization(_)))
    }

    pub fn not_found(resource_type: impl Into<String>, id: impl ToString) -> Self {
        BridgeError::NotFound {
            resource_type: resource_type.into(),
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_errors_convert_into_bridge_error() {
        let err: BridgeError = QueryError::UnsupportedOperator("SOUNDS_LIKE".into()).into();
        assert_eq!(
            err.to_string(),
            "Unsupported filter operator: SOUNDS_LIKE"
        );

        let err: BridgeError = DocumentError::Serialization("not an object".into()).into();
        assert!(err.is_serialization());
    }

    #[test]
    fn test_transport_status_keeps_body() {
        let err = TransportError::Status {
            status: 503,
            body: Some(Document::default()),
        };
        match BridgeError::from(err) {
            BridgeError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.is_some());
            }
            other => panic!("Expected transport status error, got {other:?}"),
        }
    }
}
