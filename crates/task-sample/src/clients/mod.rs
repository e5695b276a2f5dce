//! # Clients
//!
//! Resource-specific wrappers around [`RepositoryStub`](resource_bridge::RepositoryStub).
//! Each one gets `get`, `list` and `delete` from [`TypedClient`](resource_bridge::TypedClient)
//! and adds the operations of its domain.

pub mod project_client;
pub mod task_client;

pub use project_client::ProjectClient;
pub use task_client::TaskClient;
