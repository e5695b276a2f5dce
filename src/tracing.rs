//! # Tracing Setup
//!
//! Every layer of the bridge logs through `tracing` with structured fields, so log lines can
//! be filtered by resource type, verb or URL:
//!
//! | Level | What |
//! |-------|------|
//! | `debug` | Entry of every operation, with full queries, entities and documents |
//! | `info` | Completed state changes (`Created`, `Saved`, `Deleted`, `Written`) |
//! | `warn` | Failed requests and repository operations |
//!
//! ## Trace Example
//!
//! **With `RUST_LOG=info`** (compact):
//!
//! ```text
//! INFO Created resource_type="tasks" id=1 size=1
//! INFO create:create: Written resource_type="tasks" method=POST id=Some(1)
//! INFO delete:delete: Deleted resource_type="tasks" id=1
//! ```
//!
//! **With `RUST_LOG=debug`** (detailed):
//!
//! ```text
//! DEBUG find_all: Sending request method=GET url="http://localhost/api/tasks?filter[done]=false"
//! DEBUG Dispatching method=GET path="/tasks" query=QueryParams { .. }
//! DEBUG Translated query parameters resource_type="tasks" spec=QuerySpec { .. }
//! DEBUG Find all resource_type="tasks" query=Some(QuerySpec { .. })
//! DEBUG Assembling response resource_type="tasks" meta=true links=true
//! DEBUG find_all: Received response method=GET url="..." status=200
//! ```
//!
//! Client stub operations run inside spans named after the operation, so nested lines show
//! which call they belong to.

/// Initializes the tracing subscriber, filtered through `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Module paths add nothing next to resource_type
        .compact()
        .init();
}
