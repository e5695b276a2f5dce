//! # Queries
//!
//! The bridge accepts queries in two encodings and works internally with only one:
//!
//! - [`QueryParams`]: the flat `filter[...]`, `sort`, `page[...]`, `include`, `fields[...]`
//!   parameters of a URL, parsed eagerly when constructed.
//! - [`QuerySpec`]: the canonical, typed query, built directly by callers or produced by
//!   the [`QueryTranslator`].
//!
//! Translation validates every field path and operator token against the
//! [`DescriptorTable`](crate::DescriptorTable) and the
//! [`FilterOperatorRegistry`](crate::FilterOperatorRegistry), so a query that reaches a
//! repository is known to make sense for its resource type.
//!
//! ```rust
//! use resource_bridge::{FilterSpec, QueryParams, QuerySpec, SortSpec};
//!
//! let flat = QueryParams::parse("filter[name]=foo&sort=-created").unwrap();
//! assert_eq!(flat.filters()[0].values, vec!["foo".to_string()]);
//!
//! let typed = QuerySpec::new("tasks")
//!     .filter(FilterSpec::eq("name", "foo"))
//!     .sort(SortSpec::desc("created"));
//! assert_eq!(typed.sorting().len(), 1);
//! ```

mod eval;
pub mod params;
pub mod spec;
pub mod translate;

pub use params::{FilterParam, ListParam, QueryParams};
pub use spec::{Direction, FilterSpec, Pagination, PathSpec, QuerySpec, SortSpec};
pub use translate::{QueryTranslator, RawQuery};
