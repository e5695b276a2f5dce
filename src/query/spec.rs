//! The canonical query.
//!
//! [`QuerySpec`] is the only query representation the rest of the bridge sees. It is either
//! built directly with the consuming builder methods below, or produced by the
//! [`QueryTranslator`](crate::QueryTranslator) from flat query parameters. Once built it is
//! never mutated.

use crate::operator::FilterOperator;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

/// A dotted field path such as `project.owner.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSpec(Vec<String>);

impl PathSpec {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn parse(raw: &str) -> Self {
        Self(raw.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for PathSpec {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Filter tree. Top-level filters of a [`QuerySpec`] are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    Condition {
        path: PathSpec,
        operator: FilterOperator,
        value: Value,
    },
    And(Vec<FilterSpec>),
    Or(Vec<FilterSpec>),
    Not(Box<FilterSpec>),
}

impl FilterSpec {
    pub fn new(path: impl Into<PathSpec>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        FilterSpec::Condition {
            path: path.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(path: impl Into<PathSpec>, value: impl Into<Value>) -> Self {
        Self::new(path, FilterOperator::EQ, value)
    }

    pub fn and(filters: Vec<FilterSpec>) -> Self {
        FilterSpec::And(filters)
    }

    pub fn or(filters: Vec<FilterSpec>) -> Self {
        FilterSpec::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: FilterSpec) -> Self {
        FilterSpec::Not(Box::new(filter))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub path: PathSpec,
    pub direction: Direction,
}

impl SortSpec {
    pub fn asc(path: impl Into<PathSpec>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(path: impl Into<PathSpec>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Descending,
        }
    }
}

/// Pagination. `offset` and `limit` are understood by the in-memory evaluator; every other
/// `page[...]` parameter (cursors, page numbers) is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub extra: BTreeMap<String, String>,
}

impl Pagination {
    pub fn is_empty(&self) -> bool {
        self.offset.is_none() && self.limit.is_none() && self.extra.is_empty()
    }
}

/// Canonical query: filters, sorting, grouping, pagination, inclusions and sparse fieldsets.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    resource_type: String,
    filters: Vec<FilterSpec>,
    sort: Vec<SortSpec>,
    group_by: Vec<PathSpec>,
    pagination: Pagination,
    includes: BTreeSet<PathSpec>,
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl QuerySpec {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            filters: Vec::new(),
            sort: Vec::new(),
            group_by: Vec::new(),
            pagination: Pagination::default(),
            includes: BTreeSet::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn for_resource<T: Resource>() -> Self {
        Self::new(T::RESOURCE_TYPE)
    }

    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn group_by(mut self, path: impl Into<PathSpec>) -> Self {
        self.group_by.push(path.into());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.pagination.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub fn page_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pagination.extra.insert(key.into(), value.into());
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn include(mut self, path: impl Into<PathSpec>) -> Self {
        self.includes.insert(path.into());
        self
    }

    /// Restricts the fields rendered for `resource_type`.
    pub fn fields<I, S>(mut self, resource_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .entry(resource_type.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn sorting(&self) -> &[SortSpec] {
        &self.sort
    }

    pub fn grouping(&self) -> &[PathSpec] {
        &self.group_by
    }

    pub fn page(&self) -> &Pagination {
        &self.pagination
    }

    pub fn includes(&self) -> &BTreeSet<PathSpec> {
        &self.includes
    }

    pub fn included_fields(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.fields
    }

    /// Sparse fieldset for a type, `None` when every field is wanted.
    pub fn fields_for(&self, resource_type: &str) -> Option<&BTreeSet<String>> {
        self.fields.get(resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates() {
        let spec = QuerySpec::new("tasks")
            .filter(FilterSpec::eq("name", "foo"))
            .sort(SortSpec::desc("created"))
            .include("project")
            .include("project")
            .fields("tasks", ["name"])
            .fields("tasks", ["done"])
            .offset(10)
            .limit(5);

        assert_eq!(spec.filters().len(), 1);
        assert_eq!(spec.sorting()[0].direction, Direction::Descending);
        assert_eq!(spec.includes().len(), 1);
        assert_eq!(spec.fields_for("tasks").unwrap().len(), 2);
        assert_eq!(spec.page().offset, Some(10));
        assert_eq!(spec.page().limit, Some(5));
        assert!(spec.fields_for("projects").is_none());
    }

    #[test]
    fn test_path_display() {
        let path = PathSpec::parse("project.owner.name");
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.to_string(), "project.owner.name");
    }
}
