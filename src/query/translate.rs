//! Translation of raw queries into the canonical [`QuerySpec`].

use crate::descriptor::{DescriptorTable, FieldTarget, ResourceDescriptor};
use crate::error::QueryError;
use crate::operator::FilterOperatorRegistry;
use crate::query::params::{FilterParam, ListParam, QueryParams};
use crate::query::spec::{FilterSpec, Pagination, PathSpec, QuerySpec, SortSpec};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A query in either of its two source encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum RawQuery {
    /// Flat query parameters, as found in a URL.
    Params(QueryParams),
    /// A query already built by the caller.
    Spec(QuerySpec),
}

impl From<QueryParams> for RawQuery {
    fn from(params: QueryParams) -> Self {
        RawQuery::Params(params)
    }
}

impl From<QuerySpec> for RawQuery {
    fn from(spec: QuerySpec) -> Self {
        RawQuery::Spec(spec)
    }
}

/// Turns raw queries into canonical ones, and canonical ones back into flat parameters.
///
/// The translator only reads the descriptor table and the operator registries it holds; it
/// is cheap to share across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    descriptors: Arc<DescriptorTable>,
    operators: Arc<FilterOperatorRegistry>,
    per_type: BTreeMap<String, Arc<FilterOperatorRegistry>>,
}

impl QueryTranslator {
    pub fn new(descriptors: Arc<DescriptorTable>, operators: Arc<FilterOperatorRegistry>) -> Self {
        Self {
            descriptors,
            operators,
            per_type: BTreeMap::new(),
        }
    }

    /// Uses a dedicated registry for one resource type, e.g. to restrict its operators.
    pub fn with_registry_for(
        mut self,
        resource_type: impl Into<String>,
        registry: Arc<FilterOperatorRegistry>,
    ) -> Self {
        self.per_type.insert(resource_type.into(), registry);
        self
    }

    pub fn descriptors(&self) -> &Arc<DescriptorTable> {
        &self.descriptors
    }

    pub fn registry_for(&self, resource_type: &str) -> &FilterOperatorRegistry {
        self.per_type
            .get(resource_type)
            .unwrap_or(&self.operators)
    }

    /// Translates a raw query for `descriptor`'s resource type.
    ///
    /// A typed query passes through unchanged. Flat parameters are validated against the
    /// descriptor table and the operator registry; the first problem fails the whole
    /// translation.
    pub fn translate(
        &self,
        raw: RawQuery,
        descriptor: &ResourceDescriptor,
    ) -> Result<QuerySpec, QueryError> {
        match raw {
            RawQuery::Spec(spec) => Ok(spec),
            RawQuery::Params(params) => self.from_params(&params, descriptor),
        }
    }

    /// Translates by resource type name.
    pub fn translate_for(
        &self,
        raw: RawQuery,
        resource_type: &str,
    ) -> Result<QuerySpec, QueryError> {
        let descriptor = self
            .descriptors
            .get(resource_type)
            .ok_or_else(|| QueryError::UnknownResourceType(resource_type.to_string()))?;
        self.translate(raw, descriptor)
    }

    /// Renders a canonical query as flat parameters, using the registry of its resource type
    /// to decide which operator tokens can be left out.
    pub fn to_params(&self, spec: &QuerySpec) -> Result<QueryParams, QueryError> {
        QueryParams::from_spec(spec, self.registry_for(spec.resource_type()))
    }

    fn from_params(
        &self,
        params: &QueryParams,
        descriptor: &ResourceDescriptor,
    ) -> Result<QuerySpec, QueryError> {
        let resource_type = descriptor.resource_type();
        let mut spec = QuerySpec::new(resource_type);

        for filter in params.filters() {
            spec = spec.filter(self.filter(filter, descriptor)?);
        }

        for list in params.sorting() {
            self.check_scope("sort", list, resource_type)?;
            for raw in &list.values {
                let sort = match raw.strip_prefix('-') {
                    Some(path) => SortSpec::desc(PathSpec::parse(path)),
                    None => SortSpec::asc(PathSpec::parse(raw.strip_prefix('+').unwrap_or(raw))),
                };
                self.descriptors
                    .resolve_path(descriptor, sort.path.segments())?;
                spec = spec.sort(sort);
            }
        }

        for list in params.grouping() {
            self.check_scope("group", list, resource_type)?;
            for raw in &list.values {
                let path = PathSpec::parse(raw);
                self.descriptors.resolve_path(descriptor, path.segments())?;
                spec = spec.group_by(path);
            }
        }

        spec = spec.pagination(pagination(params.pagination())?);

        for list in params.included_relations() {
            self.check_scope("include", list, resource_type)?;
            for raw in &list.values {
                let path = PathSpec::parse(raw);
                self.descriptors
                    .resolve_relationship_path(descriptor, path.segments())?;
                spec = spec.include(path);
            }
        }

        for list in params.included_fields() {
            let target = match &list.resource_type {
                Some(name) => self
                    .descriptors
                    .get(name)
                    .ok_or_else(|| QueryError::UnknownResourceType(name.clone()))?,
                None => descriptor,
            };
            for field in &list.values {
                if !target.has_field(field) {
                    return Err(QueryError::UnknownField {
                        resource_type: target.resource_type().to_string(),
                        field: field.clone(),
                    });
                }
            }
            spec = spec.fields(target.resource_type(), list.values.iter().cloned());
        }

        tracing::debug!(resource_type, ?spec, "Translated query parameters");
        Ok(spec)
    }

    /// `filter[path]`, `filter[path][OP]`, `filter[type][path]`, `filter[type][path][OP]`.
    fn filter(
        &self,
        param: &FilterParam,
        descriptor: &ResourceDescriptor,
    ) -> Result<FilterSpec, QueryError> {
        let resource_type = descriptor.resource_type();
        let segments = param.segments.as_slice();
        let (path, token) = match segments {
            [path] => (path, None),
            [qualifier, path] if is_type_qualifier(qualifier, descriptor) => (path, None),
            [path, token] => (path, Some(token.as_str())),
            [qualifier, path, token] if is_type_qualifier(qualifier, descriptor) => {
                (path, Some(token.as_str()))
            }
            [qualifier, _, _] => {
                return Err(QueryError::UnknownField {
                    resource_type: resource_type.to_string(),
                    field: qualifier.clone(),
                })
            }
            _ => {
                return Err(QueryError::Malformed(format!(
                    "filter[{}]",
                    segments.join("][")
                )))
            }
        };

        let path = PathSpec::parse(path);
        let target = self.descriptors.resolve_path(descriptor, path.segments())?;
        let operator = self
            .registry_for(resource_type)
            .resolve_or_default(token)?;

        let kind = target.value_kind(&self.descriptors);
        let field_name = match target {
            FieldTarget::Id(id) => id.name.as_str(),
            FieldTarget::Attribute(attribute) => attribute.name.as_str(),
            FieldTarget::Relationship(rel) => rel.name.as_str(),
        };
        let mut values = param
            .values
            .iter()
            .map(|raw| {
                kind.parse(raw).ok_or_else(|| QueryError::InvalidValue {
                    field: field_name.to_string(),
                    value: raw.clone(),
                    expected: kind.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let value = match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Array(values),
        };
        Ok(FilterSpec::new(path, operator, value))
    }

    fn check_scope(
        &self,
        family: &str,
        list: &ListParam,
        resource_type: &str,
    ) -> Result<(), QueryError> {
        match &list.resource_type {
            Some(name) if name != resource_type => {
                if self.descriptors.contains(name) {
                    Err(QueryError::Malformed(format!(
                        "{family}[{name}] does not apply to resource type {resource_type}"
                    )))
                } else {
                    Err(QueryError::UnknownResourceType(name.clone()))
                }
            }
            _ => Ok(()),
        }
    }
}

fn is_type_qualifier(segment: &str, descriptor: &ResourceDescriptor) -> bool {
    segment == descriptor.resource_type() && !descriptor.has_field(segment)
}

fn pagination(raw: &BTreeMap<String, String>) -> Result<Pagination, QueryError> {
    let number = |name: &str, value: &String| {
        value.parse::<u64>().map_err(|_| QueryError::InvalidValue {
            field: format!("page[{name}]"),
            value: value.clone(),
            expected: "non-negative integer".to_string(),
        })
    };

    let mut page = Pagination::default();
    for (name, value) in raw {
        match name.as_str() {
            "offset" => page.offset = Some(number(name, value)?),
            "limit" => page.limit = Some(number(name, value)?),
            _ => {
                page.extra.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ValueKind;
    use crate::operator::FilterOperator;
    use crate::query::spec::Direction;

    fn translator() -> QueryTranslator {
        let people = ResourceDescriptor::builder("people")
            .id("id", ValueKind::Integer)
            .attribute("name", ValueKind::String)
            .build();
        let projects = ResourceDescriptor::builder("projects")
            .attribute("name", ValueKind::String)
            .to_one("owner", "people")
            .build();
        let tasks = ResourceDescriptor::builder("tasks")
            .id("id", ValueKind::Integer)
            .attribute("name", ValueKind::String)
            .attribute("done", ValueKind::Boolean)
            .attribute("priority", ValueKind::Integer)
            .attribute("created", ValueKind::Integer)
            .to_one("project", "projects")
            .to_many("assignees", "people")
            .build();
        let table = DescriptorTable::builder()
            .descriptor(people)
            .descriptor(projects)
            .descriptor(tasks)
            .build()
            .unwrap();
        QueryTranslator::new(
            Arc::new(table),
            Arc::new(FilterOperatorRegistry::with_defaults()),
        )
    }

    fn translate(translator: &QueryTranslator, query: &str) -> Result<QuerySpec, QueryError> {
        let params = QueryParams::parse(query)?;
        translator.translate_for(params.into(), "tasks")
    }

    #[test]
    fn test_flat_and_typed_queries_are_equivalent() {
        let translator = translator();
        let flat = translate(&translator, "filter[name]=foo&sort=-created").unwrap();

        let typed = QuerySpec::new("tasks")
            .filter(FilterSpec::eq("name", "foo"))
            .sort(SortSpec::desc("created"));
        let typed = translator.translate_for(typed.into(), "tasks").unwrap();

        assert_eq!(flat, typed);
    }

    #[test]
    fn test_typed_query_passes_through_unchanged() {
        let translator = translator();
        // Not validated: a typed query is taken as given.
        let typed = QuerySpec::new("tasks").filter(FilterSpec::eq("whatever", 1));
        assert_eq!(
            translator.translate_for(typed.clone().into(), "tasks").unwrap(),
            typed
        );
    }

    #[test]
    fn test_filter_values_are_typed_by_descriptor() {
        let translator = translator();
        let spec = translate(
            &translator,
            "filter[priority][GE]=2&filter[done]=true&filter[id]=1,2&filter[project.owner.name][LIKE]=al%25",
        )
        .unwrap();

        assert_eq!(
            spec.filters(),
            &[
                FilterSpec::new("priority", FilterOperator::GE, 2),
                FilterSpec::eq("done", true),
                FilterSpec::eq("id", serde_json::json!([1, 2])),
                FilterSpec::new("project.owner.name", FilterOperator::LIKE, "al%"),
            ]
        );
    }

    #[test]
    fn test_type_qualified_filter() {
        let translator = translator();
        let spec = translate(&translator, "filter[tasks][name][EQ]=foo").unwrap();
        assert_eq!(spec.filters(), &[FilterSpec::eq("name", "foo")]);
    }

    #[test]
    fn test_unknown_field_fails() {
        let translator = translator();
        assert_eq!(
            translate(&translator, "filter[color]=red").unwrap_err(),
            QueryError::UnknownField {
                resource_type: "tasks".into(),
                field: "color".into()
            }
        );
        assert!(matches!(
            translate(&translator, "sort=-colour"),
            Err(QueryError::UnknownField { .. })
        ));
        assert!(matches!(
            translate(&translator, "include=name"),
            Err(QueryError::UnknownField { .. })
        ));
        assert!(matches!(
            translate(&translator, "fields[projects]=budget"),
            Err(QueryError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_unsupported_operator_fails() {
        let translator = translator();
        assert_eq!(
            translate(&translator, "filter[name][SOUNDS_LIKE]=foo").unwrap_err(),
            QueryError::UnsupportedOperator("SOUNDS_LIKE".into())
        );
    }

    #[test]
    fn test_per_type_registry_restricts_operators() {
        let mut strict = FilterOperatorRegistry::new(FilterOperator::EQ);
        strict.register(FilterOperator::NEQ);
        let translator = translator().with_registry_for("tasks", Arc::new(strict));

        assert!(translate(&translator, "filter[name][NEQ]=foo").is_ok());
        assert!(matches!(
            translate(&translator, "filter[name][LIKE]=foo"),
            Err(QueryError::UnsupportedOperator(_))
        ));
        assert!(translator
            .translate_for(
                QueryParams::parse("filter[name][LIKE]=foo").unwrap().into(),
                "projects"
            )
            .is_ok());
    }

    #[test]
    fn test_invalid_value_fails() {
        let translator = translator();
        assert!(matches!(
            translate(&translator, "filter[priority]=high"),
            Err(QueryError::InvalidValue { .. })
        ));
        assert!(matches!(
            translate(&translator, "page[limit]=-1"),
            Err(QueryError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_sort_page_include_fields_are_copied() {
        let translator = translator();
        let spec = translate(
            &translator,
            "sort=name,-priority&group=done&page[offset]=5&page[limit]=5&page[cursor]=abc&include=project.owner,assignees&fields=name&fields[people]=name",
        )
        .unwrap();

        assert_eq!(spec.sorting()[1].direction, Direction::Descending);
        assert_eq!(spec.grouping(), &[PathSpec::parse("done")]);
        assert_eq!(spec.page().offset, Some(5));
        assert_eq!(spec.page().extra.get("cursor").map(String::as_str), Some("abc"));
        assert!(spec.includes().contains(&PathSpec::parse("project.owner")));
        assert!(spec.fields_for("tasks").unwrap().contains("name"));
        assert!(spec.fields_for("people").unwrap().contains("name"));
    }

    #[test]
    fn test_scope_mismatch_fails() {
        let translator = translator();
        assert!(matches!(
            translate(&translator, "sort[projects]=name"),
            Err(QueryError::Malformed(_))
        ));
        assert!(matches!(
            translate(&translator, "include[planets]=moons"),
            Err(QueryError::UnknownResourceType(_))
        ));
    }

    #[test]
    fn test_round_trip_through_params() {
        let translator = translator();
        let spec = QuerySpec::new("tasks")
            .filter(FilterSpec::new("priority", FilterOperator::GT, 1))
            .sort(SortSpec::asc("name"))
            .include("project")
            .limit(3);

        let params = translator.to_params(&spec).unwrap();
        let back = translator
            .translate_for(RawQuery::Params(params), "tasks")
            .unwrap();
        assert_eq!(back, spec);
    }
}
