//! The flat query-parameter encoding.
//!
//! [`QueryParams`] is the query as it travels in a URL:
//!
//! ```text
//! filter[name]=foo&filter[priority][GE]=2&sort=-created,name&page[limit]=10&include=project&fields[tasks]=name
//! ```
//!
//! Parameters are parsed eagerly when a `QueryParams` is constructed, so a malformed key fails
//! right there instead of surfacing later. The structure is still untyped: field names,
//! operator tokens and values are only checked against the descriptors during translation.

use crate::error::QueryError;
use crate::operator::FilterOperatorRegistry;
use crate::query::spec::{Direction, FilterSpec, QuerySpec};
use serde_json::Value;
use std::collections::BTreeMap;

/// One `filter[...]` parameter: the bracket segments and the comma-separated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParam {
    pub segments: Vec<String>,
    pub values: Vec<String>,
}

/// A comma-separated list parameter, optionally qualified by a resource type
/// (`sort[tasks]=...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParam {
    pub resource_type: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    filters: Vec<FilterParam>,
    sorting: Vec<ListParam>,
    grouping: Vec<ListParam>,
    pagination: BTreeMap<String, String>,
    included_fields: Vec<ListParam>,
    included_relations: Vec<ListParam>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw (percent-encoded) query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut pairs = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            pairs.push((decode(key)?, decode(value)?));
        }
        Self::from_pairs(pairs)
    }

    /// Builds from already-decoded key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            params.add(key.as_ref(), value.as_ref())?;
        }
        Ok(params)
    }

    fn add(&mut self, key: &str, value: &str) -> Result<(), QueryError> {
        let (family, segments) = parse_key(key)?;
        match family {
            "filter" => {
                if segments.is_empty() {
                    return Err(QueryError::Malformed(key.to_string()));
                }
                let values = split_list(value);
                match self.filters.iter_mut().find(|f| f.segments == segments) {
                    Some(existing) => existing.values.extend(values),
                    None => self.filters.push(FilterParam { segments, values }),
                }
            }
            "page" => match segments.as_slice() {
                [name] => {
                    self.pagination.insert(name.clone(), value.to_string());
                }
                _ => return Err(QueryError::Malformed(key.to_string())),
            },
            "sort" => push_list(&mut self.sorting, key, segments, value)?,
            "group" => push_list(&mut self.grouping, key, segments, value)?,
            "include" => push_list(&mut self.included_relations, key, segments, value)?,
            "fields" => push_list(&mut self.included_fields, key, segments, value)?,
            _ => tracing::debug!(key, "Ignoring non-query parameter"),
        }
        Ok(())
    }

    pub fn filters(&self) -> &[FilterParam] {
        &self.filters
    }

    pub fn sorting(&self) -> &[ListParam] {
        &self.sorting
    }

    pub fn grouping(&self) -> &[ListParam] {
        &self.grouping
    }

    pub fn pagination(&self) -> &BTreeMap<String, String> {
        &self.pagination
    }

    pub fn included_fields(&self) -> &[ListParam] {
        &self.included_fields
    }

    pub fn included_relations(&self) -> &[ListParam] {
        &self.included_relations
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy with one `page[...]` parameter replaced.
    pub fn with_page_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.pagination.insert(name.into(), value.to_string());
        self
    }

    /// Renders a canonical query back into flat parameters. Filters using the registry's
    /// default operator omit the operator segment.
    pub fn from_spec(
        spec: &QuerySpec,
        registry: &FilterOperatorRegistry,
    ) -> Result<Self, QueryError> {
        let mut params = Self::default();

        for filter in spec.filters() {
            flatten_filter(filter, registry, &mut params.filters)?;
        }

        if !spec.sorting().is_empty() {
            let values = spec
                .sorting()
                .iter()
                .map(|sort| match sort.direction {
                    Direction::Ascending => sort.path.to_string(),
                    Direction::Descending => format!("-{}", sort.path),
                })
                .collect();
            params.sorting.push(ListParam {
                resource_type: None,
                values,
            });
        }

        if !spec.grouping().is_empty() {
            params.grouping.push(ListParam {
                resource_type: None,
                values: spec.grouping().iter().map(ToString::to_string).collect(),
            });
        }

        let page = spec.page();
        if let Some(offset) = page.offset {
            params.pagination.insert("offset".into(), offset.to_string());
        }
        if let Some(limit) = page.limit {
            params.pagination.insert("limit".into(), limit.to_string());
        }
        params
            .pagination
            .extend(page.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        if !spec.includes().is_empty() {
            params.included_relations.push(ListParam {
                resource_type: None,
                values: spec.includes().iter().map(ToString::to_string).collect(),
            });
        }

        for (resource_type, fields) in spec.included_fields() {
            params.included_fields.push(ListParam {
                resource_type: Some(resource_type.clone()),
                values: fields.iter().cloned().collect(),
            });
        }

        Ok(params)
    }

    /// Decoded key/value pairs in a stable order: filters, sort, group, page, include, fields.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for filter in &self.filters {
            pairs.push((bracketed("filter", &filter.segments), filter.values.join(",")));
        }
        list_pairs(&mut pairs, "sort", &self.sorting);
        list_pairs(&mut pairs, "group", &self.grouping);
        for (name, value) in &self.pagination {
            pairs.push((format!("page[{name}]"), value.clone()));
        }
        list_pairs(&mut pairs, "include", &self.included_relations);
        list_pairs(&mut pairs, "fields", &self.included_fields);
        pairs
    }

    /// Percent-encoded query string without the leading `?`. Brackets and the commas that
    /// separate list items stay literal.
    pub fn to_query_string(&self) -> String {
        let mut out = Vec::new();
        for filter in &self.filters {
            let key = bracketed("filter", &encode_all(&filter.segments));
            out.push(format!("{key}={}", encode_list(&filter.values)));
        }
        for (family, lists) in [("sort", &self.sorting), ("group", &self.grouping)] {
            for list in lists {
                out.push(format!("{}={}", list_key(family, list), encode_list(&list.values)));
            }
        }
        for (name, value) in &self.pagination {
            out.push(format!("page[{}]={}", urlencoding::encode(name), urlencoding::encode(value)));
        }
        for (family, lists) in [
            ("include", &self.included_relations),
            ("fields", &self.included_fields),
        ] {
            for list in lists {
                out.push(format!("{}={}", list_key(family, list), encode_list(&list.values)));
            }
        }
        out.join("&")
    }
}

fn decode(raw: &str) -> Result<String, QueryError> {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| QueryError::Malformed(raw.clone()))
}

/// Splits `filter[tasks][name][EQ]` into `("filter", ["tasks", "name", "EQ"])`.
fn parse_key(key: &str) -> Result<(&str, Vec<String>), QueryError> {
    let malformed = || QueryError::Malformed(key.to_string());

    let (family, mut rest) = match key.find('[') {
        Some(pos) => (&key[..pos], &key[pos..]),
        None => (key, ""),
    };
    if family.is_empty() {
        return Err(malformed());
    }

    let mut segments = Vec::new();
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
        let end = inner.find(']').ok_or_else(malformed)?;
        let segment = &inner[..end];
        if segment.is_empty() || segment.contains('[') {
            return Err(malformed());
        }
        segments.push(segment.to_string());
        rest = &inner[end + 1..];
    }
    Ok((family, segments))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_list(
    lists: &mut Vec<ListParam>,
    key: &str,
    segments: Vec<String>,
    value: &str,
) -> Result<(), QueryError> {
    let resource_type = match segments.len() {
        0 => None,
        1 => segments.into_iter().next(),
        _ => return Err(QueryError::Malformed(key.to_string())),
    };
    lists.push(ListParam {
        resource_type,
        values: split_list(value),
    });
    Ok(())
}

fn flatten_filter(
    filter: &FilterSpec,
    registry: &FilterOperatorRegistry,
    out: &mut Vec<FilterParam>,
) -> Result<(), QueryError> {
    match filter {
        FilterSpec::Condition {
            path,
            operator,
            value,
        } => {
            let mut segments = vec![path.to_string()];
            if !registry.is_default(operator) {
                segments.push(operator.token().to_string());
            }
            out.push(FilterParam {
                segments,
                values: render_values(value)?,
            });
            Ok(())
        }
        FilterSpec::And(filters) => filters
            .iter()
            .try_for_each(|f| flatten_filter(f, registry, out)),
        FilterSpec::Or(_) => Err(QueryError::NotRepresentable("OR filter".into())),
        FilterSpec::Not(_) => Err(QueryError::NotRepresentable("NOT filter".into())),
    }
}

fn render_values(value: &Value) -> Result<Vec<String>, QueryError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Result<Vec<_>, _>>(),
        other => Ok(vec![render_scalar(other)?]),
    }
}

fn render_scalar(value: &Value) -> Result<String, QueryError> {
    match value {
        Value::String(s) if s.contains(',') => Err(QueryError::NotRepresentable(format!(
            "filter value containing a comma: {s}"
        ))),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(QueryError::NotRepresentable(format!("filter value {other}"))),
    }
}

fn bracketed(family: &str, segments: &[String]) -> String {
    let mut key = family.to_string();
    for segment in segments {
        key.push('[');
        key.push_str(segment);
        key.push(']');
    }
    key
}

fn list_key(family: &str, list: &ListParam) -> String {
    match &list.resource_type {
        Some(resource_type) => format!("{family}[{}]", urlencoding::encode(resource_type)),
        None => family.to_string(),
    }
}

fn list_pairs(pairs: &mut Vec<(String, String)>, family: &str, lists: &[ListParam]) {
    for list in lists {
        let key = match &list.resource_type {
            Some(resource_type) => format!("{family}[{resource_type}]"),
            None => family.to_string(),
        };
        pairs.push((key, list.values.join(",")));
    }
}

fn encode_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| urlencoding::encode(v).into_owned())
        .collect()
}

fn encode_list(values: &[String]) -> String {
    encode_all(values).join(",")
}
