//! In-memory evaluation of a [`QuerySpec`] against a slice of entities.

use crate::descriptor::{DescriptorTable, ResourceDescriptor};
use crate::error::DocumentError;
use crate::operator;
use crate::query::spec::{Direction, FilterSpec, PathSpec, QuerySpec};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;

impl QuerySpec {
    /// Filters, sorts and pages `items` the way a repository backed by memory would.
    ///
    /// Entities are compared through their JSON form. A dotted path walks through loaded
    /// relations; when a path ends on a related object, the object's `id` is compared.
    /// To-many relationships yield an array, which `EQ` treats as "contains".
    ///
    /// Sorting is stable; values that do not compare (mixed kinds) keep their order, and
    /// nulls sort first. Grouping does not affect the result.
    pub fn apply<T: Serialize + Clone>(&self, items: &[T]) -> Result<Vec<T>, DocumentError> {
        self.evaluate(items, Scope::default())
    }

    /// Like [`apply`](Self::apply), but a path ending on a related object compares the id
    /// field named by the related type's descriptor.
    pub fn apply_with<T: Serialize + Clone>(
        &self,
        items: &[T],
        descriptors: &DescriptorTable,
    ) -> Result<Vec<T>, DocumentError> {
        let scope = Scope {
            table: Some(descriptors),
            descriptor: descriptors.get(self.resource_type()),
        };
        self.evaluate(items, scope)
    }

    fn evaluate<T: Serialize + Clone>(&self, items: &[T], scope: Scope<'_>) -> Result<Vec<T>, DocumentError> {
        let mut rows = items
            .iter()
            .map(|item| {
                serde_json::to_value(item)
                    .map(|json| (json, item))
                    .map_err(|e| DocumentError::Serialization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        rows.retain(|(json, _)| self.filters().iter().all(|filter| matches(filter, json, scope)));

        if !self.sorting().is_empty() {
            rows.sort_by(|(a, _), (b, _)| {
                self.sorting()
                    .iter()
                    .map(|sort| {
                        let ordering = sort_order(
                            &lookup(a, &sort.path, scope),
                            &lookup(b, &sort.path, scope),
                        );
                        match sort.direction {
                            Direction::Ascending => ordering,
                            Direction::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let page = self.page();
        let offset = usize::try_from(page.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = page
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect())
    }
}

/// The descriptor of the object a path walk currently stands on, when known.
#[derive(Debug, Clone, Copy, Default)]
struct Scope<'a> {
    table: Option<&'a DescriptorTable>,
    descriptor: Option<&'a ResourceDescriptor>,
}

impl<'a> Scope<'a> {
    fn enter(self, relationship: &str) -> Self {
        let descriptor = self
            .descriptor
            .and_then(|d| d.relationship(relationship))
            .and_then(|r| self.table?.get(&r.target_type));
        Self { descriptor, ..self }
    }

    fn id_key(self) -> &'a str {
        self.descriptor
            .map(|d| d.id_field().name.as_str())
            .unwrap_or("id")
    }
}

fn matches(filter: &FilterSpec, json: &Value, scope: Scope<'_>) -> bool {
    match filter {
        FilterSpec::Condition {
            path,
            operator,
            value,
        } => operator.matches(&lookup(json, path, scope), value),
        FilterSpec::And(filters) => filters.iter().all(|f| matches(f, json, scope)),
        FilterSpec::Or(filters) => filters.iter().any(|f| matches(f, json, scope)),
        FilterSpec::Not(filter) => !matches(filter, json, scope),
    }
}

fn lookup(json: &Value, path: &PathSpec, scope: Scope<'_>) -> Value {
    walk(json, path.segments(), scope)
}

fn walk(value: &Value, segments: &[String], scope: Scope<'_>) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return match value {
            // References carry their id as `id` whatever the target names it.
            Value::Object(map) => map
                .get(scope.id_key())
                .or_else(|| map.get("id"))
                .cloned()
                .unwrap_or(Value::Null),
            Value::Array(items) => Value::Array(items.iter().map(|i| walk(i, &[], scope)).collect()),
            other => other.clone(),
        };
    };

    match value {
        Value::Object(map) => map
            .get(head.as_str())
            .map(|next| walk(next, rest, scope.enter(head)))
            .unwrap_or(Value::Null),
        Value::Array(items) => {
            let mut leaves = Vec::new();
            for item in items {
                match walk(item, segments, scope) {
                    Value::Array(nested) => leaves.extend(nested),
                    Value::Null => {}
                    leaf => leaves.push(leaf),
                }
            }
            Value::Array(leaves)
        }
        _ => Value::Null,
    }
}

fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => operator::compare(a, b).unwrap_or(Ordering::Equal),
    }
}
