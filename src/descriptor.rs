//! # Resource Descriptors
//!
//! A [`ResourceDescriptor`] tells the bridge how one resource type looks on the wire: its
//! type name, its id field, its attributes and its relationships. The bridge never inspects
//! entity types at runtime; everything it knows about a resource comes from here.
//!
//! Descriptors are collected into a [`DescriptorTable`] once at startup. The table is
//! immutable afterwards and is shared behind an `Arc`, so any number of threads can read it
//! without locking.
//!
//! ```rust
//! use resource_bridge::{DescriptorTable, ResourceDescriptor, ValueKind};
//!
//! let projects = ResourceDescriptor::builder("projects")
//!     .id("id", ValueKind::String)
//!     .attribute("name", ValueKind::String)
//!     .build();
//! let tasks = ResourceDescriptor::builder("tasks")
//!     .id("id", ValueKind::Integer)
//!     .attribute("name", ValueKind::String)
//!     .to_one("project", "projects")
//!     .build();
//!
//! let table = DescriptorTable::builder()
//!     .descriptor(projects)
//!     .descriptor(tasks)
//!     .build()
//!     .unwrap();
//!
//! assert!(table.get("tasks").unwrap().relationship("project").is_some());
//! ```

use crate::error::{DescriptorError, QueryError};
use crate::resource::Resource;
use serde_json::Value;
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Display};

/// The kind of value a field holds. Drives conversion of raw query-string values and of
/// wire ids back into typed JSON values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Any JSON value; raw strings are kept as strings.
    Any,
}

impl ValueKind {
    /// Parses a raw string into a JSON value of this kind.
    pub fn parse(self, raw: &str) -> Option<Value> {
        match self {
            ValueKind::String | ValueKind::Any => Some(Value::String(raw.to_string())),
            ValueKind::Integer => raw.parse::<i64>().ok().map(Value::from),
            ValueKind::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ValueKind::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    /// Parses a wire id. Integer ids that overflow `i64` are retried as `u64`.
    pub fn parse_id(self, raw: &str) -> Option<Value> {
        match self {
            ValueKind::Integer => self
                .parse(raw)
                .or_else(|| raw.parse::<u64>().ok().map(Value::from)),
            _ => self.parse(raw),
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Any => "any value",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdField {
    pub name: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeField {
    pub name: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipField {
    pub name: String,
    /// Wire type name of the related resource.
    pub target_type: String,
    pub cardinality: Cardinality,
    /// Related resources are placed in `included` even when the query does not ask for them.
    pub include_by_default: bool,
}

/// Wire-level description of one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    resource_type: String,
    id_field: IdField,
    attributes: Vec<AttributeField>,
    relationships: Vec<RelationshipField>,
}

impl ResourceDescriptor {
    /// Starts a descriptor. The id field defaults to a string field named `id`.
    pub fn builder(resource_type: impl Into<String>) -> ResourceDescriptorBuilder {
        ResourceDescriptorBuilder {
            descriptor: ResourceDescriptor {
                resource_type: resource_type.into(),
                id_field: IdField {
                    name: "id".to_string(),
                    kind: ValueKind::String,
                },
                attributes: Vec::new(),
                relationships: Vec::new(),
            },
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id_field(&self) -> &IdField {
        &self.id_field
    }

    pub fn attributes(&self) -> &[AttributeField] {
        &self.attributes
    }

    pub fn relationships(&self) -> &[RelationshipField] {
        &self.relationships
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeField> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipField> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Whether `name` is an attribute or relationship of this type (the id is not a field).
    pub fn has_field(&self, name: &str) -> bool {
        self.attribute(name).is_some() || self.relationship(name).is_some()
    }

    fn field_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id_field.name.as_str())
            .chain(self.attributes.iter().map(|a| a.name.as_str()))
            .chain(self.relationships.iter().map(|r| r.name.as_str()))
    }
}

/// Fluent builder for [`ResourceDescriptor`].
#[derive(Debug, Clone)]
pub struct ResourceDescriptorBuilder {
    descriptor: ResourceDescriptor,
}

impl ResourceDescriptorBuilder {
    /// Sets the single id field, replacing the default.
    pub fn id(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.descriptor.id_field = IdField {
            name: name.into(),
            kind,
        };
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.descriptor.attributes.push(AttributeField {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn to_one(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, target_type, Cardinality::ToOne, false)
    }

    pub fn to_many(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, target_type, Cardinality::ToMany, false)
    }

    pub fn relationship(
        mut self,
        name: impl Into<String>,
        target_type: impl Into<String>,
        cardinality: Cardinality,
        include_by_default: bool,
    ) -> Self {
        self.descriptor.relationships.push(RelationshipField {
            name: name.into(),
            target_type: target_type.into(),
            cardinality,
            include_by_default,
        });
        self
    }

    pub fn build(self) -> ResourceDescriptor {
        self.descriptor
    }
}

/// What a dotted field path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget<'a> {
    Id(&'a IdField),
    Attribute(&'a AttributeField),
    Relationship(&'a RelationshipField),
}

impl FieldTarget<'_> {
    /// Kind used to convert raw filter values aimed at this field. Relationships compare
    /// against the id of the related resource.
    pub fn value_kind(&self, table: &DescriptorTable) -> ValueKind {
        match self {
            FieldTarget::Id(id) => id.kind,
            FieldTarget::Attribute(attribute) => attribute.kind,
            FieldTarget::Relationship(rel) => table
                .get(&rel.target_type)
                .map(|target| target.id_field.kind)
                .unwrap_or(ValueKind::Any),
        }
    }
}

/// All descriptors of the process, keyed by wire type name and by Rust type.
///
/// Built once through [`DescriptorTable::builder`] and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    by_name: BTreeMap<String, ResourceDescriptor>,
    by_type: HashMap<TypeId, String>,
}

impl DescriptorTable {
    pub fn builder() -> DescriptorTableBuilder {
        DescriptorTableBuilder::default()
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceDescriptor> {
        self.by_name.get(resource_type)
    }

    /// Looks a descriptor up by the runtime entity type.
    pub fn for_type<T: Resource>(&self) -> Option<&ResourceDescriptor> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|name| self.by_name.get(name))
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.by_name.contains_key(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// Resolves a dotted path (`project.name`) starting at `descriptor`. Every segment but the
    /// last must be a relationship; the last may be the id, an attribute or a relationship.
    pub fn resolve_path<'a>(
        &'a self,
        descriptor: &'a ResourceDescriptor,
        segments: &[String],
    ) -> Result<FieldTarget<'a>, QueryError> {
        let unknown = |descriptor: &ResourceDescriptor, field: &str| QueryError::UnknownField {
            resource_type: descriptor.resource_type.clone(),
            field: field.to_string(),
        };

        let (last, init) = segments
            .split_last()
            .ok_or_else(|| QueryError::Malformed("empty field path".to_string()))?;

        let mut current = descriptor;
        for segment in init {
            let rel = current
                .relationship(segment)
                .ok_or_else(|| unknown(current, segment))?;
            current = self
                .get(&rel.target_type)
                .ok_or_else(|| QueryError::UnknownResourceType(rel.target_type.clone()))?;
        }

        if *last == current.id_field.name {
            Ok(FieldTarget::Id(&current.id_field))
        } else if let Some(attribute) = current.attribute(last) {
            Ok(FieldTarget::Attribute(attribute))
        } else if let Some(rel) = current.relationship(last) {
            Ok(FieldTarget::Relationship(rel))
        } else {
            Err(unknown(current, last))
        }
    }

    /// Resolves a relationship path (`project.owner`), every segment being a relationship.
    pub fn resolve_relationship_path<'a>(
        &'a self,
        descriptor: &'a ResourceDescriptor,
        segments: &[String],
    ) -> Result<&'a RelationshipField, QueryError> {
        match self.resolve_path(descriptor, segments)? {
            FieldTarget::Relationship(rel) => Ok(rel),
            _ => Err(QueryError::UnknownField {
                resource_type: descriptor.resource_type.clone(),
                field: segments.join("."),
            }),
        }
    }
}

/// Collects descriptors and validates them as a whole.
#[derive(Debug, Default)]
pub struct DescriptorTableBuilder {
    descriptors: Vec<(Option<TypeId>, ResourceDescriptor)>,
}

impl DescriptorTableBuilder {
    /// Registers the descriptor of a Rust resource type, making it reachable by type too.
    pub fn register<T: Resource>(mut self) -> Self {
        self.descriptors
            .push((Some(TypeId::of::<T>()), T::descriptor()));
        self
    }

    /// Registers a descriptor that has no Rust type behind it.
    pub fn descriptor(mut self, descriptor: ResourceDescriptor) -> Self {
        self.descriptors.push((None, descriptor));
        self
    }

    /// Validates uniqueness of types and fields and that every relationship target exists.
    pub fn build(self) -> Result<DescriptorTable, DescriptorError> {
        let mut table = DescriptorTable::default();

        for (type_id, descriptor) in self.descriptors {
            let mut seen = BTreeSet::new();
            for field in descriptor.field_names() {
                if !seen.insert(field) {
                    return Err(DescriptorError::DuplicateField {
                        resource_type: descriptor.resource_type.clone(),
                        field: field.to_string(),
                    });
                }
            }

            let name = descriptor.resource_type.clone();
            if table.by_name.contains_key(&name) {
                return Err(DescriptorError::DuplicateResourceType(name));
            }
            if let Some(type_id) = type_id {
                table.by_type.insert(type_id, name.clone());
            }
            table.by_name.insert(name, descriptor);
        }

        for descriptor in table.by_name.values() {
            for rel in &descriptor.relationships {
                if !table.by_name.contains_key(&rel.target_type) {
                    return Err(DescriptorError::UnknownTarget {
                        resource_type: descriptor.resource_type.clone(),
                        relationship: rel.name.clone(),
                        target: rel.target_type.clone(),
                    });
                }
            }
        }

        tracing::debug!(types = table.by_name.len(), "Descriptor table built");
        Ok(table)
    }
}
