//! # Document Mapper
//!
//! Converts between typed entities and wire [`Document`]s using nothing but the
//! [`DescriptorTable`] and serde.
//!
//! # Server side
//! [`DocumentMapper::to_document`] renders an [`Envelope`]: one resource object per entity,
//! attributes filtered by the query's sparse fieldsets, relationship linkage for every
//! relationship the entity carries, and an `included` section built from the query's include
//! paths plus the relationships flagged include-by-default. Only related entities that are
//! actually loaded can be included; an included resource appears once, and never when it is
//! already primary data.
//!
//! # Client side
//! [`DocumentMapper::to_entity`] resolves linkage against `included` (and primary data), so
//! graphs come back as nested [`Relation::Loaded`](crate::Relation::Loaded) values. A link to
//! a resource the document does not carry becomes a reference holding only the id. Cycles
//! are cut the same way.

use crate::descriptor::{Cardinality, DescriptorTable, ResourceDescriptor};
use crate::document::{
    Document, PrimaryData, Relationship, RelationshipData, ResourceIdentifier, ResourceObject,
};
use crate::error::DocumentError;
use crate::query::{PathSpec, QuerySpec};
use crate::resource::Resource;
use crate::response::{Envelope, Payload};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

type Key = (String, String);

#[derive(Debug, Clone)]
pub struct DocumentMapper {
    descriptors: Arc<DescriptorTable>,
}

impl DocumentMapper {
    pub fn new(descriptors: Arc<DescriptorTable>) -> Self {
        Self { descriptors }
    }

    fn descriptor(&self, resource_type: &str) -> Result<&ResourceDescriptor, DocumentError> {
        self.descriptors
            .get(resource_type)
            .ok_or_else(|| DocumentError::UnknownResourceType(resource_type.to_string()))
    }

    // --- entity -> document ---

    /// Renders an envelope as a response document.
    pub fn to_document<T: Resource>(
        &self,
        envelope: &Envelope<T>,
        query: Option<&QuerySpec>,
    ) -> Result<Document, DocumentError> {
        let descriptor = self.descriptor(T::RESOURCE_TYPE)?;
        let entities = envelope
            .payload
            .as_slice()
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()?;

        let mut primary = Vec::with_capacity(entities.len());
        for json in &entities {
            primary.push(self.resource_object(descriptor, json, query)?);
        }

        let mut paths: BTreeSet<PathSpec> = query
            .map(|q| q.includes().iter().cloned().collect())
            .unwrap_or_default();
        paths.extend(
            descriptor
                .relationships()
                .iter()
                .filter(|rel| rel.include_by_default)
                .map(|rel| PathSpec::new(vec![rel.name.clone()])),
        );

        let mut seen: HashSet<Key> = primary.iter().filter_map(key_of).collect();
        let mut included = Vec::new();
        for json in &entities {
            for path in &paths {
                self.include(descriptor, json, path.segments(), query, &mut seen, &mut included)?;
            }
        }

        let data = match &envelope.payload {
            Payload::Single(_) => PrimaryData::Single(primary.into_iter().next()),
            Payload::Collection(_) => PrimaryData::Collection(primary),
        };
        Ok(Document {
            data: Some(data),
            included,
            links: envelope.links.clone(),
            meta: envelope.meta.clone(),
            errors: Vec::new(),
        })
    }

    /// Renders one entity as the body of a create or update request.
    pub fn to_request_document<T: Resource>(&self, entity: &T) -> Result<Document, DocumentError> {
        let descriptor = self.descriptor(T::RESOURCE_TYPE)?;
        let json = to_json(entity)?;
        let resource = self.resource_object(descriptor, &json, None)?;
        Ok(Document::single(Some(resource)))
    }

    fn resource_object(
        &self,
        descriptor: &ResourceDescriptor,
        json: &Value,
        query: Option<&QuerySpec>,
    ) -> Result<ResourceObject, DocumentError> {
        let object = json.as_object().ok_or_else(|| {
            DocumentError::Serialization(format!(
                "{} entity did not serialize to an object",
                descriptor.resource_type()
            ))
        })?;
        let fields = query.and_then(|q| q.fields_for(descriptor.resource_type()));
        let wanted = |name: &str| fields.map_or(true, |set| set.contains(name));

        let id = object.get(&descriptor.id_field().name).and_then(id_string);
        let mut resource = ResourceObject::new(descriptor.resource_type(), id);

        for attribute in descriptor.attributes() {
            if !wanted(&attribute.name) {
                continue;
            }
            if let Some(value) = object.get(&attribute.name) {
                resource
                    .attributes
                    .insert(attribute.name.clone(), value.clone());
            }
        }

        for rel in descriptor.relationships() {
            if !wanted(&rel.name) {
                continue;
            }
            let Some(value) = object.get(&rel.name) else {
                continue;
            };
            let target = self.descriptor(&rel.target_type)?;
            let data = match rel.cardinality {
                Cardinality::ToOne => RelationshipData::ToOne(identifier(target, value)),
                Cardinality::ToMany => RelationshipData::ToMany(match value {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|item| identifier(target, item))
                        .collect(),
                    _ => Vec::new(),
                }),
            };
            resource
                .relationships
                .insert(rel.name.clone(), Relationship { data });
        }

        Ok(resource)
    }

    /// Follows one include path from `json`, collecting every loaded resource on the way.
    fn include(
        &self,
        descriptor: &ResourceDescriptor,
        json: &Value,
        segments: &[String],
        query: Option<&QuerySpec>,
        seen: &mut HashSet<Key>,
        included: &mut Vec<ResourceObject>,
    ) -> Result<(), DocumentError> {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(());
        };
        let Some(rel) = descriptor.relationship(head) else {
            tracing::debug!(
                resource_type = descriptor.resource_type(),
                relationship = %head,
                "Skipping unknown include path"
            );
            return Ok(());
        };
        let target = self.descriptor(&rel.target_type)?;

        let related: Vec<&Value> = match json.get(head.as_str()) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value @ Value::Object(_)) => vec![value],
            _ => Vec::new(),
        };

        for value in related {
            if !is_loaded(target, value) {
                continue;
            }
            let resource = self.resource_object(target, value, query)?;
            if let Some(key) = key_of(&resource) {
                if seen.insert(key) {
                    included.push(resource);
                }
            }
            self.include(target, value, rest, query, seen, included)?;
        }
        Ok(())
    }

    // --- document -> entity ---

    /// Maps the primary data of a document back to entities of type `T`.
    pub fn to_entity<T: Resource>(&self, document: &Document) -> Result<Payload<T>, DocumentError> {
        let data = document.data.as_ref().ok_or(DocumentError::MissingData)?;

        let index: HashMap<Key, &ResourceObject> = document
            .primary()
            .iter()
            .chain(document.included.iter())
            .filter_map(|resource| key_of(resource).map(|key| (key, resource)))
            .collect();

        let convert = |resource: &ResourceObject| -> Result<T, DocumentError> {
            if resource.resource_type != T::RESOURCE_TYPE {
                return Err(DocumentError::TypeMismatch {
                    expected: T::RESOURCE_TYPE.to_string(),
                    found: resource.resource_type.clone(),
                });
            }
            let mut visiting = HashSet::new();
            visiting.extend(key_of(resource));
            let value = self.rebuild(resource, &index, &mut visiting)?;
            serde_json::from_value(value).map_err(|e| DocumentError::Serialization(e.to_string()))
        };

        match data {
            PrimaryData::Single(None) => Ok(Payload::Single(None)),
            PrimaryData::Single(Some(resource)) => Ok(Payload::Single(Some(convert(resource)?))),
            PrimaryData::Collection(resources) => resources
                .iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()
                .map(Payload::Collection),
        }
    }

    /// The single entity of a document; `None` for `"data": null`.
    pub fn to_single<T: Resource>(&self, document: &Document) -> Result<Option<T>, DocumentError> {
        match self.to_entity(document)? {
            Payload::Single(entity) => Ok(entity),
            Payload::Collection(_) => Err(DocumentError::UnexpectedShape { expected: "single" }),
        }
    }

    /// The entities of a document. A single resource counts as a collection of one.
    pub fn to_collection<T: Resource>(&self, document: &Document) -> Result<Vec<T>, DocumentError> {
        Ok(self.to_entity(document)?.into_collection())
    }

    /// Rebuilds the JSON form of an entity from its resource object.
    fn rebuild(
        &self,
        resource: &ResourceObject,
        index: &HashMap<Key, &ResourceObject>,
        visiting: &mut HashSet<Key>,
    ) -> Result<Value, DocumentError> {
        let descriptor = self.descriptor(&resource.resource_type)?;
        let mut object = Map::new();

        if let Some(id) = &resource.id {
            object.insert(descriptor.id_field().name.clone(), typed_id(descriptor, id));
        }
        for (name, value) in &resource.attributes {
            object.insert(name.clone(), value.clone());
        }
        for (name, relationship) in &resource.relationships {
            let value = match &relationship.data {
                RelationshipData::ToOne(None) => Value::Null,
                RelationshipData::ToOne(Some(linked)) => self.link(linked, index, visiting)?,
                RelationshipData::ToMany(linked) => Value::Array(
                    linked
                        .iter()
                        .map(|l| self.link(l, index, visiting))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };
            object.insert(name.clone(), value);
        }

        Ok(Value::Object(object))
    }

    fn link(
        &self,
        linked: &ResourceIdentifier,
        index: &HashMap<Key, &ResourceObject>,
        visiting: &mut HashSet<Key>,
    ) -> Result<Value, DocumentError> {
        let key = (linked.resource_type.clone(), linked.id.clone());
        match index.get(&key) {
            Some(resource) if !visiting.contains(&key) => {
                visiting.insert(key.clone());
                let value = self.rebuild(resource, index, visiting);
                visiting.remove(&key);
                value
            }
            _ => {
                let id = match self.descriptors.get(&linked.resource_type) {
                    Some(descriptor) => typed_id(descriptor, &linked.id),
                    None => Value::String(linked.id.clone()),
                };
                // Serde form of `Reference`, whatever the target calls its id.
                let mut reference = Map::new();
                reference.insert("id".to_string(), id);
                Ok(Value::Object(reference))
            }
        }
    }
}

fn to_json<T: Resource>(entity: &T) -> Result<Value, DocumentError> {
    serde_json::to_value(entity).map_err(|e| DocumentError::Serialization(e.to_string()))
}

fn key_of(resource: &ResourceObject) -> Option<Key> {
    resource
        .id
        .as_ref()
        .map(|id| (resource.resource_type.clone(), id.clone()))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn typed_id(descriptor: &ResourceDescriptor, raw: &str) -> Value {
    descriptor
        .id_field()
        .kind
        .parse_id(raw)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Linkage for a related value: a loaded object or a reference carries its id; a bare
/// scalar is the id itself.
fn identifier(target: &ResourceDescriptor, value: &Value) -> Option<ResourceIdentifier> {
    let id = match value {
        Value::Object(object) => object
            .get(&target.id_field().name)
            .or_else(|| object.get("id"))
            .and_then(id_string),
        Value::Array(_) => None,
        scalar => id_string(scalar),
    }?;
    Some(ResourceIdentifier::new(target.resource_type(), id))
}

/// A related object is loaded when it carries more than its id.
fn is_loaded(target: &ResourceDescriptor, value: &Value) -> bool {
    let id_name = target.id_field().name.as_str();
    value
        .as_object()
        .is_some_and(|object| object.keys().any(|k| k != id_name && k != "id"))
}
