//! # Response Assembly
//!
//! The [`ResponseAssembler`] turns whatever a repository returned into an [`Envelope`]: the
//! payload plus optional top-level links and meta.
//!
//! Which of links and meta get computed depends only on the [`Capabilities`] recorded in the
//! [`RepositoryEntry`] at registration time. A capability the repository does not have
//! yields `None`, never an empty structure.

use crate::error::Result;
use crate::query::{QueryParams, QuerySpec, QueryTranslator};
use crate::repository::{Capabilities, RepositoryEntry};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Primary payload of a response: one (possibly absent) entity or a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Single(Option<T>),
    Collection(Vec<T>),
}

impl<T> Payload<T> {
    /// Slice view over the payload, whatever its shape.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Payload::Single(Some(entity)) => std::slice::from_ref(entity),
            Payload::Single(None) => &[],
            Payload::Collection(items) => items,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Payload::Collection(_))
    }

    /// The single entity; a collection yields its first element.
    pub fn into_single(self) -> Option<T> {
        match self {
            Payload::Single(entity) => entity,
            Payload::Collection(items) => items.into_iter().next(),
        }
    }

    pub fn into_collection(self) -> Vec<T> {
        match self {
            Payload::Single(entity) => entity.into_iter().collect(),
            Payload::Collection(items) => items,
        }
    }
}

/// Top-level links of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinksInformation {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

/// Top-level meta of a document: free-form JSON members.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaInformation(pub Map<String, Value>);

impl MetaInformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// A payload together with the top-level links and meta that go with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub payload: Payload<T>,
    pub links: Option<LinksInformation>,
    pub meta: Option<MetaInformation>,
}

impl<T> Envelope<T> {
    pub fn new(payload: Payload<T>) -> Self {
        Self {
            payload,
            links: None,
            meta: None,
        }
    }

    pub fn single(entity: T) -> Self {
        Self::new(Payload::Single(Some(entity)))
    }

    pub fn collection(items: Vec<T>) -> Self {
        Self::new(Payload::Collection(items))
    }

    pub fn with_links(mut self, links: LinksInformation) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_meta(mut self, meta: MetaInformation) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// What a repository call produced, before assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult<T> {
    Single(T),
    Collection(Vec<T>),
    /// Already assembled; passed through untouched.
    Envelope(Envelope<T>),
}

/// Builds envelopes according to each repository's capability set.
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    translator: Arc<QueryTranslator>,
}

impl ResponseAssembler {
    pub fn new(translator: Arc<QueryTranslator>) -> Self {
        Self { translator }
    }

    /// Wraps `raw` in an envelope, asking the entry's meta and links capabilities (if any)
    /// for their parts. The payload keeps its single or collection shape.
    pub fn assemble<T: Resource>(
        &self,
        entry: &RepositoryEntry<T>,
        raw: RawResult<T>,
        query: Option<&QuerySpec>,
    ) -> Result<Envelope<T>> {
        let payload = match raw {
            RawResult::Envelope(envelope) => return Ok(envelope),
            RawResult::Single(entity) => Payload::Single(Some(entity)),
            RawResult::Collection(items) => Payload::Collection(items),
        };

        let capabilities = entry.capabilities();
        debug!(
            resource_type = T::RESOURCE_TYPE,
            meta = capabilities.meta,
            links = capabilities.links,
            "Assembling response"
        );
        if capabilities == Capabilities::default() {
            return Ok(Envelope::new(payload));
        }

        let params = query.and_then(|spec| self.legacy_params(spec));
        let resources = payload.as_slice();

        let meta = match entry.meta() {
            Some(repository) => Some(repository.meta_information(resources, params.as_ref())?),
            None => None,
        };
        let links = match entry.links() {
            Some(repository) => Some(repository.links_information(resources, params.as_ref())?),
            None => None,
        };

        Ok(Envelope {
            payload,
            links,
            meta,
        })
    }

    /// Meta and links capabilities read the query in its flat encoding. Queries the flat
    /// encoding cannot carry are handed over as absent.
    fn legacy_params(&self, spec: &QuerySpec) -> Option<QueryParams> {
        match self.translator.to_params(spec) {
            Ok(params) => Some(params),
            Err(e) => {
                warn!(resource_type = spec.resource_type(), error = %e, "Query not passed to capabilities");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorTable, ResourceDescriptor, ValueKind};
    use crate::error::BridgeError;
    use crate::operator::FilterOperatorRegistry;
    use crate::repository::{LinksRepository, MetaRepository, ResourceRepository};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Option<u64>,
        #[serde(default)]
        text: String,
    }

    impl Resource for Note {
        type Id = u64;
        const RESOURCE_TYPE: &'static str = "notes";

        fn descriptor() -> ResourceDescriptor {
            ResourceDescriptor::builder(Self::RESOURCE_TYPE)
                .id("id", ValueKind::Integer)
                .attribute("text", ValueKind::String)
                .build()
        }
        fn id(&self) -> Option<&u64> {
            self.id.as_ref()
        }
        fn set_id(&mut self, id: u64) {
            self.id = Some(id);
        }
    }

    /// Records what its capabilities were asked.
    #[derive(Default)]
    struct Probe {
        seen: Mutex<Vec<(usize, Option<String>)>>,
    }

    impl ResourceRepository<Note> for Probe {
        fn find_one(&self, id: &u64, _: Option<&QuerySpec>) -> Result<Note> {
            Err(BridgeError::not_found("notes", id))
        }
        fn find_all(&self, _: Option<&QuerySpec>) -> Result<Vec<Note>> {
            Ok(Vec::new())
        }
        fn find_all_by_ids(&self, _: &[u64], _: Option<&QuerySpec>) -> Result<Vec<Note>> {
            Ok(Vec::new())
        }
        fn save(&self, entity: Note) -> Result<Note> {
            Ok(entity)
        }
        fn delete(&self, _: &u64) -> Result<()> {
            Ok(())
        }
    }

    impl MetaRepository<Note> for Probe {
        fn meta_information(
            &self,
            resources: &[Note],
            params: Option<&QueryParams>,
        ) -> Result<MetaInformation> {
            self.seen
                .lock()
                .unwrap()
                .push((resources.len(), params.map(QueryParams::to_query_string)));
            Ok(MetaInformation::new().with("count", resources.len()))
        }
    }

    impl LinksRepository<Note> for Probe {
        fn links_information(&self, _: &[Note], _: Option<&QueryParams>) -> Result<LinksInformation> {
            Ok(LinksInformation {
                self_link: Some("/notes".into()),
                ..Default::default()
            })
        }
    }

    fn assembler() -> ResponseAssembler {
        let table = DescriptorTable::builder().register::<Note>().build().unwrap();
        ResponseAssembler::new(Arc::new(QueryTranslator::new(
            Arc::new(table),
            Arc::new(FilterOperatorRegistry::with_defaults()),
        )))
    }

    fn note(id: u64) -> Note {
        Note {
            id: Some(id),
            text: format!("note {id}"),
        }
    }

    #[test]
    fn test_capability_less_repository_gets_no_meta_or_links() {
        let entry = RepositoryEntry::new(Arc::new(Probe::default()));
        let envelope = assembler()
            .assemble(&entry, RawResult::Single(note(1)), None)
            .unwrap();

        assert_eq!(envelope.payload, Payload::Single(Some(note(1))));
        assert!(envelope.meta.is_none());
        assert!(envelope.links.is_none());
    }

    #[test]
    fn test_every_capability_combination() {
        let assembler = assembler();
        let probe = Arc::new(Probe::default());
        let entries = [
            (RepositoryEntry::new(probe.clone()), false, false),
            (RepositoryEntry::new(probe.clone()).with_meta(probe.clone()), true, false),
            (RepositoryEntry::new(probe.clone()).with_links(probe.clone()), false, true),
            (RepositoryEntry::full(probe.clone()), true, true),
        ];

        for (entry, meta, links) in entries {
            let envelope = assembler
                .assemble(&entry, RawResult::Collection(vec![note(1), note(2)]), None)
                .unwrap();
            assert_eq!(envelope.meta.is_some(), meta);
            assert_eq!(envelope.links.is_some(), links);
            assert!(envelope.payload.is_collection());
        }
    }

    #[test]
    fn test_meta_receives_view_and_flat_query() {
        let probe = Arc::new(Probe::default());
        let entry = RepositoryEntry::new(probe.clone()).with_meta(probe.clone());
        let query = QuerySpec::new("notes").limit(2);

        let envelope = assembler()
            .assemble(&entry, RawResult::Single(note(7)), Some(&query))
            .unwrap();

        assert_eq!(envelope.meta.unwrap().get("count"), Some(&json!(1)));
        assert_eq!(
            probe.seen.lock().unwrap().as_slice(),
            &[(1, Some("page[limit]=2".to_string()))]
        );
    }

    #[test]
    fn test_envelope_passes_through_unchanged() {
        let probe = Arc::new(Probe::default());
        let entry = RepositoryEntry::full(probe);
        let prepared = Envelope::collection(vec![note(1)])
            .with_meta(MetaInformation::new().with("source", "cache"));

        let envelope = assembler()
            .assemble(&entry, RawResult::Envelope(prepared.clone()), None)
            .unwrap();
        assert_eq!(envelope, prepared);
    }

    #[test]
    fn test_payload_views() {
        let single = Payload::Single(Some(1));
        assert_eq!(single.as_slice(), &[1]);
        assert!(Payload::<u8>::Single(None).as_slice().is_empty());
        assert_eq!(Payload::Collection(vec![1, 2]).into_single(), Some(1));
        assert_eq!(Payload::Single(Some(3)).into_collection(), vec![3]);
    }
}
