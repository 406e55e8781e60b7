//! Per-entity-type retrievers.
//!
//! Every entity type is searched the same way: encode the query against
//! that type's vocabulary, ask that type's collection for the top-k
//! matches, and lift the payload fields that type cares about into a
//! [`SearchResult`]. The only thing that varies is the data: vocabulary,
//! collection name and [`FieldSchema`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use refrain_core::{Encoder, EntityType, Field, SearchResult, Vocabulary};
use serde_json::Value;

use crate::config::Config;
use crate::error::{RetrievalError, RetrievalResult, SearchError};
use crate::index::{ScoredPoint, SparseIndex};

/// Something that can answer a query for one entity type.
#[async_trait]
pub trait Retrieve: Send + Sync + fmt::Debug {
    fn entity_type(&self) -> EntityType;

    /// Return at most `top_k` results, best first.
    ///
    /// # Errors
    /// Index failures are returned as-is; isolating them is the caller's job.
    async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<SearchResult>>;
}

/// Which payload fields an entity type's records carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    required: &'static [Field],
    optional: &'static [Field],
}

impl FieldSchema {
    #[must_use]
    pub const fn for_entity(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Track => Self {
                required: &[Field::TrackName, Field::ArtistName],
                optional: &[],
            },
            EntityType::Artist => Self {
                required: &[Field::ArtistName],
                optional: &[],
            },
            EntityType::Album => Self {
                required: &[Field::AlbumName],
                optional: &[],
            },
            EntityType::Playlist => Self {
                required: &[Field::PlaylistName],
                optional: &[],
            },
            EntityType::Combined => Self {
                required: &[],
                optional: &[Field::TrackName, Field::ArtistName, Field::AlbumName],
            },
        }
    }

    /// Convert one index match into a result.
    ///
    /// # Errors
    /// Returns [`RetrievalError::MissingField`] if a required field is
    /// absent or null.
    pub fn extract(&self, point: &ScoredPoint) -> RetrievalResult<SearchResult> {
        let mut result = SearchResult::new(point.score);

        for &field in self.required {
            let value = payload_text(point, field)
                .ok_or(RetrievalError::MissingField { field: field.key() })?;
            result.set_field(field, value);
        }
        for &field in self.optional {
            if let Some(value) = payload_text(point, field) {
                result.set_field(field, value);
            }
        }

        Ok(result)
    }
}

/// Payload value as text. Null and absent are both `None`.
fn payload_text(point: &ScoredPoint, field: Field) -> Option<String> {
    match point.payload_value(field.key())? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A retriever for one entity type.
///
/// Immutable after construction and shared across concurrent requests.
#[derive(Debug)]
pub struct Retriever {
    entity_type: EntityType,
    schema: FieldSchema,
    encoder: Encoder,
    vocabulary: Arc<Vocabulary>,
    collection: String,
    index: Arc<dyn SparseIndex>,
}

impl Retriever {
    pub fn new(
        entity_type: EntityType,
        encoder: Encoder,
        vocabulary: Arc<Vocabulary>,
        collection: impl Into<String>,
        index: Arc<dyn SparseIndex>,
    ) -> Self {
        Self {
            entity_type,
            schema: FieldSchema::for_entity(entity_type),
            encoder,
            vocabulary,
            collection: collection.into(),
            index,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub const fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}

#[async_trait]
impl Retrieve for Retriever {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<SearchResult>> {
        let vector = self.encoder.encode(query, &self.vocabulary);
        if vector.is_empty() {
            log::debug!(
                "No {} vocabulary terms in {:?}; querying with an empty vector",
                self.entity_type,
                query
            );
        }

        let points = self
            .index
            .query_sparse(&self.collection, &vector, top_k)
            .await?;

        points
            .iter()
            .take(top_k)
            .map(|point| self.schema.extract(point))
            .collect()
    }
}

/// The retrievers available to a search, one per entity type.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RetrieverRegistry {
    retrievers: BTreeMap<EntityType, Arc<dyn Retrieve>>,
}

impl RetrieverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `retriever` under its entity type, replacing any previous one.
    #[must_use]
    pub fn with(mut self, retriever: Arc<dyn Retrieve>) -> Self {
        self.retrievers.insert(retriever.entity_type(), retriever);
        self
    }

    /// Build a [`Retriever`] for every configured collection.
    ///
    /// Loads each vocabulary artifact from disk.
    ///
    /// # Errors
    /// Returns an error if the encoder settings are invalid or any
    /// vocabulary cannot be loaded.
    pub fn from_config(config: &Config, index: Arc<dyn SparseIndex>) -> Result<Self, SearchError> {
        let encoder = config.encoder.encoder()?;
        let mut registry = Self::new();

        for (&entity_type, collection) in &config.collections {
            let vocabulary = Arc::new(Vocabulary::load(&collection.vocab_path)?);
            log::info!(
                "Created {} retriever: collection={}, vocabulary={} tokens",
                entity_type,
                collection.collection,
                vocabulary.len()
            );
            registry = registry.with(Arc::new(Retriever::new(
                entity_type,
                encoder,
                vocabulary,
                collection.collection.clone(),
                Arc::clone(&index),
            )));
        }

        Ok(registry)
    }

    #[must_use]
    pub fn get(&self, entity_type: EntityType) -> Option<&Arc<dyn Retrieve>> {
        self.retrievers.get(&entity_type)
    }

    #[must_use]
    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.retrievers.contains_key(&entity_type)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.retrievers.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.retrievers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retrievers.is_empty()
    }
}
