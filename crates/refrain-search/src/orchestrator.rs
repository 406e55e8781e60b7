//! The search entry point.
//!
//! Steps:
//! 1. Validate the request and pick the entity types to search
//! 2. Fan out to their retrievers concurrently
//! 3. Rank entity types by how clearly their top hit stands out
//! 4. Return the ranking together with the raw per-type results

use std::sync::Arc;

use refrain_core::EntityType;
use serde::Serialize;

use crate::combine::{combine, TaggedResult};
use crate::config::{Config, SearchSettings};
use crate::error::SearchError;
use crate::fanout::FanOut;
use crate::index::QdrantClient;
use crate::intent::{rank, IntentRanking};
use crate::result_set::ResultSet;
use crate::retriever::RetrieverRegistry;

/// Everything one search produced.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub predicted_intent: EntityType,
    #[serde(rename = "ranked_intents")]
    pub intent: IntentRanking,
    pub raw_results: ResultSet,
    /// Entity types that were dispatched, in request order.
    pub entity_types_used: Vec<EntityType>,
    /// Entity types whose retrieval failed or timed out.
    pub failed: Vec<EntityType>,
}

/// Composes fan-out, intent ranking and merging behind one `search` call.
///
/// Holds only immutable state; share it behind an `Arc` for the lifetime
/// of the process.
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    fan_out: FanOut,
    default_top_k: usize,
}

impl SearchOrchestrator {
    pub fn new(registry: RetrieverRegistry, settings: SearchSettings) -> Self {
        Self {
            fan_out: FanOut::new(registry, settings.task_timeout()),
            default_top_k: settings.top_k,
        }
    }

    /// Build the index client and every configured retriever.
    ///
    /// # Errors
    /// Returns an error if the encoder settings are invalid, a vocabulary
    /// cannot be loaded, or the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let index = QdrantClient::new(&config.index).map_err(SearchError::Client)?;
        let registry = RetrieverRegistry::from_config(config, Arc::new(index))?;
        log::info!(
            "Search orchestrator ready with {} retrievers",
            registry.len()
        );
        Ok(Self::new(registry, config.search))
    }

    pub fn registry(&self) -> &RetrieverRegistry {
        self.fan_out.registry()
    }

    pub const fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Parse entity-type tags from a request.
    ///
    /// Unknown tags are skipped with a warning.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidRequest`] if no tag is known.
    pub fn parse_entity_types<S: AsRef<str>>(tags: &[S]) -> Result<Vec<EntityType>, SearchError> {
        let mut parsed = Vec::with_capacity(tags.len());
        for tag in tags {
            match tag.as_ref().parse::<EntityType>() {
                Ok(ty) if !parsed.contains(&ty) => parsed.push(ty),
                Ok(_) => {}
                Err(e) => log::warn!("Ignoring search type: {}", e),
            }
        }

        if parsed.is_empty() {
            let requested: Vec<&str> = tags.iter().map(|tag| tag.as_ref()).collect();
            return Err(SearchError::InvalidRequest(format!(
                "none of the requested search types {requested:?} is known"
            )));
        }
        Ok(parsed)
    }

    /// Validate a request and return the entity types to dispatch.
    fn plan(
        &self,
        entity_types: Option<&[EntityType]>,
        top_k: usize,
    ) -> Result<Vec<EntityType>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }

        let requested = entity_types.unwrap_or(EntityType::ALL.as_slice());
        let dispatchable = self.fan_out.dispatchable(requested);
        if dispatchable.is_empty() {
            return Err(SearchError::InvalidRequest(format!(
                "no retriever is configured for any of {requested:?}"
            )));
        }
        Ok(dispatchable)
    }

    /// Search `entity_types` (all of them if `None`) and rank intent.
    ///
    /// Backend failures never surface as errors: a failed entity type is
    /// missing from `raw_results` and listed in `failed`, and a total
    /// outage yields an empty result set with the fallback intent.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidRequest`] if `top_k` is zero or none of
    /// the requested entity types has a retriever.
    pub async fn search(
        &self,
        query: &str,
        entity_types: Option<&[EntityType]>,
        top_k: usize,
    ) -> Result<SearchResponse, SearchError> {
        let entity_types_used = self.plan(entity_types, top_k)?;
        log::info!(
            "Searching {:?} across {:?} (top_k={})",
            query,
            entity_types_used,
            top_k
        );

        let raw_results = self.fan_out.dispatch(query, &entity_types_used, top_k).await;
        let intent = rank(&raw_results);
        let predicted_intent = intent.predicted();
        log::info!("Predicted intent for {:?}: {}", query, predicted_intent);

        Ok(SearchResponse {
            query: query.to_string(),
            predicted_intent,
            intent,
            failed: raw_results.failed().to_vec(),
            raw_results,
            entity_types_used,
        })
    }

    /// Search `entity_types` and merge everything into one deduplicated
    /// list of at most `top_k` results.
    ///
    /// # Errors
    /// Same as [`SearchOrchestrator::search`].
    pub async fn search_merged(
        &self,
        query: &str,
        entity_types: Option<&[EntityType]>,
        top_k: usize,
    ) -> Result<Vec<TaggedResult>, SearchError> {
        let entity_types_used = self.plan(entity_types, top_k)?;
        let raw_results = self.fan_out.dispatch(query, &entity_types_used, top_k).await;
        Ok(combine(&raw_results, top_k))
    }
}
