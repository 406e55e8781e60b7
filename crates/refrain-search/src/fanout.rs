//! Concurrent fan-out to the per-entity-type retrievers.
//!
//! One task per requested entity type, all joined before returning. A
//! retriever that errors, times out or panics simply has no entry in the
//! returned [`ResultSet`]; the others are unaffected. Dropping the
//! `dispatch` future aborts any retrievals still in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use refrain_core::{EntityType, SearchResult};
use tokio::task::JoinSet;

use crate::error::RetrievalError;
use crate::result_set::ResultSet;
use crate::retriever::RetrieverRegistry;

/// Dispatches one query to many retrievers at once.
#[derive(Debug, Clone)]
pub struct FanOut {
    registry: Arc<RetrieverRegistry>,
    task_timeout: Duration,
}

impl FanOut {
    /// Create an executor over `registry`. Each retrieval gets at most
    /// `task_timeout` before it is abandoned.
    pub fn new(registry: RetrieverRegistry, task_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(registry),
            task_timeout,
        }
    }

    pub fn registry(&self) -> &RetrieverRegistry {
        &self.registry
    }

    /// The requested entity types that have a retriever, deduplicated, in
    /// request order.
    pub fn dispatchable(&self, entity_types: &[EntityType]) -> Vec<EntityType> {
        let mut selected = Vec::with_capacity(entity_types.len());
        for &ty in entity_types {
            if selected.contains(&ty) {
                continue;
            }
            if self.registry.contains(ty) {
                selected.push(ty);
            } else {
                log::debug!("No retriever registered for {}, skipping", ty);
            }
        }
        selected
    }

    /// Query every requested entity type that has a retriever.
    ///
    /// Never fails: unknown entity types are skipped and failed retrievals
    /// are logged and left out. Entries appear in request order regardless
    /// of completion order.
    pub async fn dispatch(
        &self,
        query: &str,
        entity_types: &[EntityType],
        top_k: usize,
    ) -> ResultSet {
        let started = Instant::now();
        let dispatched = self.dispatchable(entity_types);
        let query: Arc<str> = Arc::from(query);

        let mut tasks = JoinSet::new();
        for &entity_type in &dispatched {
            let Some(retriever) = self.registry.get(entity_type) else {
                continue;
            };
            let retriever = Arc::clone(retriever);
            let query = Arc::clone(&query);
            let timeout = self.task_timeout;

            tasks.spawn(async move {
                let started = Instant::now();
                log::info!(
                    "Retrieving results for {} with query: {:?}",
                    entity_type,
                    query
                );
                let outcome = tokio::time::timeout(timeout, retriever.search(&query, top_k))
                    .await
                    .unwrap_or_else(|_| {
                        Err(RetrievalError::Timeout {
                            entity_type,
                            after: timeout,
                        })
                    });
                (entity_type, outcome, started.elapsed())
            });
        }

        let mut slots: Vec<Option<Vec<SearchResult>>> = vec![None; dispatched.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((entity_type, Ok(results), elapsed)) => {
                    log::info!(
                        "Retrieved {} {} results in {:.3} seconds",
                        results.len(),
                        entity_type,
                        elapsed.as_secs_f64()
                    );
                    if let Some(pos) = dispatched.iter().position(|ty| *ty == entity_type) {
                        slots[pos] = Some(results);
                    }
                }
                Ok((entity_type, Err(e), elapsed)) => {
                    log::error!(
                        "Error in {} search after {:.3} seconds: {}",
                        entity_type,
                        elapsed.as_secs_f64(),
                        e
                    );
                }
                Err(e) => {
                    log::error!("Retrieval task did not complete: {}", e);
                }
            }
        }

        let mut results = ResultSet::new();
        for (entity_type, slot) in dispatched.into_iter().zip(slots) {
            match slot {
                Some(hits) => results.insert(entity_type, hits),
                None => results.mark_failed(entity_type),
            }
        }

        log::info!(
            "Total search time: {:.3} seconds",
            started.elapsed().as_secs_f64()
        );
        results
    }
}
