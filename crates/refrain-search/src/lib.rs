//! Retrieval and ranking for refrain.
//!
//! A query is encoded against each entity type's vocabulary, sent to that
//! type's sparse-vector collection, and the per-type result lists are then
//! compared to estimate which kind of entity the user was looking for.
//!
//! - [`index`]: the sparse-vector index service client
//! - [`retriever`]: one configurable retriever per entity type
//! - [`fanout`]: concurrent dispatch with per-retriever failure isolation
//! - [`intent`]: confidence ranking of entity types
//! - [`combine`]: deduplicated merge of all result lists
//! - [`orchestrator`]: the `search` entry point

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod combine;
pub mod config;
pub mod error;
pub mod fanout;
pub mod index;
pub mod intent;
pub mod orchestrator;
pub mod resilience;
pub mod result_set;
pub mod retriever;
pub mod router;

pub use combine::{combine, TaggedResult};
pub use config::Config;
pub use error::{RetrievalError, RetrievalResult, SearchError};
pub use fanout::FanOut;
pub use index::{QdrantClient, ScoredPoint, SparseIndex};
pub use intent::{rank, IntentRanking, IntentScore};
pub use orchestrator::{SearchOrchestrator, SearchResponse};
pub use result_set::ResultSet;
pub use retriever::{FieldSchema, Retrieve, Retriever, RetrieverRegistry};
pub use router::suggest_search_types;
