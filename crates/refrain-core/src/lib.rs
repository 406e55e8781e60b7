//! Core data model for refrain.
//!
//! This crate defines the entity types and search records shared by every
//! retriever, the read-only token vocabularies built offline for each
//! entity type, and the character n-gram encoder that turns a raw query
//! into a sparse term-frequency vector.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod encode;
pub mod error;
pub mod model;
pub mod vocab;

pub use encode::{encode, Encoder, NgramRange, Normalization};
pub use error::{Error, Result};
pub use model::{EntityType, Field, SearchResult, SparseVector};
pub use vocab::Vocabulary;
