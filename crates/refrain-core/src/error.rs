use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The encoder configuration cannot produce tokens (e.g. an empty or
    /// inverted n-gram range).
    #[error("encoding configuration error: {0}")]
    Encoding(String),

    /// A vocabulary artifact could not be read or parsed.
    #[error("vocabulary error in {}: {message}", path.display())]
    Vocabulary { path: PathBuf, message: String },

    /// Sparse vector parts that do not line up.
    #[error("invalid sparse vector: {0}")]
    SparseVector(String),

    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
