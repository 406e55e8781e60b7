pub mod entity;
pub mod record;
pub mod sparse;

pub use entity::EntityType;
pub use record::{Field, SearchResult};
pub use sparse::SparseVector;
