use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A sparse query vector: vocabulary ids paired with term counts.
///
/// `indices` and `values` always have the same length and indices are
/// strictly ascending. Both hold for every way of building one, including
/// deserialization, so two encodings of the same query compare equal and
/// serialise identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SparseParts")]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct SparseParts {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl TryFrom<SparseParts> for SparseVector {
    type Error = Error;

    fn try_from(parts: SparseParts) -> Result<Self> {
        Self::new(parts.indices, parts.values)
    }
}

impl SparseVector {
    /// Pair up `indices` and `values`.
    ///
    /// # Errors
    /// Returns [`Error::SparseVector`] if the lengths differ or the indices
    /// are not strictly ascending.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::SparseVector(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if let Some(pair) = indices.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(Error::SparseVector(format!(
                "indices must be strictly ascending, found {} before {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { indices, values })
    }

    /// Build a vector from `(index, value)` pairs already sorted by index.
    pub(crate) fn from_sorted_pairs(pairs: impl IntoIterator<Item = (u32, f32)>) -> Self {
        let (indices, values) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate `(index, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// The value stored for `index`, if any.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<f32> {
        self.indices
            .binary_search(&index)
            .ok()
            .and_then(|pos| self.values.get(pos).copied())
    }
}
