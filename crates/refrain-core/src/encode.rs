//! Character n-gram encoding of free-text queries.
//!
//! The offline corpus builder tokenized every indexed name into all of its
//! contiguous character windows of length `n` for each `n` in a half-open
//! range, counted them, and assigned each distinct window a dimension. The
//! query side has to reproduce that tokenization exactly, including its
//! (lack of) case folding, or queries silently stop matching anything.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::SparseVector;
use crate::vocab::Vocabulary;

/// Half-open range `[min, max)` of n-gram sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(usize, usize)", into = "(usize, usize)")]
pub struct NgramRange {
    min: usize,
    max: usize,
}

impl NgramRange {
    /// Create a range of n-gram sizes `min..max`.
    ///
    /// # Errors
    /// Returns [`Error::Encoding`] if `min` is zero or the range is empty.
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 {
            return Err(Error::Encoding(
                "n-gram sizes must be at least 1".to_string(),
            ));
        }
        if max <= min {
            return Err(Error::Encoding(format!(
                "n-gram range [{min}, {max}) is empty"
            )));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(self) -> usize {
        self.min
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn max(self) -> usize {
        self.max
    }

    #[must_use]
    pub fn sizes(self) -> Range<usize> {
        self.min..self.max
    }
}

impl TryFrom<(usize, usize)> for NgramRange {
    type Error = Error;

    fn try_from((min, max): (usize, usize)) -> Result<Self> {
        Self::new(min, max)
    }
}

impl From<NgramRange> for (usize, usize) {
    fn from(range: NgramRange) -> Self {
        (range.min, range.max)
    }
}

/// Text normalization applied before tokenizing.
///
/// Must mirror whatever the offline vocabulary builder did. The default
/// leaves queries untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalization {
    #[serde(default)]
    pub lowercase: bool,
    #[serde(default)]
    pub trim: bool,
}

impl Normalization {
    #[must_use]
    pub fn apply<'a>(&self, query: &'a str) -> Cow<'a, str> {
        let query = if self.trim { query.trim() } else { query };
        if self.lowercase {
            Cow::Owned(query.to_lowercase())
        } else {
            Cow::Borrowed(query)
        }
    }
}

/// Iterate every n-gram of `text` for each size in `range`.
///
/// Windows slide one character (Unicode scalar value) at a time. Repeated
/// windows are yielded once per occurrence.
pub fn ngrams(text: &str, range: NgramRange) -> impl Iterator<Item = &str> + '_ {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = bounds.len() - 1;

    range.sizes().flat_map(move |n| {
        let windows = (chars + 1).saturating_sub(n);
        let bounds = bounds.clone();
        (0..windows).map(move |start| &text[bounds[start]..bounds[start + n]])
    })
}

/// Encode `query` into a sparse term-frequency vector over `vocabulary`.
///
/// N-grams the vocabulary does not know are dropped. An empty query, or
/// one shorter than the smallest n-gram size, encodes to an empty vector.
#[must_use]
pub fn encode(query: &str, range: NgramRange, vocabulary: &Vocabulary) -> SparseVector {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for token in ngrams(query, range) {
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut by_index: BTreeMap<u32, f32> = BTreeMap::new();
    for (token, count) in counts {
        if let Some(index) = vocabulary.get(token) {
            *by_index.entry(index).or_insert(0.0) += count as f32;
        }
    }

    SparseVector::from_sorted_pairs(by_index)
}

/// How much of a query's n-gram stream a vocabulary recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub total: usize,
    pub matched: usize,
}

impl Coverage {
    #[must_use]
    pub const fn out_of_vocabulary(&self) -> usize {
        self.total - self.matched
    }
}

/// An n-gram range plus the normalization applied ahead of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    range: NgramRange,
    normalization: Normalization,
}

impl Encoder {
    #[must_use]
    pub const fn new(range: NgramRange, normalization: Normalization) -> Self {
        Self {
            range,
            normalization,
        }
    }

    #[must_use]
    pub const fn range(&self) -> NgramRange {
        self.range
    }

    #[must_use]
    pub fn encode(&self, query: &str, vocabulary: &Vocabulary) -> SparseVector {
        encode(&self.normalization.apply(query), self.range, vocabulary)
    }

    #[must_use]
    pub fn coverage(&self, query: &str, vocabulary: &Vocabulary) -> Coverage {
        let normalized = self.normalization.apply(query);
        let mut coverage = Coverage {
            total: 0,
            matched: 0,
        };
        for token in ngrams(&normalized, self.range) {
            coverage.total += 1;
            if vocabulary.contains(token) {
                coverage.matched += 1;
            }
        }
        coverage
    }
}
