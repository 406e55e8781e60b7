//! Token vocabularies produced by the offline corpus builder.
//!
//! Each entity type has its own vocabulary: a JSON object mapping every
//! n-gram seen in that type's corpus to the sparse-vector dimension it was
//! assigned. Vocabularies are loaded once at startup and never mutated.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};

/// A read-only token → dimension mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    ids: HashMap<String, u32>,
}

impl Vocabulary {
    /// Load a vocabulary artifact from a JSON file.
    ///
    /// # Errors
    /// Returns [`Error::Vocabulary`] naming the path if the file cannot be
    /// opened or is not an object of string → non-negative integer.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::Vocabulary {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let ids: HashMap<String, u32> =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::Vocabulary {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        log::debug!("Loaded {} tokens from {}", ids.len(), path.display());
        Ok(Self { ids })
    }

    /// The dimension assigned to `token`, if the offline builder saw it.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(|(token, id)| (token.into(), id)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_json_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Mom": 0, "ome": 1, "men": 2}}"#).unwrap();

        let vocab = Vocabulary::load(file.path()).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get("ome"), Some(1));
        assert!(vocab.get("mom").is_none());
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = Vocabulary::load(&path).unwrap_err();
        assert!(matches!(err, Error::Vocabulary { path: ref p, .. } if *p == path));
    }

    #[test]
    fn test_load_rejects_negative_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"abc": -1}}"#).unwrap();

        assert!(matches!(
            Vocabulary::load(file.path()),
            Err(Error::Vocabulary { .. })
        ));
    }

    #[test]
    fn test_from_iter() {
        let vocab: Vocabulary = [("ab", 3), ("bc", 4)].into_iter().collect();
        assert!(vocab.contains("ab"));
        assert!(!vocab.is_empty());
        assert_eq!(vocab.get("bc"), Some(4));
    }
}
