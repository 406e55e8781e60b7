//! Per-entity-type result lists gathered by one fan-out.

use refrain_core::{EntityType, SearchResult};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Result lists keyed by entity type, in dispatch order.
///
/// A missing entry means that entity type was not requested or its
/// retriever failed; an empty entry means it ran and matched nothing.
/// Neither is an error. Failed entity types are also listed in
/// [`ResultSet::failed`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<(EntityType, Vec<SearchResult>)>,
    failed: Vec<EntityType>,
}

impl ResultSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `results` for `entity_type`. An existing entry is replaced in
    /// place, keeping its position.
    pub fn insert(&mut self, entity_type: EntityType, results: Vec<SearchResult>) {
        match self.entries.iter_mut().find(|(ty, _)| *ty == entity_type) {
            Some((_, existing)) => *existing = results,
            None => self.entries.push((entity_type, results)),
        }
    }

    /// Record that `entity_type` was attempted and failed.
    pub fn mark_failed(&mut self, entity_type: EntityType) {
        if !self.failed.contains(&entity_type) {
            self.failed.push(entity_type);
        }
    }

    #[must_use]
    pub fn get(&self, entity_type: EntityType) -> Option<&[SearchResult]> {
        self.entries
            .iter()
            .find(|(ty, _)| *ty == entity_type)
            .map(|(_, results)| results.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &[SearchResult])> + '_ {
        self.entries
            .iter()
            .map(|(ty, results)| (*ty, results.as_slice()))
    }

    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.entries.iter().map(|(ty, _)| *ty)
    }

    #[must_use]
    pub fn failed(&self) -> &[EntityType] {
        &self.failed
    }

    /// Number of entity types with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(EntityType, Vec<SearchResult>)> for ResultSet {
    fn from_iter<I: IntoIterator<Item = (EntityType, Vec<SearchResult>)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (ty, results) in iter {
            set.insert(ty, results);
        }
        set
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ty, results) in &self.entries {
            map.serialize_entry(ty, results)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refrain_core::Field;

    fn hit(name: &str, score: f32) -> SearchResult {
        SearchResult::new(score).with_field(Field::AlbumName, name)
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let set: ResultSet = [
            (EntityType::Playlist, vec![]),
            (EntityType::Track, vec![hit("a", 1.0)]),
            (EntityType::Album, vec![]),
        ]
        .into_iter()
        .collect();

        let order: Vec<EntityType> = set.entity_types().collect();
        assert_eq!(
            order,
            vec![EntityType::Playlist, EntityType::Track, EntityType::Album]
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set = ResultSet::new();
        set.insert(EntityType::Track, vec![hit("a", 1.0)]);
        set.insert(EntityType::Album, vec![]);
        set.insert(EntityType::Track, vec![hit("b", 2.0), hit("c", 1.0)]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(EntityType::Track).map(<[_]>::len), Some(2));
        assert_eq!(set.entity_types().next(), Some(EntityType::Track));
    }

    #[test]
    fn test_missing_entry_is_none() {
        let set = ResultSet::new();
        assert!(set.is_empty());
        assert!(set.get(EntityType::Artist).is_none());
    }

    #[test]
    fn test_failed_is_deduplicated() {
        let mut set = ResultSet::new();
        set.mark_failed(EntityType::Combined);
        set.mark_failed(EntityType::Combined);
        assert_eq!(set.failed(), &[EntityType::Combined]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let set: ResultSet = [
            (EntityType::Album, vec![hit("Discovery", 2.0)]),
            (EntityType::Artist, vec![]),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"{"album":[{"album_name":"Discovery","score":2.0}],"artist":[]}"#
        );
    }
}
