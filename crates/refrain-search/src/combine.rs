//! Merge per-entity-type result lists into one ranked list.

use std::collections::HashSet;

use refrain_core::{EntityType, Field, SearchResult};
use serde::Serialize;

use crate::result_set::ResultSet;

/// A result tagged with the entity type whose retriever produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedResult {
    #[serde(rename = "search_type")]
    pub entity_type: EntityType,
    #[serde(flatten)]
    pub result: SearchResult,
}

/// What a record refers to, for deduplication.
///
/// Derived from which name fields the record carries rather than from the
/// retriever that found it, so a track surfaced by both the track and the
/// combined retrievers collapses to one entry while an album and a
/// playlist that happen to share a name do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RecordKey {
    Track { name: String, artist: String },
    Album { name: String, artist: String },
    Playlist { name: String },
    Artist { name: String },
}

impl RecordKey {
    /// `None` for records with no name fields, which are never merged.
    fn of(result: &SearchResult) -> Option<Self> {
        let text = |field: Field| result.field(field).unwrap_or_default().to_string();

        let key = if result.track_name.is_some() {
            Self::Track {
                name: text(Field::TrackName),
                artist: text(Field::ArtistName),
            }
        } else if result.album_name.is_some() {
            Self::Album {
                name: text(Field::AlbumName),
                artist: text(Field::ArtistName),
            }
        } else if result.playlist_name.is_some() {
            Self::Playlist {
                name: text(Field::PlaylistName),
            }
        } else if result.artist_name.is_some() {
            Self::Artist {
                name: text(Field::ArtistName),
            }
        } else {
            return None;
        };
        Some(key)
    }
}

/// Deduplicate every list in `result_set`, then keep the `top_k` best.
///
/// Entity types are visited in `result_set` order and results in list
/// order; the first occurrence of a record wins regardless of score.
/// Survivors are sorted by descending score (stable) and truncated.
#[must_use]
pub fn combine(result_set: &ResultSet, top_k: usize) -> Vec<TaggedResult> {
    let mut seen = HashSet::new();
    let mut combined = Vec::new();

    for (entity_type, results) in result_set.iter() {
        for result in results {
            let fresh = RecordKey::of(result).map_or(true, |key| seen.insert(key));
            if fresh {
                combined.push(TaggedResult {
                    entity_type,
                    result: result.clone(),
                });
            }
        }
    }

    combined.sort_by(|a, b| b.result.score.total_cmp(&a.result.score));
    combined.truncate(top_k);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: &str, score: f32) -> SearchResult {
        SearchResult::new(score)
            .with_field(Field::TrackName, name)
            .with_field(Field::ArtistName, artist)
    }

    #[test]
    fn test_first_occurrence_wins_across_entity_types() {
        let set: ResultSet = [
            (EntityType::Track, vec![track("Momentum", "Don Diablo", 3.0)]),
            (
                EntityType::Combined,
                vec![track("Momentum", "Don Diablo", 9.0)
                    .with_field(Field::AlbumName, "Future")],
            ),
        ]
        .into_iter()
        .collect();

        let combined = combine(&set, 10);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].entity_type, EntityType::Track);
        assert!((combined[0].result.score - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_same_name_different_shapes_do_not_collide() {
        let set: ResultSet = [
            (
                EntityType::Album,
                vec![SearchResult::new(2.0).with_field(Field::AlbumName, "Chill")],
            ),
            (
                EntityType::Playlist,
                vec![SearchResult::new(1.0).with_field(Field::PlaylistName, "Chill")],
            ),
            (
                EntityType::Artist,
                vec![SearchResult::new(0.5).with_field(Field::ArtistName, "Chill")],
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(combine(&set, 10).len(), 3);
    }

    #[test]
    fn test_sorted_by_score_and_truncated() {
        let set: ResultSet = [
            (
                EntityType::Track,
                vec![track("a", "x", 1.0), track("b", "x", 5.0)],
            ),
            (
                EntityType::Playlist,
                vec![
                    SearchResult::new(3.0).with_field(Field::PlaylistName, "c"),
                    SearchResult::new(4.0).with_field(Field::PlaylistName, "d"),
                ],
            ),
        ]
        .into_iter()
        .collect();

        let combined = combine(&set, 3);
        let scores: Vec<f32> = combined.iter().map(|t| t.result.score).collect();
        assert_eq!(scores, vec![5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_same_track_by_different_artists_is_kept() {
        let set: ResultSet = [(
            EntityType::Track,
            vec![track("Intro", "The xx", 2.0), track("Intro", "M83", 1.0)],
        )]
        .into_iter()
        .collect();

        assert_eq!(combine(&set, 5).len(), 2);
    }

    #[test]
    fn test_unnamed_records_are_never_merged() {
        let set: ResultSet = [(
            EntityType::Combined,
            vec![SearchResult::new(2.0), SearchResult::new(1.0)],
        )]
        .into_iter()
        .collect();

        assert_eq!(combine(&set, 5).len(), 2);
    }

    #[test]
    fn test_tagged_result_serialization() {
        let tagged = TaggedResult {
            entity_type: EntityType::Combined,
            result: track("Momentum", "Don Diablo", 1.5),
        };
        assert_eq!(
            serde_json::to_value(&tagged).unwrap(),
            serde_json::json!({
                "search_type": "combined",
                "track_name": "Momentum",
                "artist_name": "Don Diablo",
                "score": 1.5
            })
        );
    }
}
