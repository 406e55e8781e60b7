use serde::{Deserialize, Serialize};

/// A named payload field an index record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TrackName,
    ArtistName,
    AlbumName,
    PlaylistName,
}

impl Field {
    /// The payload key this field is stored under in the index.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::TrackName => "track_name",
            Self::ArtistName => "artist_name",
            Self::AlbumName => "album_name",
            Self::PlaylistName => "playlist_name",
        }
    }
}

/// One record returned by a retriever.
///
/// Which name fields are populated depends on the entity type that
/// produced it: a track carries a track and an artist name, a playlist only
/// its own name, and a combined record whatever the index stored. `score`
/// is whatever the index service returned; higher is better, and nothing
/// is assumed about its scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    pub score: f32,
}

impl SearchResult {
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self {
            track_name: None,
            artist_name: None,
            album_name: None,
            playlist_name: None,
            score,
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set_field(field, value);
        self
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    #[must_use]
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::TrackName => self.track_name.as_deref(),
            Field::ArtistName => self.artist_name.as_deref(),
            Field::AlbumName => self.album_name.as_deref(),
            Field::PlaylistName => self.playlist_name.as_deref(),
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::TrackName => &mut self.track_name,
            Field::ArtistName => &mut self.artist_name,
            Field::AlbumName => &mut self.album_name,
            Field::PlaylistName => &mut self.playlist_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let result = SearchResult::new(4.5)
            .with_field(Field::TrackName, "Momentum")
            .with_field(Field::ArtistName, "Don Diablo");

        assert_eq!(result.field(Field::TrackName), Some("Momentum"));
        assert_eq!(result.field(Field::ArtistName), Some("Don Diablo"));
        assert!(result.field(Field::AlbumName).is_none());
        assert!((result.score - 4.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let result = SearchResult::new(1.0).with_field(Field::PlaylistName, "Road Trip");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"playlist_name": "Road Trip", "score": 1.0})
        );
    }

    #[test]
    fn test_field_keys_match_payload_names() {
        assert_eq!(Field::TrackName.key(), "track_name");
        assert_eq!(Field::PlaylistName.key(), "playlist_name");
    }
}
