use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The kind of catalog entity a query may be aimed at.
///
/// Each entity type has its own vocabulary and its own index collection.
/// `Combined` indexes track, artist and album names together so that mixed
/// queries ("momentum don diablo") can still land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Track,
    Album,
    Artist,
    Playlist,
    Combined,
}

impl EntityType {
    /// Every entity type, in the order a default search fans out to them.
    pub const ALL: [Self; 5] = [
        Self::Track,
        Self::Album,
        Self::Artist,
        Self::Playlist,
        Self::Combined,
    ];

    /// The lowercase tag used in configuration, requests and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::UnknownEntityType(s.to_string()))
    }
}
