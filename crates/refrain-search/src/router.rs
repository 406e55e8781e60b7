//! Keyword routing: a cheap guess at which retrievers a query needs.
//!
//! This is an opt-in pre-filter. The default search path fans out to every
//! entity type and lets [`crate::intent`] decide afterwards.

use refrain_core::EntityType;

/// Suggest entity types to search from keywords in `query`.
///
/// The combined retriever is always included as a safety net.
#[must_use]
pub fn suggest_search_types(query: &str) -> Vec<EntityType> {
    let lower = query.to_lowercase();
    let has_word = |word: &str| {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == word)
    };

    let primary = if lower.contains("album") {
        EntityType::Album
    } else if lower.contains("artist") || has_word("by") {
        EntityType::Artist
    } else if lower.contains("playlist") {
        EntityType::Playlist
    } else {
        EntityType::Track
    };

    vec![primary, EntityType::Combined]
}
