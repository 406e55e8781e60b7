//! Query-intent estimation from score-distribution shape.
//!
//! Without a classifier, the best evidence of what a query was aimed at is
//! how much one entity type's top hit stands out from that type's other
//! hits. Two signals, both relative to the top score so that collections
//! with different score scales stay comparable:
//!
//! - exceptionality: `(top - mean) / top`
//! - drop-off: `(top - second) / top`
//!
//! The confidence for an entity type is `0.7 * exceptionality + 0.3 * drop_off`.

use refrain_core::{EntityType, SearchResult};
use serde::Serialize;

use crate::result_set::ResultSet;

/// Result lists shorter than this score zero.
pub const MIN_RESULTS: usize = 3;

const EXCEPTIONALITY_WEIGHT: f64 = 0.7;
const DROP_OFF_WEIGHT: f64 = 0.3;

/// Entity type reported when there is nothing to rank.
pub const FALLBACK_INTENT: EntityType = EntityType::Track;

/// Confidence that the user meant one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntentScore {
    #[serde(rename = "intent")]
    pub entity_type: EntityType,
    #[serde(rename = "score")]
    pub confidence: f64,
}

/// Entity types ordered from most to least likely intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IntentRanking {
    ranked: Vec<IntentScore>,
}

impl IntentRanking {
    /// The most likely entity type.
    #[must_use]
    pub fn predicted(&self) -> EntityType {
        self.ranked
            .first()
            .map_or(FALLBACK_INTENT, |score| score.entity_type)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[IntentScore] {
        &self.ranked
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntentScore> {
        self.ranked.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Confidence for one result list, which must be in descending score order.
#[must_use]
pub fn confidence(results: &[SearchResult]) -> f64 {
    if results.len() < MIN_RESULTS {
        return 0.0;
    }

    let scores: Vec<f64> = results.iter().map(|r| f64::from(r.score)).collect();
    let top = scores[0];
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;

    let exceptionality = if top > 0.0 { (top - mean) / top } else { 0.0 };
    let drop_off = match scores.get(1) {
        Some(second) if top > 0.0 => (top - second) / top,
        Some(_) => 0.0,
        None => 1.0,
    };

    EXCEPTIONALITY_WEIGHT * exceptionality + DROP_OFF_WEIGHT * drop_off
}

/// Rank the entity types in `result_set` by [`confidence`].
///
/// Ties keep their order from `result_set`. An empty set ranks as a
/// single `track` entry with confidence 0.
#[must_use]
pub fn rank(result_set: &ResultSet) -> IntentRanking {
    if result_set.is_empty() {
        return IntentRanking {
            ranked: vec![IntentScore {
                entity_type: FALLBACK_INTENT,
                confidence: 0.0,
            }],
        };
    }

    let mut ranked: Vec<IntentScore> = result_set
        .iter()
        .map(|(entity_type, results)| IntentScore {
            entity_type,
            confidence: confidence(results),
        })
        .collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    IntentRanking { ranked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refrain_core::Field;

    fn scored(scores: &[f32]) -> Vec<SearchResult> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| SearchResult::new(s).with_field(Field::TrackName, format!("t{i}")))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_confidence_formula() {
        // mean 4.333.., exceptionality 0.5667, drop-off 0.8
        let value = confidence(&scored(&[10.0, 2.0, 1.0]));
        let expected = 0.7 * ((10.0 - 13.0 / 3.0) / 10.0) + 0.3 * 0.8;
        assert!(approx(value, expected));
    }

    #[test]
    fn test_sharp_standout_beats_flat_distribution() {
        let set: ResultSet = [
            (EntityType::Album, scored(&[10.0, 9.0, 8.0])),
            (EntityType::Artist, scored(&[10.0, 2.0, 1.0])),
        ]
        .into_iter()
        .collect();

        let ranking = rank(&set);
        let order: Vec<EntityType> = ranking.iter().map(|s| s.entity_type).collect();
        assert_eq!(order, vec![EntityType::Artist, EntityType::Album]);
        assert_eq!(ranking.predicted(), EntityType::Artist);
        assert!(approx(ranking.as_slice()[1].confidence, 0.1));
    }

    #[test]
    fn test_fewer_than_three_results_score_zero() {
        assert!(approx(confidence(&scored(&[100.0, 1.0])), 0.0));
        assert!(approx(confidence(&[]), 0.0));
    }

    #[test]
    fn test_non_positive_top_score_scores_zero() {
        assert!(approx(confidence(&scored(&[0.0, 0.0, 0.0])), 0.0));
        assert!(approx(confidence(&scored(&[-1.0, -2.0, -3.0])), 0.0));
    }

    #[test]
    fn test_empty_set_falls_back_to_track() {
        let ranking = rank(&ResultSet::new());
        assert_eq!(
            ranking.as_slice(),
            &[IntentScore {
                entity_type: EntityType::Track,
                confidence: 0.0
            }]
        );
    }

    #[test]
    fn test_ties_keep_result_set_order() {
        let set: ResultSet = [
            (EntityType::Playlist, scored(&[5.0])),
            (EntityType::Combined, scored(&[10.0, 5.0, 0.0])),
            (EntityType::Track, vec![]),
            (EntityType::Album, scored(&[1.0, 1.0])),
        ]
        .into_iter()
        .collect();

        let order: Vec<EntityType> = rank(&set).iter().map(|s| s.entity_type).collect();
        assert_eq!(
            order,
            vec![
                EntityType::Combined,
                EntityType::Playlist,
                EntityType::Track,
                EntityType::Album
            ]
        );
    }

    #[test]
    fn test_serializes_like_ranked_intents() {
        let set: ResultSet = [(EntityType::Track, scored(&[1.0]))].into_iter().collect();
        let json = serde_json::to_value(rank(&set)).unwrap();
        assert_eq!(json, serde_json::json!([{"intent": "track", "score": 0.0}]));
    }
}
