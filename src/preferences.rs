//! # User Preferences
//!
//! Per-user weighting configuration read once per ranking invocation:
//!
//! - `source_weights`: source enum → multiplier in `[0.0, 3.0]`.
//! - `topic_weights`: ordered (topic key, weight in `[0.0, 3.0]`) pairs.
//! - `blocked_topics`: topic keys that trigger a flat penalty.
//!
//! Absent preferences fall back to a fixed neutral default: no topic boosts,
//! source weight 1.0 everywhere, empty block list. Lookups clamp so a bad row
//! in storage can never blow up a score.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::Source;

pub const MAX_SOURCE_WEIGHT: f64 = 3.0;
pub const MAX_TOPIC_WEIGHT: f64 = 3.0;
pub const NEUTRAL_SOURCE_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicWeight {
    pub key: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    #[serde(default)]
    pub source_weights: HashMap<Source, f64>,
    #[serde(default)]
    pub topic_weights: Vec<TopicWeight>,
    #[serde(default)]
    pub blocked_topics: Vec<String>,
}

impl UserPreferences {
    /// Weight for a source, neutral when unset, clamped to `[0, 3]`.
    pub fn source_weight(&self, source: Source) -> f64 {
        self.source_weights
            .get(&source)
            .copied()
            .unwrap_or(NEUTRAL_SOURCE_WEIGHT)
            .clamp(0.0, MAX_SOURCE_WEIGHT)
    }

    /// Topic weights with keys lowercased and weights clamped, in the
    /// user-declared order.
    pub fn normalized_topic_weights(&self) -> impl Iterator<Item = (String, f64)> + '_ {
        self.topic_weights.iter().map(|tw| {
            (
                tw.key.trim().to_lowercase(),
                tw.weight.clamp(0.0, MAX_TOPIC_WEIGHT),
            )
        })
    }

    /// Blocked topic keys, lowercased, empties dropped.
    pub fn normalized_blocked_topics(&self) -> impl Iterator<Item = String> + '_ {
        self.blocked_topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_neutral() {
        let p = UserPreferences::default();
        for s in Source::ALL {
            assert!((p.source_weight(s) - 1.0).abs() < 1e-12);
        }
        assert_eq!(p.normalized_topic_weights().count(), 0);
        assert_eq!(p.normalized_blocked_topics().count(), 0);
    }

    #[test]
    fn source_weight_is_clamped() {
        let mut p = UserPreferences::default();
        p.source_weights.insert(Source::Rss, 9.0);
        p.source_weights.insert(Source::Reddit, -2.0);
        assert_eq!(p.source_weight(Source::Rss), 3.0);
        assert_eq!(p.source_weight(Source::Reddit), 0.0);
    }

    #[test]
    fn topic_keys_are_lowercased_and_clamped() {
        let p = UserPreferences {
            topic_weights: vec![TopicWeight {
                key: "  AI ".into(),
                weight: 5.0,
            }],
            blocked_topics: vec!["Crypto".into(), "  ".into()],
            ..Default::default()
        };
        let tw: Vec<_> = p.normalized_topic_weights().collect();
        assert_eq!(tw, vec![("ai".to_string(), 3.0)]);
        let blocked: Vec<_> = p.normalized_blocked_topics().collect();
        assert_eq!(blocked, vec!["crypto".to_string()]);
    }

    #[test]
    fn deserializes_from_storage_row_shape() {
        let json = r#"{
            "source_weights": { "rss": 2.0, "spotify": 0.5 },
            "topic_weights": [ { "key": "ai", "weight": 2.0 } ],
            "blocked_topics": ["gossip"]
        }"#;
        let p: UserPreferences = serde_json::from_str(json).unwrap();
        assert_eq!(p.source_weight(Source::Rss), 2.0);
        assert_eq!(p.topic_weights.len(), 1);
        assert_eq!(p.blocked_topics, vec!["gossip"]);
    }
}
