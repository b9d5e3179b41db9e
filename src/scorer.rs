//! # Scorer
//! Pure, testable logic that maps `(candidate, preferences, actions, follows)`
//! → a relevance score. No I/O, suitable for unit tests and offline replay.
//!
//! Policy: weighted linear sum of recency, topic match, source weight, user
//! feedback, follow boost, block penalty, and an editorial source-type boost.
//! A `hide` action is an absolute veto, not a penalty: the candidate is
//! excluded no matter how strong its other signals are.

use chrono::{DateTime, Utc};

use crate::config::RankingConfig;
use crate::model::{ActionKind, ContentCandidate, FollowedSource, ScoredCandidate, UserItemAction};
use crate::preferences::UserPreferences;

pub const MAX_TOPIC_MATCH: f64 = 4.0;

/// Everything personal the scorer consumes. Anonymous requests use
/// `Personalization::default()`: neutral preferences, no actions, no follows,
/// which collapses the formula to recency + source weight + editorial boost.
#[derive(Debug, Clone, Default)]
pub struct Personalization {
    pub preferences: UserPreferences,
    pub actions: Vec<UserItemAction>,
    pub follows: Vec<FollowedSource>,
}

/// Recency component: soft hyperbolic decay over 24h, clamped so old items
/// keep a nonzero floor. Unknown timestamps get a flat low constant.
pub fn recency_component(
    effective: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cfg: &RankingConfig,
) -> f64 {
    match effective {
        Some(ts) => {
            let hours = (now - ts).num_seconds().max(0) as f64 / 3600.0;
            (1.0 / (1.0 + hours / 24.0)).clamp(0.05, 1.0)
        }
        None => cfg.weights.unknown_recency,
    }
}

fn topic_match_component(haystack: &str, prefs: &UserPreferences) -> f64 {
    let total: f64 = prefs
        .normalized_topic_weights()
        .filter(|(key, _)| !key.is_empty() && haystack.contains(key.as_str()))
        .map(|(_, w)| w)
        .sum();
    total.clamp(0.0, MAX_TOPIC_MATCH)
}

fn is_blocked(haystack: &str, prefs: &UserPreferences) -> bool {
    prefs
        .normalized_blocked_topics()
        .any(|key| haystack.contains(key.as_str()))
}

/// Additive feedback bonus for this item, or None when any `hide` exists.
fn action_bonus(item_id: &str, actions: &[UserItemAction], cfg: &RankingConfig) -> Option<f64> {
    let mut bonus = 0.0;
    for a in actions.iter().filter(|a| a.item_id == item_id) {
        match a.kind {
            ActionKind::Hide => return None,
            ActionKind::Save => bonus += cfg.weights.save_bonus,
            ActionKind::Like => bonus += cfg.weights.like_bonus,
            ActionKind::Open => bonus += cfg.weights.open_bonus,
        }
    }
    Some(bonus)
}

/// Score one candidate. Returns `None` when a `hide` action vetoes it.
pub fn score_candidate(
    candidate: &ContentCandidate,
    personal: &Personalization,
    cfg: &RankingConfig,
    now: DateTime<Utc>,
) -> Option<f64> {
    let bonus = action_bonus(&candidate.id, &personal.actions, cfg)?;

    let haystack = candidate.haystack();
    let prefs = &personal.preferences;

    let recency = recency_component(candidate.effective_timestamp(), now, cfg);
    let topic = topic_match_component(&haystack, prefs);
    let source_w = prefs.source_weight(candidate.source);
    let block = if is_blocked(&haystack, prefs) {
        cfg.weights.block_penalty
    } else {
        0.0
    };
    let follow = if personal.follows.iter().any(|f| f.matches(candidate)) {
        cfg.weights.follow_boost
    } else {
        0.0
    };

    Some(
        recency * cfg.weights.recency
            + topic * cfg.weights.topic_match
            + source_w * cfg.weights.source_weight
            + bonus
            + follow
            - block
            + cfg.source_type_boost(candidate.source),
    )
}

/// Score a batch, drop hidden candidates, and sort by score descending.
/// The sort is stable: ties keep fetch order.
pub fn rank(
    candidates: Vec<ContentCandidate>,
    personal: &Personalization,
    cfg: &RankingConfig,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter_map(|c| {
            score_candidate(&c, personal, cfg, now).map(|score| ScoredCandidate {
                candidate: c,
                score,
                badge: None,
            })
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}
