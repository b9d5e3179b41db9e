//! # Badge Calculator
//! Labels one candidate relative to a comparison set of siblings.
//! Priority New > Trending > Popular, first match wins, never combined.
//! Mirrors the client-side computation so server and UI agree.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BadgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    New,
    Trending,
    Popular,
}

/// One sibling in the comparison set: score plus effective timestamp.
#[derive(Debug, Clone, Copy)]
pub struct Comparable {
    pub score: f64,
    pub effective: Option<DateTime<Utc>>,
}

fn within(c: &Comparable, now: DateTime<Utc>, window: Duration) -> bool {
    c.effective
        .is_some_and(|ts| now - ts >= Duration::zero() && now - ts <= window)
}

/// Compute the badge for one item against its siblings.
///
/// A zero or negative score can never earn Trending/Popular; New ignores the
/// score entirely. Windows with fewer than the configured minimum sample
/// count make that badge unavailable regardless of score.
pub fn compute_badge(
    effective: Option<DateTime<Utc>>,
    score: f64,
    comparison: &[Comparable],
    cfg: &BadgeConfig,
    now: DateTime<Utc>,
) -> Option<Badge> {
    // New: purely recency, always wins.
    if let Some(ts) = effective {
        let age = now - ts;
        if age >= Duration::zero() && age < Duration::hours(cfg.new_max_age_hours) {
            return Some(Badge::New);
        }
    }

    // Trending: near the max score of the recent window.
    if score > 0.0 {
        let window = Duration::hours(cfg.trending_window_hours);
        let recent: Vec<f64> = comparison
            .iter()
            .filter(|c| within(c, now, window))
            .map(|c| c.score)
            .collect();
        if recent.len() >= cfg.trending_min_samples {
            let max = recent.iter().copied().fold(f64::MIN, f64::max);
            if max > 0.0 && score >= max * cfg.trending_max_ratio {
                return Some(Badge::Trending);
            }
        }
    }

    // Popular: top decile of the weekly positive-score distribution.
    if score > 0.0 {
        let window = Duration::days(cfg.popular_window_days);
        let mut weekly: Vec<f64> = comparison
            .iter()
            .filter(|c| c.score > 0.0 && within(c, now, window))
            .map(|c| c.score)
            .collect();
        if weekly.len() >= cfg.popular_min_samples {
            weekly.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            let idx = ((weekly.len() as f64 * cfg.popular_percentile).floor() as usize)
                .min(weekly.len() - 1);
            if score >= weekly[idx] {
                return Some(Badge::Popular);
            }
        }
    }

    None
}
