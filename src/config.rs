// src/config.rs
//! Ranking configuration: score weights, section cutoffs and caps, category
//! keyword rows, badge thresholds. Loaded from TOML with env overrides and a
//! dev-gated hot-reload watcher.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

// --- env defaults & names ---
pub const DEFAULT_RANKING_CONFIG_PATH: &str = "config/ranking.toml";

pub const ENV_RANKING_CONFIG_PATH: &str = "RANKING_CONFIG_PATH";
pub const ENV_RANKING_HOT_RELOAD: &str = "RANKING_HOT_RELOAD";

// Dev logging gate: FEED_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("FEED_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

/// Multipliers of the weighted linear score. Defaults reproduce the
/// production weighting; all are overridable from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub recency: f64,
    pub topic_match: f64,
    pub source_weight: f64,
    pub save_bonus: f64,
    pub like_bonus: f64,
    pub open_bonus: f64,
    pub follow_boost: f64,
    pub block_penalty: f64,
    /// Editorial per-source weight is multiplied by this per weight point.
    pub source_type_multiplier: f64,
    /// Recency contribution when a candidate has no effective timestamp.
    pub unknown_recency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            recency: 1.8,
            topic_match: 1.2,
            source_weight: 0.9,
            save_bonus: 2.2,
            like_bonus: 1.4,
            open_bonus: 0.35,
            follow_boost: 1.25,
            block_penalty: 3.5,
            source_type_multiplier: 0.2,
            unknown_recency: 0.15,
        }
    }
}

/// Time cutoffs (hours/days) and per-section item cap.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub fresh_hours: i64,
    pub today_hours: i64,
    pub trending_hours: i64,
    pub deep_cuts_min_days: i64,
    pub deep_cuts_max_days: i64,
    pub cap: usize,
    /// Category rows: display name → keywords matched over the haystack.
    pub categories: Vec<CategoryRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            fresh_hours: 6,
            today_hours: 24,
            trending_hours: 48,
            deep_cuts_min_days: 7,
            deep_cuts_max_days: 30,
            cap: 20,
            categories: default_categories(),
        }
    }
}

fn default_categories() -> Vec<CategoryRow> {
    [
        ("Tech", &["tech", "software", "ai", "programming"][..]),
        ("Culture", &["culture", "film", "art", "books"][..]),
        ("Finance", &["finance", "markets", "economy", "money"][..]),
        ("Music", &["music", "album", "playlist", "concert"][..]),
    ]
    .into_iter()
    .map(|(name, kws)| CategoryRow {
        name: name.to_string(),
        keywords: kws.iter().map(|k| k.to_string()).collect(),
    })
    .collect()
}

/// Badge thresholds. The minimum-sample cutoffs are deliberate constants
/// carried over from production behavior; tune here, not in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    pub new_max_age_hours: i64,
    pub trending_window_hours: i64,
    pub trending_min_samples: usize,
    pub trending_max_ratio: f64,
    pub popular_window_days: i64,
    pub popular_min_samples: usize,
    pub popular_percentile: f64,
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            new_max_age_hours: 2,
            trending_window_hours: 48,
            trending_min_samples: 3,
            trending_max_ratio: 0.95,
            popular_window_days: 7,
            popular_min_samples: 10,
            popular_percentile: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub weights: ScoreWeights,
    pub sections: SectionConfig,
    pub badges: BadgeConfig,
    /// Editorial per-source weights feeding the source-type boost.
    pub source_boosts: HashMap<String, f64>,
}

impl RankingConfig {
    /// Load from a TOML file. Uses RANKING_CONFIG_PATH or the default path;
    /// a missing file yields the built-in defaults rather than an error so a
    /// bare deployment still ranks.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_RANKING_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_RANKING_CONFIG_PATH));

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) => {
                info!(path = %path.display(), error = %e, "ranking config missing, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: RankingConfig = toml::from_str(toml_str)?;
        Ok(cfg)
    }

    /// Editorial boost for one source type: `weight * multiplier`, 0 when the
    /// source carries no editorial weight.
    pub fn source_type_boost(&self, source: crate::model::Source) -> f64 {
        self.source_boosts
            .get(source.as_str())
            .copied()
            .unwrap_or(0.0)
            * self.weights.source_type_multiplier
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// A threadsafe handle that can hot-reload the underlying config in dev/local.
/// - Enable by setting RANKING_HOT_RELOAD=1
/// - Dev-gated: active only if cfg!(debug_assertions) OR SHUTTLE_ENV is "local"/"development".
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<RankingConfig>>,
}

impl ConfigHandle {
    pub fn new(config: RankingConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current config. Falls back to defaults if the lock is
    /// poisoned, so a panicked reload can never take ranking down.
    pub fn snapshot(&self) -> RankingConfig {
        self.inner
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

fn hot_reload_enabled() -> bool {
    let want = std::env::var(ENV_RANKING_HOT_RELOAD)
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Start a simple polling watcher on `path` to hot-reload into `handle`.
/// Polls mtime every 2s. Uses only std, no external deps.
pub fn start_hot_reload_thread(handle: ConfigHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        if let Ok(content) = fs::read_to_string(&path) {
                            if let Ok(new_cfg) = RankingConfig::from_toml_str(&content) {
                                if let Ok(mut guard) = handle.inner.write() {
                                    *guard = new_cfg;
                                    info!(path = %path.display(), "ranking config hot-reloaded");
                                }
                            }
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    #[test]
    fn defaults_match_production_weighting() {
        let cfg = RankingConfig::default();
        assert_eq!(cfg.weights.recency, 1.8);
        assert_eq!(cfg.weights.topic_match, 1.2);
        assert_eq!(cfg.weights.source_weight, 0.9);
        assert_eq!(cfg.weights.save_bonus, 2.2);
        assert_eq!(cfg.weights.block_penalty, 3.5);
        assert_eq!(cfg.sections.cap, 20);
        assert_eq!(cfg.badges.trending_min_samples, 3);
        assert_eq!(cfg.badges.popular_min_samples, 10);
    }

    #[test]
    fn toml_overrides_selected_fields_only() {
        let toml = r#"
[weights]
recency = 2.0

[badges]
trending_min_samples = 5

[sections]
cap = 10

[source_boosts]
rss = 1.0
"#;
        let cfg = RankingConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.weights.recency, 2.0);
        // untouched fields keep their defaults
        assert_eq!(cfg.weights.topic_match, 1.2);
        assert_eq!(cfg.badges.trending_min_samples, 5);
        assert_eq!(cfg.sections.cap, 10);
        assert!((cfg.source_type_boost(Source::Rss) - 0.2).abs() < 1e-12);
        assert_eq!(cfg.source_type_boost(Source::Spotify), 0.0);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(RankingConfig::from_toml_str("weights = 3").is_err());
    }

    #[test]
    fn handle_snapshot_is_independent() {
        let handle = ConfigHandle::new(RankingConfig::default());
        let snap = handle.snapshot();
        assert_eq!(snap.sections.cap, 20);
    }
}
