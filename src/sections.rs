//! # Section Builder
//! Partitions scored candidates into named, time-bounded buckets. Each
//! candidate lands in at most one section, first match wins, and every
//! section dedupes against ids already placed upstream.
//!
//! Order: Fresh (≤6h, newest first) → Today (≤24h) → Trending (≤48h, by
//! score) → Deep Cuts (7–30 days, by score) → category keyword rows (no time
//! bound, newest first). Empty sections are omitted; when nothing buckets at
//! all, callers fall back to the flat score-sorted list.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::config::SectionConfig;
use crate::model::ScoredCandidate;

pub const FRESH: &str = "Fresh";
pub const TODAY: &str = "Today";
pub const TRENDING: &str = "Trending";
pub const DEEP_CUTS: &str = "Deep Cuts";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedSection {
    pub name: String,
    pub items: Vec<ScoredCandidate>,
}

fn sort_by_timestamp_desc(items: &mut [ScoredCandidate]) {
    items.sort_by(|a, b| {
        b.candidate
            .effective_timestamp()
            .cmp(&a.candidate.effective_timestamp())
    });
}

fn sort_by_score_desc(items: &mut [ScoredCandidate]) {
    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn take_section(
    name: &str,
    pool: &[ScoredCandidate],
    seen: &mut HashSet<String>,
    cap: usize,
    mut pick: impl FnMut(&ScoredCandidate) -> bool,
    sort: impl Fn(&mut [ScoredCandidate]),
) -> Option<FeedSection> {
    let mut items: Vec<ScoredCandidate> = pool
        .iter()
        .filter(|c| !seen.contains(&c.candidate.id) && pick(c))
        .cloned()
        .collect();
    if items.is_empty() {
        return None;
    }
    sort(&mut items);
    items.truncate(cap);
    for it in &items {
        seen.insert(it.candidate.id.clone());
    }
    Some(FeedSection {
        name: name.to_string(),
        items,
    })
}

/// Build the section list from an already scored, deduplicated pool.
pub fn build_sections(
    pool: &[ScoredCandidate],
    cfg: &SectionConfig,
    now: DateTime<Utc>,
) -> Vec<FeedSection> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    let age = |c: &ScoredCandidate| c.candidate.effective_timestamp().map(|ts| now - ts);
    let within_hours = |c: &ScoredCandidate, h: i64| {
        age(c).is_some_and(|d| d >= Duration::zero() && d <= Duration::hours(h))
    };

    if let Some(s) = take_section(
        FRESH,
        pool,
        &mut seen,
        cfg.cap,
        |c| within_hours(c, cfg.fresh_hours),
        sort_by_timestamp_desc,
    ) {
        out.push(s);
    }

    if let Some(s) = take_section(
        TODAY,
        pool,
        &mut seen,
        cfg.cap,
        |c| within_hours(c, cfg.today_hours),
        sort_by_timestamp_desc,
    ) {
        out.push(s);
    }

    if let Some(s) = take_section(
        TRENDING,
        pool,
        &mut seen,
        cfg.cap,
        |c| within_hours(c, cfg.trending_hours),
        sort_by_score_desc,
    ) {
        out.push(s);
    }

    let min_age = Duration::days(cfg.deep_cuts_min_days);
    let max_age = Duration::days(cfg.deep_cuts_max_days);
    if let Some(s) = take_section(
        DEEP_CUTS,
        pool,
        &mut seen,
        cfg.cap,
        |c| age(c).is_some_and(|d| d >= min_age && d <= max_age),
        sort_by_score_desc,
    ) {
        out.push(s);
    }

    // Category rows draw from the full remaining pool, not time-bounded.
    for row in &cfg.categories {
        let keywords: Vec<String> = row.keywords.iter().map(|k| k.to_lowercase()).collect();
        if let Some(s) = take_section(
            &row.name,
            pool,
            &mut seen,
            cfg.cap,
            |c| {
                let hay = c.candidate.haystack();
                keywords.iter().any(|k| hay.contains(k.as_str()))
            },
            sort_by_timestamp_desc,
        ) {
            out.push(s);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentCandidate, Source};
    use chrono::Duration;
    use std::collections::HashSet;

    fn scored(id: &str, title: &str, age_hours: i64, score: f64, now: DateTime<Utc>) -> ScoredCandidate {
        ScoredCandidate {
            candidate: ContentCandidate {
                id: id.into(),
                source: Source::Rss,
                title: Some(title.into()),
                summary: None,
                author: None,
                url: None,
                published_at: Some(now - Duration::hours(age_hours)),
                ingested_at: None,
                tags: vec![],
                topics: vec![],
                follow_marker: None,
            },
            score,
            badge: None,
        }
    }

    fn cfg() -> SectionConfig {
        SectionConfig::default()
    }

    #[test]
    fn first_match_wins_partition() {
        let now = Utc::now();
        let pool = vec![
            scored("a", "x", 1, 1.0, now),   // Fresh
            scored("b", "x", 10, 1.0, now),  // Today
            scored("c", "x", 40, 1.0, now),  // Trending
            scored("d", "x", 24 * 10, 1.0, now), // Deep Cuts
        ];
        let sections = build_sections(&pool, &cfg(), now);
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![FRESH, TODAY, TRENDING, DEEP_CUTS]);

        let mut all_ids = HashSet::new();
        for s in &sections {
            for it in &s.items {
                assert!(all_ids.insert(it.candidate.id.clone()), "id {} in two sections", it.candidate.id);
            }
        }
    }

    #[test]
    fn empty_sections_are_omitted() {
        let now = Utc::now();
        let pool = vec![scored("a", "x", 1, 1.0, now)];
        let sections = build_sections(&pool, &cfg(), now);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, FRESH);
    }

    #[test]
    fn fresh_sorts_by_timestamp_trending_by_score() {
        let now = Utc::now();
        let pool = vec![
            scored("old-fresh", "x", 5, 9.0, now),
            scored("new-fresh", "x", 1, 1.0, now),
            scored("t-low", "x", 40, 1.0, now),
            scored("t-high", "x", 47, 8.0, now),
        ];
        let sections = build_sections(&pool, &cfg(), now);
        assert_eq!(sections[0].items[0].candidate.id, "new-fresh");
        let trending = sections.iter().find(|s| s.name == TRENDING).unwrap();
        assert_eq!(trending.items[0].candidate.id, "t-high");
    }

    #[test]
    fn sections_respect_cap() {
        let now = Utc::now();
        let mut c = cfg();
        c.cap = 2;
        let pool: Vec<_> = (0..5).map(|i| scored(&format!("f{i}"), "x", 1, 1.0, now)).collect();
        let sections = build_sections(&pool, &c, now);
        assert_eq!(sections[0].items.len(), 2);
    }

    #[test]
    fn category_rows_match_keywords_from_remaining_pool() {
        let now = Utc::now();
        let pool = vec![
            scored("fresh-tech", "AI software news", 1, 1.0, now), // goes to Fresh first
            scored("old-tech", "programming deep dive", 24 * 60, 2.0, now), // too old for timed buckets
            scored("old-music", "new album drops", 24 * 60, 2.0, now),
        ];
        let sections = build_sections(&pool, &cfg(), now);
        let tech = sections.iter().find(|s| s.name == "Tech").expect("tech row");
        assert_eq!(tech.items.len(), 1);
        assert_eq!(tech.items[0].candidate.id, "old-tech");
        let music = sections.iter().find(|s| s.name == "Music").expect("music row");
        assert_eq!(music.items[0].candidate.id, "old-music");
    }

    #[test]
    fn unknown_timestamp_never_enters_timed_buckets() {
        let now = Utc::now();
        let mut item = scored("u", "mystery", 0, 5.0, now);
        item.candidate.published_at = None;
        let sections = build_sections(&[item], &cfg(), now);
        assert!(sections.iter().all(|s| s.name != FRESH && s.name != TRENDING));
    }
}
