// src/model.rs
//! Core feed types: candidates, user actions, follows, and the text haystack
//! used for topic/query matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed set of ingestion sources. Rows carrying anything else are rejected
/// at the storage boundary, before scoring ever sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Rss,
    Youtube,
    Reddit,
    Podcast,
    Eventbrite,
    Spotify,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Rss,
        Source::Youtube,
        Source::Reddit,
        Source::Podcast,
        Source::Eventbrite,
        Source::Spotify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Rss => "rss",
            Source::Youtube => "youtube",
            Source::Reddit => "reddit",
            Source::Podcast => "podcast",
            Source::Eventbrite => "eventbrite",
            Source::Spotify => "spotify",
        }
    }
}

/// One piece of ingested content, immutable from the ranker's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentCandidate {
    pub id: String,
    pub source: Source,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ingested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Identifies the originating feed/handle for follow-boost matching.
    #[serde(default)]
    pub follow_marker: Option<String>,
}

impl ContentCandidate {
    /// `published_at` if present, else `ingested_at`, else None ("unknown
    /// recency", lowest priority but never excluded).
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.ingested_at)
    }

    /// Lowercased concatenation of title+summary+author+tags+topics+source,
    /// the haystack for topic, block-list, and free-text query matching.
    pub fn haystack(&self) -> String {
        let mut out = String::new();
        for part in [&self.title, &self.summary, &self.author] {
            if let Some(s) = part {
                out.push_str(s);
                out.push(' ');
            }
        }
        for t in self.tags.iter().chain(self.topics.iter()) {
            out.push_str(t);
            out.push(' ');
        }
        out.push_str(self.source.as_str());
        out.to_lowercase()
    }

    /// Case-insensitive substring filter used by the `query` request field.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty() || self.haystack().contains(&q)
    }
}

/// A candidate after a ranking pass: score attached, optional badge.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: ContentCandidate,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<crate::badge::Badge>,
}

/// What a user did with one item. `Hide` is an absolute veto; the rest are
/// additive score bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Save,
    Like,
    Open,
    Hide,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserItemAction {
    pub item_id: String,
    pub kind: ActionKind,
}

/// A (source type, handle) pair the user explicitly follows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowedSource {
    pub source: Source,
    pub handle: String,
}

impl FollowedSource {
    pub fn matches(&self, candidate: &ContentCandidate) -> bool {
        candidate.source == self.source
            && candidate
                .follow_marker
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(&self.handle))
    }
}
