//! # Deduplication & Pagination
//! Stable first-occurrence-wins dedup by id, plus opaque cursors for
//! infinite scroll. A cursor is the base64 (URL-safe, no pad) of a decimal
//! integer offset; paging over a stable dataset is idempotent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::HashSet;

use crate::model::ScoredCandidate;

/// Remove items whose id already appeared earlier in the list. Stable and
/// idempotent: re-running on deduped input is a no-op.
pub fn dedup_by_id(items: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|it| seen.insert(it.candidate.id.clone()))
        .collect()
}

pub fn encode_cursor(offset: usize) -> String {
    URL_SAFE_NO_PAD.encode(offset.to_string())
}

/// Decode an opaque cursor back into an offset. Anything malformed is an
/// error; callers decide whether to degrade to offset 0.
pub fn decode_cursor(token: &str) -> anyhow::Result<usize> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| anyhow::anyhow!("cursor base64 decode failed: {e}"))?;
    let text = String::from_utf8(bytes).map_err(|_| anyhow::anyhow!("cursor is not utf-8"))?;
    text.parse::<usize>()
        .map_err(|e| anyhow::anyhow!("cursor is not an offset: {e}"))
}

/// One page of results plus the cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<ScoredCandidate>,
    pub next_cursor: Option<String>,
}

/// Slice `items[offset..offset+limit]`. `next_cursor` is None exactly when
/// `offset + limit >= total`.
pub fn page(items: Vec<ScoredCandidate>, offset: usize, limit: usize) -> Page {
    let total = items.len();
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    let next_cursor = if offset.saturating_add(limit) >= total {
        None
    } else {
        Some(encode_cursor(end))
    };
    Page {
        items: items[start..end].to_vec(),
        next_cursor,
    }
}
