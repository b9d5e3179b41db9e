use std::sync::{Arc, RwLock};
use std::time::Instant;

use shuttle_axum::axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::auth::{anon_hash, TokenMap, DEFAULT_TOKENS_PATH};
use crate::badge::{compute_badge, Comparable};
use crate::config::ConfigHandle;
use crate::events::{FeedEvent, FeedEventBus};
use crate::fanout::fetch_personalization;
use crate::model::{ContentCandidate, ScoredCandidate, Source};
use crate::paging::{decode_cursor, dedup_by_id, page};
use crate::scorer::{rank, score_candidate, Personalization};
use crate::sections::{build_sections, FeedSection, FRESH, TODAY};
use crate::store::{parse_source, CandidateQuery, CandidateStore, FetchOutcome};

pub const DEFAULT_LIMIT: usize = 60;
pub const MIN_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 120;
pub const DEFAULT_DAYS: u32 = 21;
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 365;

#[derive(Clone)]
pub struct AppState {
    pub config: ConfigHandle,
    pub store: Arc<dyn CandidateStore>,
    pub tokens: Arc<RwLock<TokenMap>>,
    pub events: FeedEventBus,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/feed", get(feed_liveness).post(rank_feed))
        .route("/debug/config", get(debug_config))
        .route("/debug/score", post(debug_score))
        .route("/admin/reload-tokens", get(admin_reload_tokens))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// POST /feed request body. Any parse failure degrades to these defaults;
/// a malformed body is never a 4xx.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedRequest {
    pub limit: Option<usize>,
    pub types: Vec<String>,
    pub query: Option<String>,
    pub days: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct DebugInfo {
    pub candidates: usize,
    pub kept: usize,
    pub hidden: usize,
    pub elapsed_ms: u64,
    pub anonymous: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct FeedResponse {
    pub feed: Vec<ScoredCandidate>,
    pub fresh: Vec<ScoredCandidate>,
    pub today: Vec<ScoredCandidate>,
    pub sections: Vec<FeedSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub debug: DebugInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeedResponse {
    fn failure(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// GET /feed is a static liveness payload, never ranking output.
async fn feed_liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "feed-ranker" }))
}

async fn rank_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<FeedResponse>) {
    let started = Instant::now();
    let cfg = state.config.snapshot();

    // Parse errors on the body default to an empty request.
    let req: FeedRequest = serde_json::from_slice(&body).unwrap_or_default();
    let limit = req.limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT);
    let days = req.days.unwrap_or(DEFAULT_DAYS).clamp(MIN_DAYS, MAX_DAYS);
    let types: Vec<Source> = req
        .types
        .iter()
        .filter_map(|t| {
            let parsed = parse_source(t);
            if parsed.is_none() {
                warn!(source = %t, "ignoring unknown source filter");
            }
            parsed
        })
        .collect();
    let offset = match req.cursor.as_deref() {
        None => 0,
        Some(token) => decode_cursor(token).unwrap_or_else(|e| {
            warn!(error = %e, "invalid cursor, starting from the first page");
            0
        }),
    };

    // Missing/invalid bearer tokens degrade to anonymous scoring.
    let user_id = {
        let authorization = headers
            .get("authorization")
            .and_then(|h| h.to_str().ok());
        match state.tokens.read() {
            Ok(map) => map.resolve(authorization),
            Err(_) => None,
        }
    };

    // One fetch per request; sections and pages are views over this list.
    let candidates = match state.store.fetch_candidates(&CandidateQuery { days, types }).await {
        Ok(FetchOutcome::Fetched(items)) => items,
        Ok(FetchOutcome::Unprovisioned(reason)) => {
            info!(reason = %reason, "store not provisioned, serving empty feed");
            metrics::counter!("feed_unprovisioned_total").increment(1);
            return (
                StatusCode::OK,
                Json(FeedResponse::failure(format!(
                    "content store not provisioned yet: {reason}"
                ))),
            );
        }
        Err(e) => {
            warn!(error = %e, "storage fetch failed");
            metrics::counter!("feed_store_errors_total").increment(1);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FeedResponse::failure(e.to_string())),
            );
        }
    };

    let personal = match &user_id {
        Some(uid) => fetch_personalization(state.store.as_ref(), uid).await,
        None => Personalization::default(),
    };

    let now = chrono::Utc::now();
    let filtered: Vec<ContentCandidate> = match req.query.as_deref() {
        Some(q) if !q.trim().is_empty() => candidates
            .into_iter()
            .filter(|c| c.matches_query(q))
            .collect(),
        _ => candidates,
    };

    let fetched = filtered.len();
    let scored = rank(filtered, &personal, &cfg, now);
    let hidden = fetched - scored.len();
    let mut pool = dedup_by_id(scored);

    // Badges are computed against the full deduped pool so the flat feed and
    // the sections agree on labels.
    let comparison: Vec<Comparable> = pool
        .iter()
        .map(|s| Comparable {
            score: s.score,
            effective: s.candidate.effective_timestamp(),
        })
        .collect();
    for item in pool.iter_mut() {
        item.badge = compute_badge(
            item.candidate.effective_timestamp(),
            item.score,
            &comparison,
            &cfg.badges,
            now,
        );
    }

    let sections = build_sections(&pool, &cfg.sections, now);
    let fresh = section_items(&sections, FRESH);
    let today = section_items(&sections, TODAY);

    let kept = pool.len();
    let paged = page(pool, offset, limit);

    let elapsed_ms = started.elapsed().as_millis() as u64;
    crate::metrics::record_rank_pass(fetched, kept, hidden, elapsed_ms);
    state.events.publish(FeedEvent {
        user: user_id.as_deref().map(anon_hash),
        candidates: fetched,
        kept,
        hidden,
        elapsed_ms,
    });
    info!(
        user = %user_id.as_deref().map(anon_hash).unwrap_or_else(|| "anon".into()),
        candidates = fetched,
        kept,
        hidden,
        elapsed_ms,
        "feed ranked"
    );

    (
        StatusCode::OK,
        Json(FeedResponse {
            feed: paged.items,
            fresh,
            today,
            sections,
            next_cursor: paged.next_cursor,
            debug: DebugInfo {
                candidates: fetched,
                kept,
                hidden,
                elapsed_ms,
                anonymous: user_id.is_none(),
            },
            error: None,
        }),
    )
}

fn section_items(sections: &[FeedSection], name: &str) -> Vec<ScoredCandidate> {
    sections
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.items.clone())
        .unwrap_or_default()
}

/// Current weight snapshot for quick production diagnosis.
async fn debug_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cfg = state.config.snapshot();
    Json(serde_json::json!({
        "weights": {
            "recency": cfg.weights.recency,
            "topic_match": cfg.weights.topic_match,
            "source_weight": cfg.weights.source_weight,
            "save_bonus": cfg.weights.save_bonus,
            "like_bonus": cfg.weights.like_bonus,
            "open_bonus": cfg.weights.open_bonus,
            "follow_boost": cfg.weights.follow_boost,
            "block_penalty": cfg.weights.block_penalty,
        },
        "section_cap": cfg.sections.cap,
        "badge_min_samples": {
            "trending": cfg.badges.trending_min_samples,
            "popular": cfg.badges.popular_min_samples,
        },
    }))
}

#[derive(Serialize)]
struct ScoreOut {
    score: Option<f64>,
    excluded: bool,
}

/// Score one ad-hoc candidate with anonymous personalization.
async fn debug_score(
    State(state): State<AppState>,
    Json(candidate): Json<ContentCandidate>,
) -> Json<ScoreOut> {
    let cfg = state.config.snapshot();
    let score = score_candidate(
        &candidate,
        &Personalization::default(),
        &cfg,
        chrono::Utc::now(),
    );
    Json(ScoreOut {
        excluded: score.is_none(),
        score,
    })
}

async fn admin_reload_tokens(State(state): State<AppState>) -> String {
    let fresh = TokenMap::load_from_file(DEFAULT_TOKENS_PATH);
    match state.tokens.write() {
        Ok(mut t) => {
            *t = fresh;
            "reloaded".to_string()
        }
        Err(_) => "failed: lock poisoned".to_string(),
    }
}
