// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /feed (liveness, never ranking output)
// - POST /feed happy path, malformed body, auth degradation
// - storage error taxonomy (unprovisioned → 200 empty, hard failure → 500)
// - /debug/config

use std::sync::{Arc, RwLock};

use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use chrono::{Duration, Utc};
use feed_ranker::api::{create_router, AppState};
use feed_ranker::auth::TokenMap;
use feed_ranker::config::{ConfigHandle, RankingConfig};
use feed_ranker::events::FeedEventBus;
use feed_ranker::model::{ActionKind, ContentCandidate, Source, UserItemAction};
use feed_ranker::store::{CandidateStore, MemoryStore, MisconfiguredStore};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn candidate(id: &str, title: &str, age_hours: i64) -> ContentCandidate {
    ContentCandidate {
        id: id.into(),
        source: Source::Rss,
        title: Some(title.into()),
        summary: None,
        author: None,
        url: None,
        published_at: Some(Utc::now() - Duration::hours(age_hours)),
        ingested_at: None,
        tags: vec![],
        topics: vec![],
        follow_marker: None,
    }
}

fn router_with(store: impl CandidateStore + 'static, tokens: TokenMap) -> Router {
    let state = AppState {
        config: ConfigHandle::new(RankingConfig::default()),
        store: Arc::new(store),
        tokens: Arc::new(RwLock::new(tokens)),
        events: FeedEventBus::default(),
    };
    create_router(state)
}

async fn post_feed(app: Router, body: &str, bearer: Option<&str>) -> (StatusCode, Json) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/feed")
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::from(body.to_string())).expect("build POST /feed");
    let resp = app.oneshot(req).await.expect("oneshot /feed");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, serde_json::from_slice(&bytes).expect("parse feed json"))
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = router_with(MemoryStore::default(), TokenMap::default());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "OK", "health body should be 'OK'");
}

#[tokio::test]
async fn api_get_feed_is_liveness_not_ranking() {
    let app = router_with(
        MemoryStore {
            candidates: vec![candidate("a", "x", 1)],
            ..Default::default()
        },
        TokenMap::default(),
    );

    let req = Request::builder()
        .method("GET")
        .uri("/feed")
        .body(Body::empty())
        .expect("build GET /feed");
    let resp = app.oneshot(req).await.expect("oneshot GET /feed");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap().to_vec();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["status"], "ok");
    assert!(v.get("feed").is_none(), "liveness must not carry ranking output");
}

#[tokio::test]
async fn api_post_feed_returns_scored_items() {
    let app = router_with(
        MemoryStore {
            candidates: vec![candidate("a", "fresh one", 1), candidate("b", "older", 30)],
            ..Default::default()
        },
        TokenMap::default(),
    );

    let (status, v) = post_feed(app, &json!({ "limit": 10 }).to_string(), None).await;
    assert_eq!(status, StatusCode::OK);

    let feed = v["feed"].as_array().expect("feed array");
    assert_eq!(feed.len(), 2);
    // score-sorted: the fresher item first
    assert_eq!(feed[0]["id"], "a");
    assert!(feed[0]["score"].as_f64().unwrap() > feed[1]["score"].as_f64().unwrap());
    // 1h-old item carries the "new" badge
    assert_eq!(feed[0]["badge"], "new");
    assert_eq!(v["debug"]["anonymous"], true);
    assert!(v["fresh"].as_array().unwrap().iter().any(|i| i["id"] == "a"));
}

#[tokio::test]
async fn api_malformed_body_defaults_instead_of_rejecting() {
    let app = router_with(
        MemoryStore {
            candidates: vec![candidate("a", "x", 1)],
            ..Default::default()
        },
        TokenMap::default(),
    );

    let (status, v) = post_feed(app, "{ not json", None).await;
    assert_eq!(status, StatusCode::OK, "parse errors degrade to defaults");
    assert_eq!(v["feed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn api_unprovisioned_store_is_200_with_error_string() {
    let app = router_with(
        MemoryStore {
            unprovisioned: true,
            ..Default::default()
        },
        TokenMap::default(),
    );

    let (status, v) = post_feed(app, "{}", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["feed"].as_array().unwrap().is_empty());
    let err = v["error"].as_str().expect("error string");
    assert!(err.contains("not provisioned"), "got {err:?}");
}

#[tokio::test]
async fn api_hard_storage_failure_is_500_with_error() {
    let app = router_with(
        MisconfiguredStore {
            reason: "FEED_STORE_URL is not set".into(),
        },
        TokenMap::default(),
    );

    let (status, v) = post_feed(app, "{}", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().unwrap().contains("FEED_STORE_URL"));
}

#[tokio::test]
async fn api_invalid_bearer_degrades_to_anonymous() {
    let app = router_with(
        MemoryStore {
            candidates: vec![candidate("a", "x", 1)],
            actions: vec![UserItemAction {
                item_id: "a".into(),
                kind: ActionKind::Hide,
            }],
            ..Default::default()
        },
        TokenMap::with_token("good-token", "user-1"),
    );

    // Wrong token: anonymous scoring, so the hide action is not applied.
    let (status, v) = post_feed(app, "{}", Some("wrong-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["debug"]["anonymous"], true);
    assert_eq!(v["feed"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn api_valid_bearer_applies_personalization() {
    let app = router_with(
        MemoryStore {
            candidates: vec![candidate("a", "x", 1), candidate("b", "y", 1)],
            actions: vec![UserItemAction {
                item_id: "a".into(),
                kind: ActionKind::Hide,
            }],
            ..Default::default()
        },
        TokenMap::with_token("good-token", "user-1"),
    );

    let (status, v) = post_feed(app, "{}", Some("good-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["debug"]["anonymous"], false);
    let feed = v["feed"].as_array().unwrap();
    assert_eq!(feed.len(), 1, "hidden candidate must be excluded");
    assert_eq!(feed[0]["id"], "b");
    assert_eq!(v["debug"]["hidden"], 1);
}

#[tokio::test]
async fn api_debug_config_exposes_weights() {
    let app = router_with(MemoryStore::default(), TokenMap::default());

    let req = Request::builder()
        .method("GET")
        .uri("/debug/config")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap().to_vec();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["weights"]["recency"], 1.8);
    assert_eq!(v["badge_min_samples"]["trending"], 3);
}
