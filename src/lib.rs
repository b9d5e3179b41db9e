// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod auth;
pub mod badge;
pub mod config;
pub mod events;
pub mod fanout;
pub mod metrics;
pub mod model;
pub mod paging;
pub mod preferences;
pub mod scorer;
pub mod sections;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::events::{FeedEvent, FeedEventBus};
pub use crate::model::{ContentCandidate, ScoredCandidate, Source};
pub use crate::scorer::Personalization;
