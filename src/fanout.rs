// src/fanout.rs
//! Structured fan-out for independent sub-queries. Each branch settles to a
//! uniform per-source result (value, typed failure, or timeout) so callers
//! never hand-inspect join results; a failed branch degrades to its default
//! instead of failing the whole response.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::scorer::Personalization;
use crate::store::CandidateStore;

/// Budget for one personalization sub-query. Candidates get the storage
/// client's own 20s budget; these are small per-user lookups.
pub const PERSONALIZATION_TIMEOUT: Duration = Duration::from_millis(6500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanoutError {
    TimedOut,
    Failed(String),
}

impl std::fmt::Display for FanoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FanoutError::TimedOut => write!(f, "timed out"),
            FanoutError::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

/// Outcome of one fanned-out branch, tagged with its name for logging.
#[derive(Debug)]
pub struct SourceResult<T> {
    pub name: &'static str,
    pub outcome: Result<T, FanoutError>,
}

impl<T: Default> SourceResult<T> {
    /// Unwrap the value, logging and substituting the default on failure.
    pub fn value_or_default(self) -> T {
        match self.outcome {
            Ok(v) => v,
            Err(e) => {
                warn!(source = self.name, error = %e, "fan-out branch degraded to default");
                T::default()
            }
        }
    }
}

/// Run one branch under a deadline and settle it into a `SourceResult`.
pub async fn settle<T, F>(name: &'static str, deadline: Duration, fut: F) -> SourceResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let outcome = match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(FanoutError::Failed(e.to_string())),
        Err(_) => Err(FanoutError::TimedOut),
    };
    SourceResult { name, outcome }
}

/// Fetch preferences, actions, and follows for one user concurrently. Every
/// branch fails independently; the worst case is anonymous-equivalent
/// personalization, never an error.
pub async fn fetch_personalization(store: &dyn CandidateStore, user_id: &str) -> Personalization {
    let (prefs, actions, follows) = tokio::join!(
        settle(
            "preferences",
            PERSONALIZATION_TIMEOUT,
            store.fetch_preferences(user_id)
        ),
        settle(
            "actions",
            PERSONALIZATION_TIMEOUT,
            store.fetch_actions(user_id)
        ),
        settle(
            "follows",
            PERSONALIZATION_TIMEOUT,
            store.fetch_follows(user_id)
        ),
    );

    Personalization {
        preferences: prefs.value_or_default(),
        actions: actions.value_or_default(),
        follows: follows.value_or_default(),
    }
}
