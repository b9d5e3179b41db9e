use axum::{routing::get, Router};
use ::metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and describe the feed series.
    pub fn init() -> Self {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");
        ensure_metrics_described();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_requests_total", "Ranking requests served.");
        describe_counter!("feed_candidates_total", "Candidates fetched from storage.");
        describe_counter!("feed_kept_total", "Candidates surviving scoring and dedup.");
        describe_counter!("feed_hidden_total", "Candidates vetoed by hide actions.");
        describe_counter!("feed_store_errors_total", "Hard storage failures.");
        describe_counter!(
            "feed_unprovisioned_total",
            "Requests served empty because the backing store is not provisioned."
        );
        describe_histogram!("feed_rank_ms", "Full ranking pass time in milliseconds.");
    });
}

pub fn record_rank_pass(candidates: usize, kept: usize, hidden: usize, elapsed_ms: u64) {
    counter!("feed_requests_total").increment(1);
    counter!("feed_candidates_total").increment(candidates as u64);
    counter!("feed_kept_total").increment(kept as u64);
    counter!("feed_hidden_total").increment(hidden as u64);
    histogram!("feed_rank_ms").record(elapsed_ms as f64);
}
