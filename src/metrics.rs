use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and register scanner series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
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
        describe_counter!("scanner_fetch_total", "Adapter fetches attempted, per source.");
        describe_counter!(
            "scanner_fetch_errors_total",
            "Adapter fetches that failed (network, status or parse)."
        );
        describe_counter!("scanner_items_total", "Raw items returned by adapters.");
        describe_counter!("scanner_leads_total", "New leads persisted.");
        describe_counter!(
            "scanner_duplicates_total",
            "Matched items skipped because the store already had them."
        );
        describe_counter!(
            "scanner_store_errors_total",
            "Store failures that put a scan loop into degraded mode."
        );
        describe_counter!("scanner_notify_errors_total", "Webhook posts that failed.");
        describe_histogram!("scanner_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_gauge!("scanner_running", "1 while a source's scan loop is active.");
        describe_gauge!(
            "scanner_last_cycle_ts",
            "Unix ts when a source last finished a scan cycle."
        );
    });
}
