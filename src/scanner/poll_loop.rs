// src/scanner/poll_loop.rs
use std::sync::Arc;

use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;

use super::pipeline::{process_item, Outcome};
use super::{sleep_or_cancel, wait_for_store, ScanContext};
use crate::config::Settings;
use crate::error::StoreError;
use crate::lead::RawItem;
use crate::sources::SourceAdapter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub targets: usize,
    pub fetched: usize,
    pub created: usize,
    pub duplicates: usize,
}

/// Long-running loop for one polling source. Settings are re-read between
/// cycles. Returns once `token` is cancelled.
pub(crate) async fn run_poll_loop(
    ctx: Arc<ScanContext>,
    adapter: Arc<dyn SourceAdapter>,
    token: CancellationToken,
    initial: Settings,
) {
    let source = adapter.source();
    let mut settings = initial;
    ctx.logs.info(source, "scanner armed");

    while !token.is_cancelled() {
        match scan_cycle(&ctx, adapter.as_ref(), &settings, &token).await {
            Ok(stats) => {
                gauge!("scanner_last_cycle_ts", "source" => source.as_str())
                    .set(chrono::Utc::now().timestamp() as f64);
                tracing::info!(
                    target: "scanner",
                    %source,
                    targets = stats.targets,
                    fetched = stats.fetched,
                    created = stats.created,
                    duplicates = stats.duplicates,
                    "scan cycle finished"
                );
            }
            Err(e) => {
                counter!("scanner_store_errors_total", "source" => source.as_str()).increment(1);
                tracing::error!(target: "scanner", %source, error = %e, "store failure; waiting for store");
                ctx.logs.error(source, format!("store failure: {e}"));
                if !wait_for_store(&ctx, source, &token, settings.general.store_retry()).await {
                    break;
                }
                settings = ctx.reload(source, settings);
                continue;
            }
        }

        if !sleep_or_cancel(&token, settings.general.poll_interval()).await {
            break;
        }
        settings = ctx.reload(source, settings);
    }

    tracing::info!(target: "scanner", %source, "scanner disarmed");
    ctx.logs.info(source, "scanner disarmed");
}

/// One pass over every configured target.
pub(crate) async fn scan_cycle(
    ctx: &ScanContext,
    adapter: &dyn SourceAdapter,
    settings: &Settings,
    token: &CancellationToken,
) -> Result<CycleStats, StoreError> {
    let source = adapter.source();
    let keywords = adapter.keywords(settings);
    let mut stats = CycleStats::default();

    for (i, target) in adapter.targets(settings).iter().enumerate() {
        if i > 0 && !sleep_or_cancel(token, settings.general.throttle()).await {
            break;
        }
        if token.is_cancelled() {
            break;
        }
        stats.targets += 1;

        let items = fetch_or_empty(ctx, adapter, settings, target).await;
        stats.fetched += items.len();
        for item in items {
            match process_item(ctx, settings, source, &keywords, item).await? {
                Outcome::Created(_) => stats.created += 1,
                Outcome::AlreadySeen => stats.duplicates += 1,
                Outcome::NoMatch => {}
            }
        }
    }
    Ok(stats)
}

/// A failed fetch counts as an empty page.
async fn fetch_or_empty(
    ctx: &ScanContext,
    adapter: &dyn SourceAdapter,
    settings: &Settings,
    target: &str,
) -> Vec<RawItem> {
    let source = adapter.source();
    counter!("scanner_fetch_total", "source" => source.as_str()).increment(1);
    match adapter.fetch(settings, target).await {
        Ok(items) => {
            counter!("scanner_items_total", "source" => source.as_str())
                .increment(items.len() as u64);
            items
        }
        Err(e) => {
            counter!("scanner_fetch_errors_total", "source" => source.as_str()).increment(1);
            tracing::warn!(target: "scanner", %source, %target, error = %format!("{e:#}"), "fetch failed");
            ctx.logs
                .warn(source, format!("fetch failed for {target}: {e:#}"));
            Vec::new()
        }
    }
}

/// Run a single cycle outside the controller (manual scans, tests).
pub async fn scan_once(
    ctx: &ScanContext,
    adapter: &dyn SourceAdapter,
    settings: &Settings,
) -> Result<CycleStats, StoreError> {
    scan_cycle(ctx, adapter, settings, &CancellationToken::new()).await
}
