// src/scanner/stream_loop.rs
use std::sync::Arc;

use metrics::counter;
use tokio_util::sync::CancellationToken;

use super::pipeline::process_item;
use super::{sleep_or_cancel, wait_for_store, ScanContext, ScannerState, StateCell};
use crate::config::Settings;
use crate::sources::discord::ChatStream;

/// Loop for a push source: connect, consume messages inline, reconnect when
/// the connection drops. Settings are re-read once per connection attempt.
/// Returns once `token` is cancelled.
pub(crate) async fn run_stream_loop(
    ctx: Arc<ScanContext>,
    stream: Arc<dyn ChatStream>,
    token: CancellationToken,
    state: StateCell,
    initial: Settings,
) {
    let source = stream.source();
    let mut settings = initial;

    'connect: while !token.is_cancelled() {
        state.advance(ScannerState::Starting);

        let connected = tokio::select! {
            biased;
            _ = token.cancelled() => break 'connect,
            res = stream.connect(&settings) => res,
        };
        let mut conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(target: "scanner", %source, error = %format!("{e:#}"), "connect failed");
                ctx.logs.warn(source, format!("connect failed: {e:#}"));
                if !sleep_or_cancel(&token, settings.general.poll_interval()).await {
                    break 'connect;
                }
                settings = ctx.reload(source, settings);
                continue 'connect;
            }
        };

        state.advance(ScannerState::Running);
        ctx.logs.info(source, "connected; listening for messages");
        let keywords = stream.keywords(&settings);

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    conn.close().await;
                    break 'connect;
                }
                next = conn.next_item() => next,
            };

            match next {
                Some(Ok(item)) => {
                    if let Err(e) = process_item(&ctx, &settings, source, &keywords, item).await {
                        counter!("scanner_store_errors_total", "source" => source.as_str())
                            .increment(1);
                        tracing::error!(target: "scanner", %source, error = %e, "store failure; closing connection until store returns");
                        ctx.logs.error(source, format!("store failure: {e}"));
                        conn.close().await;
                        if !wait_for_store(&ctx, source, &token, settings.general.store_retry()).await {
                            break 'connect;
                        }
                        settings = ctx.reload(source, settings);
                        continue 'connect;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(target: "scanner", %source, error = %format!("{e:#}"), "bad gateway event");
                    ctx.logs.warn(source, format!("bad event: {e:#}"));
                }
                None => {
                    tracing::info!(target: "scanner", %source, "connection closed; reconnecting");
                    ctx.logs.warn(source, "connection closed; reconnecting");
                    break;
                }
            }
        }

        if !sleep_or_cancel(&token, settings.general.throttle()).await {
            break 'connect;
        }
        settings = ctx.reload(source, settings);
    }

    tracing::info!(target: "scanner", %source, "scanner disarmed");
    ctx.logs.info(source, "scanner disarmed");
}
