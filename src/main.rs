//! Lead scanner binary entrypoint.
//! Loads settings, opens the lead store, arms autostart sources and serves the
//! control API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lead_scanner::config::{FileSettings, SettingsProvider};
use lead_scanner::log_sink::LogSink;
use lead_scanner::metrics::Metrics;
use lead_scanner::notify::{Mailer, WebhookNotifier};
use lead_scanner::pitch::PitchGenerator;
use lead_scanner::sources::{discord::DiscordGateway, http_client, polling_adapters};
use lead_scanner::store::{JsonFileStore, LeadStore};
use lead_scanner::{AppState, ScanContext, ScannerController};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lead_scanner=info,scanner=info,outreach=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let provider = Arc::new(FileSettings::from_env());
    let settings = provider
        .load()
        .with_context(|| format!("load settings from {}", provider.path().display()))?;

    let store: Arc<dyn LeadStore> = Arc::new(
        JsonFileStore::open(settings.general.store_path.clone())
            .await
            .with_context(|| format!("open lead store {}", settings.general.store_path.display()))?,
    );

    let metrics = Metrics::init()?;
    let logs = Arc::new(LogSink::with_capacity(settings.general.log_capacity));
    let client = http_client()?;

    let ctx = Arc::new(ScanContext {
        store: store.clone(),
        notifier: Arc::new(WebhookNotifier::new(client.clone())),
        settings: provider.clone(),
        logs: logs.clone(),
    });
    let controller = Arc::new(
        ScannerController::new(ctx)
            .with_adapters(polling_adapters(client.clone()))
            .with_stream(Arc::new(DiscordGateway)),
    );

    for source in &settings.general.autostart {
        match controller.start(*source) {
            Ok(state) => tracing::info!(target: "scanner", %source, ?state, "autostart"),
            Err(e) => {
                tracing::warn!(target: "scanner", %source, error = %e, "autostart failed");
                logs.warn(*source, format!("autostart failed: {e}"));
            }
        }
    }

    let state = AppState {
        controller: controller.clone(),
        store,
        settings: provider,
        logs,
        pitch: PitchGenerator::new(client),
        mailer: Mailer::new(),
    };
    let app = lead_scanner::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&settings.general.bind)
        .await
        .with_context(|| format!("bind {}", settings.general.bind))?;
    tracing::info!(target: "scanner", addr = %settings.general.bind, "control API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!(target: "scanner", "shutdown requested");
        })
        .await
        .context("serve control API")?;

    controller.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}
