// src/api.rs
//! HTTP control surface: scanner lifecycle, lead views, pitch/email actions, logs.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::SettingsProvider;
use crate::error::{ControlError, StoreError};
use crate::lead::{Lead, LeadSource, LeadStatus};
use crate::log_sink::{LogEntry, LogSink};
use crate::notify::Mailer;
use crate::pitch::PitchGenerator;
use crate::scanner::{ScannerController, ScannerState};
use crate::store::{LeadFilter, LeadStore};

const DEFAULT_RECENT_HOURS: i64 = 24;
const MAX_RECENT_HOURS: i64 = 24 * 365 * 10;
const DEFAULT_LOG_LINES: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ScannerController>,
    pub store: Arc<dyn LeadStore>,
    pub settings: Arc<dyn SettingsProvider>,
    pub logs: Arc<LogSink>,
    pub pitch: PitchGenerator,
    pub mailer: Mailer,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/scanners", get(list_scanners))
        .route("/scanners/{source}/start", post(start_scanner))
        .route("/scanners/{source}/stop", post(stop_scanner))
        .route("/leads", get(recent_leads))
        .route("/leads/archive", get(archive_leads))
        .route("/leads/{id}/pitch", post(generate_pitch))
        .route("/leads/{id}/status", post(set_status))
        .route("/leads/{id}/email", post(send_email))
        .route("/pitch", post(draft_pitch))
        .route("/logs", get(tail_logs))
        .route("/ai/health", get(ai_health))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body: `{"error": "..."}` with a status derived from the failure kind.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<ControlError> for ApiError {
    fn from(e: ControlError) -> Self {
        let status = match &e {
            ControlError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ControlError::MissingConfig { .. } | ControlError::Settings(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ControlError::UnknownSource(_) => StatusCode::NOT_FOUND,
        };
        Self::new(status, e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Duplicate(_) | StoreError::PitchAlreadySet(_) => StatusCode::CONFLICT,
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, e.to_string())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_source(raw: &str) -> Result<LeadSource, ApiError> {
    raw.parse()
        .map_err(|e: anyhow::Error| ApiError::new(StatusCode::NOT_FOUND, e.to_string()))
}

fn parse_status(raw: Option<&str>) -> Result<Option<LeadStatus>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some("all") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: anyhow::Error| ApiError::bad_request(e.to_string())),
    }
}

// ---- scanners ----

#[derive(Serialize)]
struct ScannerOut {
    source: LeadSource,
    state: ScannerState,
}

async fn list_scanners(State(state): State<AppState>) -> Json<Vec<ScannerOut>> {
    Json(
        state
            .controller
            .states()
            .into_iter()
            .map(|(source, state)| ScannerOut { source, state })
            .collect(),
    )
}

async fn start_scanner(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> ApiResult<ScannerOut> {
    let source = parse_source(&source)?;
    let next = state.controller.start(source)?;
    Ok(Json(ScannerOut {
        source,
        state: next,
    }))
}

async fn stop_scanner(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> ApiResult<ScannerOut> {
    let source = parse_source(&source)?;
    let next = state.controller.stop(source);
    Ok(Json(ScannerOut {
        source,
        state: next,
    }))
}

// ---- leads ----

#[derive(Deserialize, Default)]
struct RecentQuery {
    status: Option<String>,
    hours: Option<i64>,
}

async fn recent_leads(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> ApiResult<Vec<Lead>> {
    // the recent view defaults to unworked leads
    let status = match q.status.as_deref() {
        None => Some(LeadStatus::New),
        raw => parse_status(raw)?,
    };
    let hours = q.hours.unwrap_or(DEFAULT_RECENT_HOURS).clamp(0, MAX_RECENT_HOURS);
    let since = Utc::now() - Duration::hours(hours);
    Ok(Json(state.store.recent(status, since).await?))
}

#[derive(Deserialize, Default)]
struct ArchiveQuery {
    status: Option<String>,
    source: Option<String>,
    tag: Option<String>,
}

async fn archive_leads(
    State(state): State<AppState>,
    Query(q): Query<ArchiveQuery>,
) -> ApiResult<Vec<Lead>> {
    let source = match q.source.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        Some(s) => Some(
            s.parse::<LeadSource>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?,
        ),
        None => None,
    };
    let filter = LeadFilter {
        status: parse_status(q.status.as_deref())?,
        source,
        tag: q
            .tag
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && t != "all"),
    };
    Ok(Json(state.store.archive(&filter).await?))
}

async fn generate_pitch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Lead> {
    let lead = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;
    if lead.generated_pitch().is_some() {
        return Ok(Json(lead));
    }

    let settings = state
        .settings
        .load()
        .map_err(|e| ApiError::from(ControlError::Settings(e)))?;
    // a failed call leaves the lead untouched so it can be retried
    let pitch = state
        .pitch
        .generate(&settings.ai, lead.title(), lead.content(), lead.source())
        .await
        .map_err(|msg| {
            state.logs.warn(lead.source(), format!("pitch failed for {id}: {msg}"));
            ApiError::new(StatusCode::BAD_GATEWAY, msg)
        })?;

    let mut lead = match state.store.set_pitch(&id, pitch).await {
        Ok(lead) => lead,
        Err(StoreError::PitchAlreadySet(_)) => state
            .store
            .get(&id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?,
        Err(e) => return Err(e.into()),
    };
    if lead.status() == LeadStatus::New {
        lead = state.store.update_status(&id, LeadStatus::Pitched).await?;
    }
    tracing::info!(target: "outreach", id = %id, "pitch generated");
    Ok(Json(lead))
}

#[derive(Deserialize)]
struct DraftReq {
    #[serde(default)]
    title: String,
    content: String,
    source: String,
    /// Overrides the configured demo link for this draft only.
    #[serde(default)]
    loom_link: Option<String>,
}

#[derive(Serialize)]
struct DraftOut {
    pitch: String,
}

/// Draft a DM for pasted post text. Nothing is stored.
async fn draft_pitch(
    State(state): State<AppState>,
    Json(req): Json<DraftReq>,
) -> ApiResult<DraftOut> {
    let source: LeadSource = req
        .source
        .parse()
        .map_err(|e: anyhow::Error| ApiError::bad_request(e.to_string()))?;
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("missing lead data"));
    }
    let mut ai = state
        .settings
        .load()
        .map_err(|e| ApiError::from(ControlError::Settings(e)))?
        .ai;
    if let Some(link) = req.loom_link {
        ai.loom_link = link;
    }
    let pitch = state
        .pitch
        .generate(&ai, req.title.trim(), req.content.trim(), source)
        .await
        .map_err(|msg| ApiError::new(StatusCode::BAD_GATEWAY, msg))?;
    Ok(Json(DraftOut { pitch }))
}

#[derive(Deserialize)]
struct StatusReq {
    status: String,
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusReq>,
) -> ApiResult<Lead> {
    let status: LeadStatus = body
        .status
        .parse()
        .map_err(|e: anyhow::Error| ApiError::bad_request(e.to_string()))?;
    Ok(Json(state.store.update_status(&id, status).await?))
}

#[derive(Deserialize)]
struct EmailReq {
    to: String,
    subject: String,
    body: String,
}

#[derive(Serialize)]
struct EmailOut {
    sent: bool,
    message: String,
}

async fn send_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EmailReq>,
) -> ApiResult<EmailOut> {
    let lead = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;
    let settings = state
        .settings
        .load()
        .map_err(|e| ApiError::from(ControlError::Settings(e)))?;

    let out = match state
        .mailer
        .send(&settings.smtp, &req.to, &req.subject, &req.body)
        .await
    {
        Ok(()) => {
            state
                .logs
                .info(lead.source(), format!("email sent to {} for {id}", req.to.trim()));
            EmailOut {
                sent: true,
                message: format!("Email sent to {}", req.to.trim()),
            }
        }
        Err(e) => {
            tracing::warn!(target: "outreach", id = %id, error = %format!("{e:#}"), "email failed");
            state
                .logs
                .warn(lead.source(), format!("email failed for {id}: {e:#}"));
            EmailOut {
                sent: false,
                message: format!("Failed to send email: {e:#}"),
            }
        }
    };
    Ok(Json(out))
}

// ---- logs & ai ----

#[derive(Deserialize, Default)]
struct LogsQuery {
    n: Option<usize>,
}

async fn tail_logs(State(state): State<AppState>, Query(q): Query<LogsQuery>) -> Json<Vec<LogEntry>> {
    Json(state.logs.snapshot_last_n(q.n.unwrap_or(DEFAULT_LOG_LINES)))
}

#[derive(Serialize)]
struct AiHealthOut {
    online: bool,
    model: String,
}

async fn ai_health(State(state): State<AppState>) -> ApiResult<AiHealthOut> {
    let settings = state
        .settings
        .load()
        .map_err(|e| ApiError::from(ControlError::Settings(e)))?;
    let online = state.pitch.probe(&settings.ai).await;
    Ok(Json(AiHealthOut {
        online,
        model: settings.ai.model,
    }))
}
