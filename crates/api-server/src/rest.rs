//! REST API handlers for campaign dispatch, tracking hits, and unsubscribe.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect};
use axum::Json;
use mailpress_core::error::DispatchError;
use mailpress_core::types::{Campaign, DispatchSummary};
use mailpress_delivery::events::{self, EngagementEvent, EngagementKind};
use mailpress_engine::Dispatcher;
use mailpress_store::{CampaignStore, MemoryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use uuid::Uuid;

/// Transparent 1x1 GIF served for open-tracking hits.
const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub dispatcher: Arc<Dispatcher>,
    /// Public base URL embedded in tracking and unsubscribe links.
    pub base_url: String,
    pub start_time: Instant,
}

fn error_status(error: &DispatchError) -> StatusCode {
    match error {
        DispatchError::NotFound => StatusCode::NOT_FOUND,
        DispatchError::InvalidState => StatusCode::CONFLICT,
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /api/campaigns/:id/dispatch — trigger a campaign send.
pub async fn dispatch_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DispatchSummary>, (StatusCode, Json<ErrorResponse>)> {
    match state.dispatcher.dispatch_campaign(id, &state.base_url).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            let status = error_status(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(campaign_id = %id, error = %e, "Campaign dispatch failed");
            } else {
                warn!(campaign_id = %id, error = %e, "Campaign dispatch rejected");
                metrics::counter!("api.validation_errors").increment(1);
            }
            Err((
                status,
                Json(ErrorResponse {
                    error: "dispatch_failed".to_string(),
                    message: e.to_string(),
                }),
            ))
        }
    }
}

/// GET /api/campaigns — list campaigns, newest first.
pub async fn list_campaigns(State(state): State<AppState>) -> Json<Vec<Campaign>> {
    Json(state.store.list_campaigns())
}

/// GET /api/campaigns/:id
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.get_campaign(id).await {
        Ok(Some(campaign)) => Ok(Json(campaign)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "not_found".to_string(),
                message: format!("campaign {} not found", id),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "store_error".to_string(),
                message: e.to_string(),
            }),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeParams {
    pub email: String,
    pub campaign: Uuid,
}

/// GET /unsubscribe — the deep link embedded in every footer.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Query(params): Query<UnsubscribeParams>,
) -> Html<&'static str> {
    metrics::counter!("unsubscribe.requests").increment(1);
    if state.store.mark_unsubscribed(params.campaign, &params.email) {
        Html("<p>You have been unsubscribed. You will not receive further emails from this list.</p>")
    } else {
        Html("<p>This address is already unsubscribed or was not found on this list.</p>")
    }
}

#[derive(Debug, Deserialize)]
pub struct TrackParams {
    pub campaign: Uuid,
    pub contact: Uuid,
}

/// GET /track/open — 1x1 pixel; folds an open into the campaign stats.
pub async fn track_open(
    State(state): State<AppState>,
    Query(params): Query<TrackParams>,
) -> impl IntoResponse {
    metrics::counter!("tracking.opens").increment(1);
    record_engagement(&state, params.campaign, params.contact, EngagementKind::Open).await;
    ([(header::CONTENT_TYPE, "image/gif")], PIXEL_GIF)
}

#[derive(Debug, Deserialize)]
pub struct ClickParams {
    pub campaign: Uuid,
    pub contact: Uuid,
    pub url: String,
}

/// GET /track/click — folds a click into the stats and redirects to the
/// original target.
pub async fn track_click(
    State(state): State<AppState>,
    Query(params): Query<ClickParams>,
) -> Result<Redirect, StatusCode> {
    if params.url.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    metrics::counter!("tracking.clicks").increment(1);
    record_engagement(&state, params.campaign, params.contact, EngagementKind::Click).await;
    Ok(Redirect::temporary(&params.url))
}

async fn record_engagement(state: &AppState, campaign_id: Uuid, contact_id: Uuid, kind: EngagementKind) {
    let email = match state.store.get_campaign(campaign_id).await {
        Ok(Some(campaign)) => campaign
            .recipients
            .iter()
            .find(|c| c.id == contact_id)
            .map(|c| c.email.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let event = EngagementEvent {
        campaign_id,
        email,
        kind,
    };
    state
        .store
        .update_stats(campaign_id, |stats| events::apply_event(stats, &event));
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}
