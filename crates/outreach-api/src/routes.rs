//! Campaign control routes.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use outreach_core::{
    CampaignConfig, CampaignState, ContactRecord, OutcomeLogEntry, PendingPolicy, RunId,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Body of `POST /campaign/start`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    /// Business category to prospect
    #[serde(default)]
    pub category: String,
    /// Locality to search in
    #[serde(default)]
    pub locality: String,
    /// What to do with contacts a previous run left unfinished
    #[serde(default)]
    pub on_pending: Option<PendingPolicy>,
}

/// Answer to `POST /campaign/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    /// Id of the run now in progress
    pub run_id: RunId,
}

/// Answer to `POST /campaign/resume-pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePendingResponse {
    /// Contacts re-admitted into the queue
    pub readmitted: usize,
}

/// Query of `GET /campaign/history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one run
    pub run: Option<String>,
}

/// Builds the control surface router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/campaign/start", post(start))
        .route("/campaign/pause", post(pause))
        .route("/campaign/resume", post(resume))
        .route("/campaign/stop", post(stop))
        .route("/campaign/resume-pending", post(resume_pending))
        .route("/campaign/status", get(status))
        .route("/campaign/contacts", get(contacts))
        .route("/campaign/history", get(history))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>)> {
    let defaults = state.defaults();
    let config = CampaignConfig::new(req.category, req.locality, defaults.message.clone())
        .with_policy(defaults.policy);
    let on_pending = req.on_pending.unwrap_or(defaults.on_pending);

    let campaign = state.campaign(&headers).await;
    let run_id = campaign.start(config, on_pending).await?;
    tracing::info!(account = %campaign.account(), %run_id, "Campaign started");
    Ok((StatusCode::ACCEPTED, Json(StartResponse { run_id })))
}

async fn pause(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<CampaignState>> {
    let campaign = state.campaign(&headers).await;
    campaign.pause()?;
    Ok(Json(campaign.status()))
}

async fn resume(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<CampaignState>> {
    let campaign = state.campaign(&headers).await;
    campaign.resume()?;
    Ok(Json(campaign.status()))
}

async fn stop(State(state): State<AppState>, headers: HeaderMap) -> Json<CampaignState> {
    let campaign = state.campaign(&headers).await;
    campaign.stop();
    Json(campaign.status())
}

async fn resume_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<ResumePendingResponse>)> {
    let campaign = state.campaign(&headers).await;
    let readmitted = campaign.resume_pending().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ResumePendingResponse { readmitted }),
    ))
}

async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<CampaignState> {
    Json(state.campaign(&headers).await.status())
}

async fn contacts(State(state): State<AppState>, headers: HeaderMap) -> Json<Vec<ContactRecord>> {
    Json(state.campaign(&headers).await.contacts())
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<OutcomeLogEntry>>> {
    let run = query
        .run
        .as_deref()
        .map(|id| {
            id.parse::<RunId>()
                .map_err(|e| ApiError::BadRequest(format!("invalid run id '{id}': {e}")))
        })
        .transpose()?;
    let entries = state.campaign(&headers).await.history(run.as_ref()).await?;
    Ok(Json(entries))
}
