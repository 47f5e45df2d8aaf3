//! Event handlers

use crate::error::ApiResult;
use crate::extractors::{AccessToken, ClientIp};
use crate::AppState;
use axum::{
    extract::{OriginalUri, rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use gamescore_core::{ApiResponse, CreatedEvent, Event, EventPatch, NewEvent};

pub async fn create(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CreatedEvent>>)> {
    state.check_rate_limit(&ip, uri.path(), state.config.rate_limit.create_event())?;
    let Json(request) = body?;

    let created = state.events.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

pub async fn list_public(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Event>>>> {
    let events = state.events.public_events().await?;
    Ok(Json(ApiResponse::ok(events.as_ref().clone())))
}

pub async fn get(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    token: AccessToken,
) -> ApiResult<Json<ApiResponse<Event>>> {
    let event = state.events.get(&event_id, token.as_deref()).await?;
    Ok(Json(ApiResponse::ok(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    token: AccessToken,
    body: Result<Json<EventPatch>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Event>>> {
    let Json(patch) = body?;
    let event = state
        .events
        .update(&event_id, token.as_deref(), patch)
        .await?;
    Ok(Json(ApiResponse::ok(event)))
}
