//! Score handlers

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AccessToken, ClientIp};
use crate::AppState;
use axum::{
    extract::{OriginalUri, rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gamescore_core::{ApiResponse, GameScore, ScoreRequest};

pub async fn list(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    token: AccessToken,
) -> ApiResult<Json<ApiResponse<Vec<GameScore>>>> {
    let scores = state.scores.list(&event_id, token.as_deref()).await?;
    Ok(Json(ApiResponse::ok(scores)))
}

/// Single scores answer with the stored score. Batches answer with
/// `{ results, errors }` and 207 when any item failed.
pub async fn submit(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    ClientIp(ip): ClientIp,
    OriginalUri(uri): OriginalUri,
    token: AccessToken,
    body: Result<Json<ScoreRequest>, JsonRejection>,
) -> ApiResult<Response> {
    state.check_rate_limit(&ip, uri.path(), state.config.rate_limit.scores())?;
    let Json(request) = body?;
    let is_batch = request.is_batch();

    let outcome = state
        .scores
        .submit(&event_id, token.as_deref(), request)
        .await?;

    if !is_batch {
        let score = outcome
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("score was not stored".to_string()))?;
        return Ok((StatusCode::CREATED, Json(ApiResponse::ok(score))).into_response());
    }

    if outcome.errors.is_empty() {
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(outcome))).into_response())
    } else {
        Ok((StatusCode::MULTI_STATUS, Json(ApiResponse::partial(outcome))).into_response())
    }
}
