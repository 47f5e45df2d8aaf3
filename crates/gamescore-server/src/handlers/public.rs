//! Public scoreboard handler

use crate::error::ApiResult;
use crate::extractors::ClientIp;
use crate::AppState;
use axum::{
    extract::{OriginalUri, Path, State},
    Json,
};
use gamescore_core::{ApiResponse, Scoreboard};

pub async fn scoreboard(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ClientIp(ip): ClientIp,
    OriginalUri(uri): OriginalUri,
) -> ApiResult<Json<ApiResponse<Scoreboard>>> {
    state.check_rate_limit(&ip, uri.path(), state.config.rate_limit.scoreboard())?;

    let board = state.events.scoreboard_by_token(&token).await?;
    Ok(Json(ApiResponse::ok(board.as_ref().clone())))
}
