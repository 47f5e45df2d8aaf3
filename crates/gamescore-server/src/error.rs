//! HTTP error responses

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gamescore_core::{GameScoreError, RateLimitDecision};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    RateLimited {
        message: String,
        decision: RateLimitDecision,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn rate_limited(decision: RateLimitDecision) -> Self {
        ApiError::RateLimited {
            message: "Too many requests, please try again later".to_string(),
            decision,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::RateLimited { message, decision } => {
                let retry_after = decision.retry_after_secs();
                let body = Json(json!({
                    "success": false,
                    "error": message,
                    "retryAfter": retry_after,
                }));

                let mut response = (status, body).into_response();
                let headers = response.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                if let Ok(reset) = HeaderValue::from_str(&decision.reset_at.to_rfc3339()) {
                    headers.insert("X-RateLimit-Reset", reset);
                }
                response
            }
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                let body = Json(json!({
                    "success": false,
                    "error": "Internal server error",
                }));
                (status, body).into_response()
            }
            other => {
                let body = Json(json!({
                    "success": false,
                    "error": other.to_string(),
                }));
                (status, body).into_response()
            }
        }
    }
}

impl From<GameScoreError> for ApiError {
    fn from(e: GameScoreError) -> Self {
        match e {
            GameScoreError::Validation(v) => ApiError::BadRequest(v.to_string()),
            GameScoreError::NegativePointsNotAllowed => ApiError::BadRequest(e.to_string()),
            GameScoreError::EventInactive(_) => ApiError::BadRequest(e.to_string()),
            GameScoreError::TeamNotFound(_) => ApiError::BadRequest(e.to_string()),
            GameScoreError::EventNotFound(_) => ApiError::NotFound("Event not found".to_string()),
            GameScoreError::InvalidToken => {
                ApiError::Unauthorized("Invalid or missing token".to_string())
            }
            GameScoreError::PermissionDenied(_) => ApiError::Forbidden(e.to_string()),
            GameScoreError::Storage(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(format!("{:#}", e))
    }
}
