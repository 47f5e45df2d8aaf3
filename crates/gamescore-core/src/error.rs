//! Error types for GameScore

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameScoreError>;

#[derive(Error, Debug)]
pub enum GameScoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] gamescore_types::ValidationError),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Team not found: {0}")]
    TeamNotFound(String),

    #[error("Event is not active: {0}")]
    EventInactive(String),

    #[error("Negative points are not allowed for this event")]
    NegativePointsNotAllowed,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
