//! Business logic services

pub mod access;
pub mod caches;
pub mod events;
pub mod live;
pub mod scores;

pub use access::AccessService;
pub use caches::CacheRegistry;
pub use events::EventService;
pub use live::LiveUpdates;
pub use scores::ScoreService;

use gamescore_core::GameScoreError;

pub(crate) fn storage_error(e: anyhow::Error) -> GameScoreError {
    GameScoreError::Storage(format!("{:#}", e))
}
