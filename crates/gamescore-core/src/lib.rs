//! GameScore Core Library
//!
//! In-process building blocks used by the GameScore server: the TTL cache for
//! read-heavy queries, the channel broadcaster behind live event streams, the
//! per-client rate limiter and event access tokens.

// Re-export pure types from gamescore-types
pub use gamescore_types::*;

pub mod broadcast;
pub mod cache;
pub mod error;
pub mod rate_limit;
pub mod tokens;

pub use broadcast::{ChannelBroadcaster, DeliveryError, Subscription};
pub use cache::{with_cache, CacheStats, TtlCache};
pub use error::{GameScoreError, Result};
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter};
pub use tokens::{EventTokenHashes, GeneratedTokens};
