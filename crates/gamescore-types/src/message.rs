//! Live update messages pushed over the event stream

use crate::{Event, GameScore};
use serde::{Deserialize, Serialize};

/// Server -> browser messages on an event's update channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Connected { event_id: String },
    ScoreAdded { score: GameScore },
    EventUpdated { event: Event },
}
