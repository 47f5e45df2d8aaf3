//! Read caches shared by the event and score services

use crate::config::CacheSettings;
use crate::storage::EventRecord;
use gamescore_core::{CacheStats, Event, Scoreboard, TtlCache};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const PUBLIC_EVENTS_KEY: &str = "public";

pub struct CacheRegistry {
    pub events_list: TtlCache<Arc<Vec<Event>>>,
    pub event_details: TtlCache<Arc<EventRecord>>,
    pub scoreboards: TtlCache<Arc<Scoreboard>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheRegistryStats {
    pub events_list: CacheStats,
    pub event_details: CacheStats,
    pub scoreboards: CacheStats,
}

impl CacheRegistry {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            events_list: TtlCache::new(
                settings.events_list_size,
                Duration::from_secs(settings.events_list_ttl_secs),
            ),
            event_details: TtlCache::new(
                settings.event_detail_size,
                Duration::from_secs(settings.event_detail_ttl_secs),
            ),
            scoreboards: TtlCache::new(
                settings.scoreboard_size,
                Duration::from_secs(settings.scoreboard_ttl_secs),
            ),
        }
    }

    pub fn event_key(event_id: &str) -> String {
        format!("event:{}", event_id)
    }

    pub fn scoreboard_key(event_id: &str) -> String {
        format!("scoreboard:{}", event_id)
    }

    /// Drop every cached view that can contain `event_id`
    pub fn invalidate_event(&self, event_id: &str) {
        self.event_details.delete(&Self::event_key(event_id));
        let boards = self.scoreboards.invalidate_pattern(event_id);
        self.events_list.clear();
        debug!(
            "Invalidated caches for event {} ({} scoreboard entries)",
            event_id, boards
        );
    }

    pub fn stats(&self) -> CacheRegistryStats {
        CacheRegistryStats {
            events_list: self.events_list.stats(),
            event_details: self.event_details.stats(),
            scoreboards: self.scoreboards.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::Utc;
    use gamescore_core::{EventStatus, GeneratedTokens};

    fn event(id: &str) -> Event {
        Event {
            id: id.to_string(),
            name: "Games".to_string(),
            status: EventStatus::Active,
            allow_negative: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_invalidate_event_only_touches_that_event() {
        let caches = CacheRegistry::new(&Config::default().cache);
        let record = |id: &str| {
            Arc::new(EventRecord {
                event: event(id),
                tokens: GeneratedTokens::generate().hashed,
            })
        };

        caches
            .event_details
            .set(CacheRegistry::event_key("evt-1"), record("evt-1"), None);
        caches
            .event_details
            .set(CacheRegistry::event_key("evt-2"), record("evt-2"), None);
        caches.scoreboards.set(
            CacheRegistry::scoreboard_key("evt-1"),
            Arc::new(Scoreboard::new(event("evt-1"), vec![], vec![])),
            None,
        );
        caches.scoreboards.set(
            CacheRegistry::scoreboard_key("evt-2"),
            Arc::new(Scoreboard::new(event("evt-2"), vec![], vec![])),
            None,
        );
        caches
            .events_list
            .set(PUBLIC_EVENTS_KEY, Arc::new(vec![event("evt-1")]), None);

        caches.invalidate_event("evt-1");

        assert!(caches.event_details.get(&CacheRegistry::event_key("evt-1")).is_none());
        assert!(caches.event_details.get(&CacheRegistry::event_key("evt-2")).is_some());
        assert!(caches.scoreboards.get(&CacheRegistry::scoreboard_key("evt-1")).is_none());
        assert!(caches.scoreboards.get(&CacheRegistry::scoreboard_key("evt-2")).is_some());
        assert!(caches.events_list.is_empty());
    }
}
