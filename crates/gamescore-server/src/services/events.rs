//! Event lifecycle service

use super::access::{AccessService, Action};
use super::caches::PUBLIC_EVENTS_KEY;
use super::live::{self, LiveUpdates};
use super::{storage_error, CacheRegistry};
use crate::storage::Database;
use chrono::Utc;
use gamescore_core::{
    with_cache, CreatedEvent, Event, EventPatch, EventStatus, GameScoreError, GeneratedTokens,
    NewEvent, Result, Scoreboard, StreamMessage, Team,
};
use std::sync::Arc;
use tracing::info;

pub struct EventService {
    db: Arc<Database>,
    caches: Arc<CacheRegistry>,
    access: Arc<AccessService>,
    live: LiveUpdates,
}

impl EventService {
    pub fn new(
        db: Arc<Database>,
        caches: Arc<CacheRegistry>,
        access: Arc<AccessService>,
        live: LiveUpdates,
    ) -> Self {
        Self {
            db,
            caches,
            access,
            live,
        }
    }

    pub async fn create(&self, request: NewEvent) -> Result<CreatedEvent> {
        request.validate()?;

        let now = Utc::now();
        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            status: EventStatus::Active,
            allow_negative: request.allow_negative,
            created_at: now,
            updated_at: now,
        };
        let teams: Vec<Team> = request
            .teams
            .iter()
            .map(|name| Team {
                id: uuid::Uuid::new_v4().to_string(),
                event_id: event.id.clone(),
                name: name.trim().to_string(),
                total_points: 0,
            })
            .collect();
        let tokens = GeneratedTokens::generate();

        self.db
            .create_event(&event, &tokens.hashed, &teams)
            .await
            .map_err(storage_error)?;
        self.caches.events_list.clear();

        info!(
            "Created event {} ({}) with {} teams",
            event.id,
            event.name,
            teams.len()
        );

        let share_links = tokens.plain.share_links();
        Ok(CreatedEvent {
            event,
            teams,
            tokens: tokens.plain,
            share_links,
        })
    }

    pub async fn get(&self, event_id: &str, token: Option<&str>) -> Result<Event> {
        let access = self.access.authorize(event_id, token, Action::View).await?;
        Ok(access.record.event.clone())
    }

    pub async fn update(
        &self,
        event_id: &str,
        token: Option<&str>,
        patch: EventPatch,
    ) -> Result<Event> {
        self.access
            .authorize(event_id, token, Action::EditEvent)
            .await?;
        patch.validate()?;

        let event = self
            .db
            .update_event(event_id, &patch)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| GameScoreError::EventNotFound(event_id.to_string()))?;

        self.caches.invalidate_event(event_id);
        live::publish(
            &self.live,
            event_id,
            &StreamMessage::EventUpdated {
                event: event.clone(),
            },
        );

        info!("Updated event {} (status: {})", event.id, event.status);
        Ok(event)
    }

    /// Active events, newest first
    pub async fn public_events(&self) -> Result<Arc<Vec<Event>>> {
        let events = with_cache(&self.caches.events_list, PUBLIC_EVENTS_KEY, None, || async {
            self.db
                .list_active_events()
                .await
                .map(|events| Some(Arc::new(events)))
                .map_err(storage_error)
        })
        .await?;

        Ok(events.unwrap_or_default())
    }

    /// Scoreboard for the event that owns `token`
    pub async fn scoreboard_by_token(&self, token: &str) -> Result<Arc<Scoreboard>> {
        let record = self.access.resolve_token(token).await?;
        let event_id = record.event.id.as_str();

        let key = CacheRegistry::scoreboard_key(event_id);
        let board = with_cache(&self.caches.scoreboards, &key, None, || async {
            self.db
                .scoreboard(event_id)
                .await
                .map(|board| board.map(Arc::new))
                .map_err(storage_error)
        })
        .await?;

        board.ok_or_else(|| GameScoreError::EventNotFound(event_id.to_string()))
    }
}
