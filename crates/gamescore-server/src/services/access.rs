//! Token-based access to a single event

use super::{storage_error, CacheRegistry};
use crate::storage::{Database, EventRecord};
use gamescore_core::{
    tokens, with_cache, GameScoreError, Result, TokenPermissions, TokenRole,
};
use std::sync::Arc;
use tracing::debug;

/// A request that passed the token check for an event
#[derive(Debug, Clone)]
pub struct Authorized {
    pub record: Arc<EventRecord>,
    pub role: TokenRole,
}

/// Something a token must be allowed to do
#[derive(Debug, Clone, Copy)]
pub enum Action {
    View,
    SubmitScores,
    EditEvent,
}

impl Action {
    fn allowed(self, permissions: &TokenPermissions) -> bool {
        match self {
            Action::View => permissions.can_view_scoreboard,
            Action::SubmitScores => permissions.can_submit_scores,
            Action::EditEvent => permissions.can_edit_event,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Action::View => "view this event",
            Action::SubmitScores => "submit scores",
            Action::EditEvent => "edit this event",
        }
    }
}

pub struct AccessService {
    db: Arc<Database>,
    caches: Arc<CacheRegistry>,
}

impl AccessService {
    pub fn new(db: Arc<Database>, caches: Arc<CacheRegistry>) -> Self {
        Self { db, caches }
    }

    /// Event record by id, read through the event detail cache
    pub async fn event_record(&self, event_id: &str) -> Result<Arc<EventRecord>> {
        let key = CacheRegistry::event_key(event_id);
        let record = with_cache(&self.caches.event_details, &key, None, || async {
            self.db
                .get_event(event_id)
                .await
                .map(|record| record.map(Arc::new))
                .map_err(storage_error)
        })
        .await?;

        record.ok_or_else(|| GameScoreError::EventNotFound(event_id.to_string()))
    }

    /// Check that `token` grants `action` on `event_id`.
    ///
    /// A missing or foreign token is `InvalidToken`; a valid token whose role
    /// lacks the permission is `PermissionDenied`.
    pub async fn authorize(
        &self,
        event_id: &str,
        token: Option<&str>,
        action: Action,
    ) -> Result<Authorized> {
        let token = token
            .filter(|t| tokens::is_valid_token_format(t))
            .ok_or(GameScoreError::InvalidToken)?;

        let record = self.event_record(event_id).await?;
        let role = record
            .tokens
            .role_for(token)
            .ok_or(GameScoreError::InvalidToken)?;

        if !action.allowed(&role.permissions()) {
            debug!("{} token denied: {}", role, action.describe());
            return Err(GameScoreError::PermissionDenied(action.describe().to_string()));
        }

        Ok(Authorized { record, role })
    }

    /// Event owning `token`, whichever role it carries
    pub async fn resolve_token(&self, token: &str) -> Result<Arc<EventRecord>> {
        if !tokens::is_valid_token_format(token) {
            return Err(GameScoreError::EventNotFound(token.to_string()));
        }

        let record = self
            .db
            .find_event_by_token_hash(&tokens::hash_token(token))
            .await
            .map_err(storage_error)?;

        record
            .map(Arc::new)
            .ok_or_else(|| GameScoreError::EventNotFound(token.to_string()))
    }
}
