//! Score submission service

use super::access::{AccessService, Action};
use super::live::{self, LiveUpdates};
use super::{storage_error, CacheRegistry};
use crate::storage::Database;
use gamescore_core::{
    Event, GameScore, GameScoreError, Result, ScoreBatchResult, ScoreFailure, ScoreRequest,
    ScoreSubmission, StreamMessage,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ScoreService {
    db: Arc<Database>,
    caches: Arc<CacheRegistry>,
    access: Arc<AccessService>,
    live: LiveUpdates,
}

impl ScoreService {
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

    pub async fn list(&self, event_id: &str, token: Option<&str>) -> Result<Vec<GameScore>> {
        self.access.authorize(event_id, token, Action::View).await?;
        self.db.list_scores(event_id).await.map_err(storage_error)
    }

    /// Store one score or a batch.
    ///
    /// A single score fails the whole request on error. In a batch, each
    /// failing item is reported in `errors` while the others are kept.
    pub async fn submit(
        &self,
        event_id: &str,
        token: Option<&str>,
        request: ScoreRequest,
    ) -> Result<ScoreBatchResult> {
        let access = self
            .access
            .authorize(event_id, token, Action::SubmitScores)
            .await?;
        let event = &access.record.event;
        if !event.is_active() {
            return Err(GameScoreError::EventInactive(event.id.clone()));
        }

        let is_batch = request.is_batch();
        let submissions = request.into_submissions()?;
        let mut outcome = ScoreBatchResult::default();

        for submission in &submissions {
            match self.store(event, submission).await {
                Ok(score) => {
                    // Caches are cleared before watchers hear about the score
                    self.caches.invalidate_event(event_id);
                    live::publish(
                        &self.live,
                        event_id,
                        &StreamMessage::ScoreAdded {
                            score: score.clone(),
                        },
                    );
                    outcome.results.push(score);
                }
                Err(e) if !is_batch => return Err(e),
                Err(e) => {
                    warn!(
                        "Rejected score for team {} in event {}: {}",
                        submission.team_id, event_id, e
                    );
                    outcome.errors.push(ScoreFailure {
                        team_id: submission.team_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Event {}: {} stored {} scores, rejected {}",
            event_id,
            access.role,
            outcome.results.len(),
            outcome.errors.len()
        );
        Ok(outcome)
    }

    async fn store(&self, event: &Event, submission: &ScoreSubmission) -> Result<GameScore> {
        submission.validate()?;
        if submission.points < 0 && !event.allow_negative {
            return Err(GameScoreError::NegativePointsNotAllowed);
        }

        let known = self
            .db
            .team_in_event(&event.id, &submission.team_id)
            .await
            .map_err(storage_error)?;
        if !known {
            return Err(GameScoreError::TeamNotFound(submission.team_id.clone()));
        }

        self.db
            .upsert_score(&event.id, submission)
            .await
            .map_err(storage_error)
    }
}
