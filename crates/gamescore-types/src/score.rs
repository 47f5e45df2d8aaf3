//! Game score and scoreboard types

use crate::{Event, Team, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_TEAM_ID_LEN: usize = 64;
pub const MAX_SUBMISSION_ID_LEN: usize = 100;
pub const MAX_BATCH_SCORES: usize = 20;

/// Points awarded to one team for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameScore {
    pub id: String,
    pub event_id: String,
    pub team_id: String,
    pub game_number: i64,
    pub points: i64,
    pub submission_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// A single score as submitted by a scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub team_id: String,
    pub game_number: i64,
    pub points: i64,
    #[serde(default)]
    pub submission_id: Option<String>,
}

impl ScoreSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.team_id.trim().is_empty() {
            return Err(ValidationError::new("team_id is required"));
        }
        if self.team_id.len() > MAX_TEAM_ID_LEN {
            return Err(ValidationError::new(format!(
                "team_id must be at most {} characters",
                MAX_TEAM_ID_LEN
            )));
        }
        if self.game_number < 1 {
            return Err(ValidationError::new("game_number must be a positive integer"));
        }
        if let Some(submission_id) = &self.submission_id {
            if submission_id.len() > MAX_SUBMISSION_ID_LEN {
                return Err(ValidationError::new(format!(
                    "submission_id must be at most {} characters",
                    MAX_SUBMISSION_ID_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Request body for score submission: either one score or a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreRequest {
    Batch { scores: Vec<ScoreSubmission> },
    Single(ScoreSubmission),
}

impl ScoreRequest {
    pub fn into_submissions(self) -> Result<Vec<ScoreSubmission>, ValidationError> {
        match self {
            ScoreRequest::Single(score) => Ok(vec![score]),
            ScoreRequest::Batch { scores } => {
                if scores.is_empty() {
                    return Err(ValidationError::new("At least one score is required"));
                }
                if scores.len() > MAX_BATCH_SCORES {
                    return Err(ValidationError::new(format!(
                        "At most {} scores can be submitted at once",
                        MAX_BATCH_SCORES
                    )));
                }
                Ok(scores)
            }
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, ScoreRequest::Batch { .. })
    }
}

/// Per-item failure inside a batch submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFailure {
    pub team_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBatchResult {
    pub results: Vec<GameScore>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<ScoreFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardTotals {
    pub total_teams: usize,
    pub total_scores: usize,
    pub total_points: i64,
}

/// Public view of an event: teams ranked by points plus every score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub event: Event,
    pub teams: Vec<Team>,
    pub scores: Vec<GameScore>,
    pub totals: ScoreboardTotals,
}

impl Scoreboard {
    pub fn new(event: Event, teams: Vec<Team>, scores: Vec<GameScore>) -> Self {
        let totals = ScoreboardTotals {
            total_teams: teams.len(),
            total_scores: scores.len(),
            total_points: teams.iter().map(|t| t.total_points).sum(),
        };
        Self {
            event,
            teams,
            scores,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(team_id: &str, game_number: i64) -> ScoreSubmission {
        ScoreSubmission {
            team_id: team_id.to_string(),
            game_number,
            points: 10,
            submission_id: None,
        }
    }

    #[test]
    fn test_submission_validation() {
        assert!(submission("team-1", 1).validate().is_ok());
        assert!(submission("", 1).validate().is_err());
        assert!(submission("team-1", 0).validate().is_err());

        let mut long = submission("team-1", 1);
        long.submission_id = Some("x".repeat(MAX_SUBMISSION_ID_LEN + 1));
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_request_shapes() {
        let single: ScoreRequest =
            serde_json::from_value(json!({"team_id": "t1", "game_number": 2, "points": 5}))
                .unwrap();
        assert!(!single.is_batch());
        assert_eq!(single.into_submissions().unwrap().len(), 1);

        let batch: ScoreRequest = serde_json::from_value(json!({
            "scores": [
                {"team_id": "t1", "game_number": 1, "points": 5},
                {"team_id": "t2", "game_number": 1, "points": -2}
            ]
        }))
        .unwrap();
        assert!(batch.is_batch());
        assert_eq!(batch.into_submissions().unwrap().len(), 2);

        let empty: ScoreRequest = serde_json::from_value(json!({"scores": []})).unwrap();
        assert!(empty.into_submissions().is_err());
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let scores = (1..=(MAX_BATCH_SCORES as i64 + 1))
            .map(|n| submission("t1", n))
            .collect();
        assert!(ScoreRequest::Batch { scores }.into_submissions().is_err());
    }
}
