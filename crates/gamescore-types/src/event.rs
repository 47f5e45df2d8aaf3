//! Event and team types

use crate::{TokenRole, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_EVENT_NAME_LEN: usize = 120;
pub const MAX_TEAM_NAME_LEN: usize = 64;
pub const MAX_TEAMS_PER_EVENT: usize = 100;

/// Event status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Inactive,
}

impl EventStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EventStatus::Active),
            "inactive" => Some(EventStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Active => write!(f, "active"),
            EventStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// A live scoring event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub status: EventStatus,
    pub allow_negative: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }
}

/// A team competing in an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub total_points: i64,
}

/// Event creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub allow_negative: bool,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("Event name is required"));
        }
        if name.chars().count() > MAX_EVENT_NAME_LEN {
            return Err(ValidationError::new(format!(
                "Event name must be at most {} characters",
                MAX_EVENT_NAME_LEN
            )));
        }
        if self.teams.len() > MAX_TEAMS_PER_EVENT {
            return Err(ValidationError::new(format!(
                "An event can have at most {} teams",
                MAX_TEAMS_PER_EVENT
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for team in &self.teams {
            let team = team.trim();
            if team.is_empty() {
                return Err(ValidationError::new("Team name cannot be empty"));
            }
            if team.chars().count() > MAX_TEAM_NAME_LEN {
                return Err(ValidationError::new(format!(
                    "Team name must be at most {} characters",
                    MAX_TEAM_NAME_LEN
                )));
            }
            if !seen.insert(team.to_lowercase()) {
                return Err(ValidationError::new(format!(
                    "Duplicate team name: {}",
                    team
                )));
            }
        }

        Ok(())
    }
}

/// Partial event update (admin only)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPatch {
    pub name: Option<String>,
    pub status: Option<EventStatus>,
    pub allow_negative: Option<bool>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.allow_negative.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::new("Nothing to update"));
        }
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::new("Event name is required"));
            }
            if name.chars().count() > MAX_EVENT_NAME_LEN {
                return Err(ValidationError::new(format!(
                    "Event name must be at most {} characters",
                    MAX_EVENT_NAME_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Plain access tokens, only ever returned at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTokens {
    pub admin_token: String,
    pub scorer_token: String,
    pub public_token: String,
}

impl EventTokens {
    pub fn share_links(&self) -> ShareLinks {
        ShareLinks {
            admin: TokenRole::Admin.share_path(&self.admin_token),
            scorer: TokenRole::Scorer.share_path(&self.scorer_token),
            public: TokenRole::Viewer.share_path(&self.public_token),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLinks {
    pub admin: String,
    pub scorer: String,
    pub public: String,
}

/// Response body for a freshly created event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub event: Event,
    pub teams: Vec<Team>,
    pub tokens: EventTokens,
    pub share_links: ShareLinks,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event(name: &str, teams: &[&str]) -> NewEvent {
        NewEvent {
            name: name.to_string(),
            teams: teams.iter().map(|t| t.to_string()).collect(),
            allow_negative: false,
        }
    }

    #[test]
    fn test_new_event_validation() {
        assert!(new_event("Summer Camp", &["Red", "Blue"]).validate().is_ok());
        assert!(new_event("   ", &[]).validate().is_err());
        assert!(new_event("Camp", &["Red", " "]).validate().is_err());

        let err = new_event("Camp", &["Red", "red"]).validate().unwrap_err();
        assert!(err.0.contains("Duplicate"));
    }

    #[test]
    fn test_event_patch_validation() {
        assert!(EventPatch::default().validate().is_err());

        let patch = EventPatch {
            status: Some(EventStatus::Inactive),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_status_roundtrip_through_text() {
        for status in [EventStatus::Active, EventStatus::Inactive] {
            assert_eq!(EventStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(EventStatus::parse("archived"), None);
    }
}
