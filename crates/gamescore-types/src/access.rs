//! Event access roles and the permissions each one carries

use serde::{Deserialize, Serialize};

/// Role granted by one of an event's share tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenRole {
    Admin,
    Scorer,
    Viewer,
}

impl TokenRole {
    pub fn permissions(self) -> TokenPermissions {
        match self {
            TokenRole::Admin => TokenPermissions {
                can_edit_event: true,
                can_add_teams: true,
                can_delete_teams: true,
                can_submit_scores: true,
                can_edit_scores: true,
                can_delete_scores: true,
                can_finalize_event: true,
                can_view_scoreboard: true,
            },
            TokenRole::Scorer => TokenPermissions {
                can_submit_scores: true,
                can_view_scoreboard: true,
                ..TokenPermissions::none()
            },
            TokenRole::Viewer => TokenPermissions {
                can_view_scoreboard: true,
                ..TokenPermissions::none()
            },
        }
    }

    /// Path segment used when building share links for this role
    pub fn share_path(self, token: &str) -> String {
        match self {
            TokenRole::Admin => format!("/admin/{}", token),
            TokenRole::Scorer => format!("/score/{}", token),
            TokenRole::Viewer => format!("/public/{}", token),
        }
    }
}

impl std::fmt::Display for TokenRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenRole::Admin => write!(f, "admin"),
            TokenRole::Scorer => write!(f, "scorer"),
            TokenRole::Viewer => write!(f, "viewer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenPermissions {
    pub can_edit_event: bool,
    pub can_add_teams: bool,
    pub can_delete_teams: bool,
    pub can_submit_scores: bool,
    pub can_edit_scores: bool,
    pub can_delete_scores: bool,
    pub can_finalize_event: bool,
    pub can_view_scoreboard: bool,
}

impl TokenPermissions {
    pub const fn none() -> Self {
        Self {
            can_edit_event: false,
            can_add_teams: false,
            can_delete_teams: false,
            can_submit_scores: false,
            can_edit_scores: false,
            can_delete_scores: false,
            can_finalize_event: false,
            can_view_scoreboard: false,
        }
    }
}
