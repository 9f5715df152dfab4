use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Profile;

/// Row in the `comments` table, with the author's profile joined in when
/// the select asks for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    /// Display name snapshotted at posting time; kept for rows whose
    /// profile has since gone away.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Joined author profile (`profiles:user_id (...)` in the select).
    #[serde(default, rename = "profiles")]
    pub profile: Option<Profile>,
}

impl Comment {
    /// Author label: live profile first, posting-time snapshot second.
    pub fn display_name(&self) -> &str {
        match &self.profile {
            Some(profile) => profile.display_name(),
            None => self.user_name.as_deref().unwrap_or("Anonymous"),
        }
    }

    /// Whether the given user may edit or delete this comment locally.
    /// The backend re-checks ownership on every write.
    pub fn owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Insert payload for a new comment.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comment_with_joined_profile() {
        let json = r#"{
            "id": 7,
            "text": "Looks great",
            "created_at": "2025-03-18T10:00:00Z",
            "user_id": "u1",
            "user_name": "old name",
            "profiles": { "id": "u1", "username": "alice", "email": "a@b.com", "provider": "email" }
        }"#;
        let comment: Comment = serde_json::from_str(json).expect("parse comment");
        assert_eq!(comment.display_name(), "alice");
        assert!(comment.owned_by("u1"));
        assert!(!comment.owned_by("u2"));
    }

    #[test]
    fn test_comment_without_profile_falls_back_to_snapshot() {
        let json = r#"{
            "id": 8,
            "text": "hi",
            "created_at": "2025-03-18T10:00:00Z",
            "user_id": "u2",
            "user_name": "bob"
        }"#;
        let comment: Comment = serde_json::from_str(json).expect("parse comment");
        assert_eq!(comment.display_name(), "bob");
    }
}
