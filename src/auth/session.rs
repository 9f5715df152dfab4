use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{SessionStore, SESSION_KEY};

/// Buffer before expiry at which a refresh should be attempted (5 minutes).
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Identity provider that authenticated the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Email + password accounts created through the signup page.
    Email,
    Google,
    Facebook,
}

impl Provider {
    /// Query-parameter value expected by the authorize endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Email => "email",
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }
}

/// The authenticated user attached to a session.
///
/// The identifier is immutable; profile fields are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub provider: Provider,
}

impl User {
    /// Name to show next to user-generated content.
    ///
    /// OAuth accounts have no chosen username, so they display their email,
    /// matching how the comments page labelled authors.
    pub fn display_label(&self) -> &str {
        if self.provider == Provider::Email {
            self.username
                .as_deref()
                .or(self.display_name.as_deref())
                .unwrap_or(&self.email)
        } else {
            &self.email
        }
    }
}

/// Server-issued proof of authentication, cached client-side.
///
/// Presence means "probably authenticated": the server may have invalidated
/// the session without the client hearing about it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Whether the session is close enough to expiry to refresh it.
    pub fn needs_refresh(&self) -> bool {
        Utc::now() > self.expires_at - Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES)
    }

    /// Serialize into the session store under the well-known key.
    ///
    /// A serialization failure is logged and dropped; the session stays
    /// valid in memory either way.
    pub fn persist(&self, store: &dyn SessionStore) {
        match serde_json::to_string(self) {
            Ok(json) => store.set(SESSION_KEY, &json),
            Err(e) => warn!(error = %e, "Failed to serialize session for storage"),
        }
    }

    /// Read a previously persisted session back from the store.
    ///
    /// Corrupt or expired entries read as `None`; a stale entry is removed
    /// so the next load does not re-parse it.
    pub fn restore(store: &dyn SessionStore) -> Option<Self> {
        let json = store.get(SESSION_KEY)?;
        let session: Session = match serde_json::from_str(&json) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to parse stored session, discarding");
                store.remove(SESSION_KEY);
                return None;
            }
        };
        if session.is_expired() {
            store.remove(SESSION_KEY);
            return None;
        }
        Some(session)
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn session_for(email: &str, provider: Provider) -> Session {
        Session {
            access_token: format!("access-{}", email),
            refresh_token: format!("refresh-{}", email),
            expires_at: Utc::now() + Duration::hours(1),
            user: User {
                id: format!("user-{}", email),
                email: email.to_string(),
                username: Some("tester".to_string()),
                display_name: None,
                provider,
            },
        }
    }
}
