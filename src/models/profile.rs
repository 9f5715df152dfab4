use serde::{Deserialize, Serialize};

/// Row in the `profiles` table, created by the backend on first sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Matches the auth user's immutable id.
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Identity provider tag, e.g. "email" or "google".
    #[serde(default)]
    pub provider: Option<String>,
}

impl Profile {
    /// Name shown next to this profile's content: OAuth accounts display
    /// their email, password accounts their chosen username.
    pub fn display_name(&self) -> &str {
        if self.provider.as_deref() == Some("google") {
            self.email.as_deref().unwrap_or("Anonymous")
        } else {
            self.username
                .as_deref()
                .or(self.email.as_deref())
                .unwrap_or("Anonymous")
        }
    }
}
