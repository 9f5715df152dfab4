use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row in the `uploaded_images` table. The image bytes live on the external
/// image host; only the hosted URL and uploader attribution are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: i64,
    pub url: String,
    pub user_id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub upload_date: DateTime<Utc>,
}

impl UploadedImage {
    pub fn owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Insert payload recorded after a successful image-host upload.
#[derive(Debug, Clone, Serialize)]
pub struct NewUploadedImage {
    pub url: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub upload_date: DateTime<Utc>,
}
