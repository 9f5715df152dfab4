//! Promotion page controller: image uploads to an external host, with
//! each hosted URL recorded in the database for the gallery.
//!
//! Uploads are a two-step write: bytes go to the image host first, then
//! the returned URL is inserted as a row. If the insert fails the gallery
//! rolls back; the orphaned hosted image is accepted as the cost of not
//! needing a transactional bridge between the two services.

use chrono::Utc;
use reqwest::multipart;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{ApiError, DataClient};
use crate::auth::User;
use crate::config::Config;
use crate::models::{NewUploadedImage, UploadedImage};

/// Upload timeout in seconds. Image payloads are larger than API calls,
/// so this is looser than the database client's timeout.
const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Client for the external image host's unsigned upload endpoint.
#[derive(Clone)]
pub struct ImageUploader {
    client: reqwest::Client,
    upload_url: String,
    preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl ImageUploader {
    /// Build an uploader from configuration, or `None` when the image host
    /// is not configured (the gallery then renders read-only).
    pub fn from_config(config: &Config) -> Result<Option<Self>, ApiError> {
        let (upload_url, preset) = match (&config.image_upload_url, &config.image_upload_preset) {
            (Some(url), Some(preset)) => (url.clone(), preset.clone()),
            _ => return Ok(None),
        };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Some(Self {
            client,
            upload_url,
            preset,
        }))
    }

    /// Send the image bytes to the host; returns the hosted HTTPS URL.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ApiError> {
        debug!(filename, size = bytes.len(), "Uploading image");
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(filename.to_string()),
            )
            .text("upload_preset", self.preset.clone());

        let response = self.client.post(&self.upload_url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("image host response: {}", e)))?;
        Ok(parsed.secure_url)
    }
}

pub struct PromotionPage {
    images: Vec<UploadedImage>,
    /// Provisional ids are negative so they can never collide with
    /// server-assigned rows.
    next_provisional_id: i64,
}

impl Default for PromotionPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PromotionPage {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            next_provisional_id: -1,
        }
    }

    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    /// Fetch the gallery, newest upload first.
    pub async fn load(&mut self, db: &DataClient) -> Result<(), ApiError> {
        self.images = db
            .select(
                "uploaded_images",
                &[("select", "*"), ("order", "upload_date.desc")],
            )
            .await?;
        Ok(())
    }

    /// Upload an image and record it in the gallery.
    ///
    /// The session check happens before any bytes leave the machine: an
    /// unauthenticated caller would only find out after paying for the
    /// host upload otherwise, and the orphaned image would be unrecorded.
    pub async fn upload_and_record(
        &mut self,
        db: &DataClient,
        uploader: &ImageUploader,
        user: &User,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), ApiError> {
        if !db.is_authenticated() {
            return Err(ApiError::Unauthenticated);
        }

        let url = uploader.upload(bytes, filename).await?;

        let new = NewUploadedImage {
            url,
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            user_name: user.display_label().to_string(),
            upload_date: Utc::now(),
        };
        let provisional_id = self.apply_optimistic_insert(&new);

        match db.insert::<_, UploadedImage>("uploaded_images", &new).await {
            Ok(stored) => {
                self.confirm_insert(provisional_id, stored);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Image record insert rejected, rolling back");
                self.rollback_insert(provisional_id);
                Err(e)
            }
        }
    }

    /// Delete one of the user's own images from the gallery.
    pub async fn remove(&mut self, db: &DataClient, user_id: &str, id: i64) -> Result<(), ApiError> {
        let removed = match self.apply_optimistic_delete(user_id, id)? {
            Some(removed) => removed,
            None => return Err(ApiError::NotFound(format!("image {}", id))),
        };

        let result = db
            .delete(
                "uploaded_images",
                &[
                    ("id", &format!("eq.{}", id)),
                    ("user_id", &format!("eq.{}", user_id)),
                ],
            )
            .await;

        if let Err(e) = result {
            warn!(error = %e, id, "Image delete rejected, rolling back");
            self.rollback_delete(removed);
            return Err(e);
        }
        Ok(())
    }

    // ===== Optimistic list state =====

    fn apply_optimistic_insert(&mut self, new: &NewUploadedImage) -> i64 {
        let provisional_id = self.next_provisional_id;
        self.next_provisional_id -= 1;
        self.images.insert(
            0,
            UploadedImage {
                id: provisional_id,
                url: new.url.clone(),
                user_id: new.user_id.clone(),
                user_email: Some(new.user_email.clone()),
                user_name: Some(new.user_name.clone()),
                upload_date: new.upload_date,
            },
        );
        provisional_id
    }

    fn confirm_insert(&mut self, provisional_id: i64, stored: UploadedImage) {
        if let Some(entry) = self.images.iter_mut().find(|i| i.id == provisional_id) {
            *entry = stored;
        }
    }

    fn rollback_insert(&mut self, provisional_id: i64) {
        self.images.retain(|i| i.id != provisional_id);
    }

    /// Returns the removed image and its slot, or `None` if absent.
    fn apply_optimistic_delete(
        &mut self,
        user_id: &str,
        id: i64,
    ) -> Result<Option<(usize, UploadedImage)>, ApiError> {
        match self.images.iter().position(|i| i.id == id) {
            Some(index) if self.images[index].owned_by(user_id) => {
                Ok(Some((index, self.images.remove(index))))
            }
            Some(_) => Err(ApiError::OwnershipViolation),
            None => Ok(None),
        }
    }

    fn rollback_delete(&mut self, removed: (usize, UploadedImage)) {
        let (index, image) = removed;
        let index = index.min(self.images.len());
        self.images.insert(index, image);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Provider;

    fn anonymous_db() -> DataClient {
        DataClient::new(&Config::new("https://backend.test", "anon-key")).expect("client")
    }

    fn uploader() -> ImageUploader {
        let mut config = Config::new("https://backend.test", "anon-key");
        config.image_upload_url = Some("https://images.test/upload".to_string());
        config.image_upload_preset = Some("unsigned_preset".to_string());
        ImageUploader::from_config(&config)
            .expect("client")
            .expect("configured")
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            username: Some("alice".to_string()),
            display_name: None,
            provider: Provider::Email,
        }
    }

    fn stored_image(id: i64, user_id: &str) -> UploadedImage {
        UploadedImage {
            id,
            url: format!("https://images.test/{}.jpg", id),
            user_id: user_id.to_string(),
            user_email: Some("a@b.com".to_string()),
            user_name: Some("alice".to_string()),
            upload_date: Utc::now(),
        }
    }

    #[test]
    fn test_uploader_is_none_when_unconfigured() {
        let config = Config::new("https://backend.test", "anon-key");
        assert!(ImageUploader::from_config(&config)
            .expect("client")
            .is_none());
    }

    #[test]
    fn test_optimistic_insert_confirm_replaces_provisional_row() {
        let mut page = PromotionPage::new();
        let new = NewUploadedImage {
            url: "https://images.test/new.jpg".to_string(),
            user_id: "u1".to_string(),
            user_email: "a@b.com".to_string(),
            user_name: "alice".to_string(),
            upload_date: Utc::now(),
        };

        let provisional = page.apply_optimistic_insert(&new);
        assert!(provisional < 0);
        assert_eq!(page.images()[0].url, "https://images.test/new.jpg");

        page.confirm_insert(provisional, stored_image(7, "u1"));
        assert_eq!(page.images()[0].id, 7);
        assert_eq!(page.images().len(), 1);
    }

    #[test]
    fn test_delete_rollback_restores_position() {
        let mut page = PromotionPage::new();
        page.images.push(stored_image(1, "u1"));
        page.images.push(stored_image(2, "u1"));
        page.images.push(stored_image(3, "u1"));

        let removed = page
            .apply_optimistic_delete("u1", 2)
            .expect("owned")
            .expect("present");
        assert_eq!(page.images().len(), 2);

        page.rollback_delete(removed);
        let ids: Vec<i64> = page.images().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_deleting_someone_elses_image_is_an_ownership_violation() {
        let mut page = PromotionPage::new();
        page.images.push(stored_image(1, "someone-else"));

        let err = page
            .apply_optimistic_delete("u1", 1)
            .expect_err("not the owner");
        assert!(matches!(err, ApiError::OwnershipViolation));
        assert_eq!(page.images().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_without_session_fails_before_any_network() {
        let mut page = PromotionPage::new();
        let db = anonymous_db();

        let err = page
            .upload_and_record(&db, &uploader(), &user(), vec![0xFF, 0xD8], "photo.jpg")
            .await
            .expect_err("anonymous upload must fail");
        assert!(matches!(err, ApiError::Unauthenticated));
        assert!(page.images().is_empty());
    }
}
