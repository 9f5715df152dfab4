//! Comments page controller: newest-first list with optimistic writes.

use chrono::Utc;
use tracing::warn;

use crate::api::{ApiError, DataClient};
use crate::auth::User;
use crate::models::{Comment, NewComment};

/// Join clause pulling the author profile alongside each comment.
const COMMENT_SELECT: &str = "id,text,created_at,user_id,user_name,profiles:user_id(id,username,email,provider)";

pub struct CommentsPage {
    comments: Vec<Comment>,
    /// Provisional ids are negative so they can never collide with
    /// server-assigned rows.
    next_provisional_id: i64,
}

impl Default for CommentsPage {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentsPage {
    pub fn new() -> Self {
        Self {
            comments: Vec::new(),
            next_provisional_id: -1,
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Fetch the comment list, newest first.
    pub async fn load(&mut self, db: &DataClient) -> Result<(), ApiError> {
        self.comments = db
            .select(
                "comments",
                &[("select", COMMENT_SELECT), ("order", "created_at.desc")],
            )
            .await?;
        Ok(())
    }

    /// Post a comment as the signed-in user.
    ///
    /// The comment appears at the top of the list immediately; if the
    /// insert fails the provisional entry is removed again and the error
    /// surfaces to the caller.
    pub async fn add(&mut self, db: &DataClient, user: &User, text: &str) -> Result<(), ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::InvalidResponse(
                "comment text is empty".to_string(),
            ));
        }

        let new = NewComment {
            text: text.to_string(),
            user_id: user.id.clone(),
            user_name: user.display_label().to_string(),
            created_at: Utc::now(),
        };
        let provisional_id = self.apply_optimistic_insert(&new);

        match db.insert::<_, Comment>("comments", &new).await {
            Ok(stored) => {
                self.confirm_insert(provisional_id, stored);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Comment insert rejected, rolling back");
                self.rollback_insert(provisional_id);
                Err(e)
            }
        }
    }

    /// Edit one of the user's own comments.
    pub async fn edit(
        &mut self,
        db: &DataClient,
        user_id: &str,
        id: i64,
        text: &str,
    ) -> Result<(), ApiError> {
        let previous = match self.apply_optimistic_edit(user_id, id, text)? {
            Some(previous) => previous,
            None => return Err(ApiError::NotFound(format!("comment {}", id))),
        };

        let result = db
            .update(
                "comments",
                &[
                    ("id", &format!("eq.{}", id)),
                    ("user_id", &format!("eq.{}", user_id)),
                ],
                &serde_json::json!({ "text": text }),
            )
            .await;

        if let Err(e) = result {
            warn!(error = %e, id, "Comment update rejected, rolling back");
            self.rollback_edit(id, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Delete one of the user's own comments.
    pub async fn remove(&mut self, db: &DataClient, user_id: &str, id: i64) -> Result<(), ApiError> {
        let removed = match self.apply_optimistic_delete(user_id, id)? {
            Some(removed) => removed,
            None => return Err(ApiError::NotFound(format!("comment {}", id))),
        };

        let result = db
            .delete(
                "comments",
                &[
                    ("id", &format!("eq.{}", id)),
                    ("user_id", &format!("eq.{}", user_id)),
                ],
            )
            .await;

        if let Err(e) = result {
            warn!(error = %e, id, "Comment delete rejected, rolling back");
            self.rollback_delete(removed);
            return Err(e);
        }
        Ok(())
    }

    // ===== Optimistic list state =====

    fn apply_optimistic_insert(&mut self, new: &NewComment) -> i64 {
        let provisional_id = self.next_provisional_id;
        self.next_provisional_id -= 1;
        self.comments.insert(
            0,
            Comment {
                id: provisional_id,
                text: new.text.clone(),
                created_at: new.created_at,
                user_id: new.user_id.clone(),
                user_name: Some(new.user_name.clone()),
                profile: None,
            },
        );
        provisional_id
    }

    fn confirm_insert(&mut self, provisional_id: i64, stored: Comment) {
        if let Some(entry) = self.comments.iter_mut().find(|c| c.id == provisional_id) {
            *entry = stored;
        }
    }

    fn rollback_insert(&mut self, provisional_id: i64) {
        self.comments.retain(|c| c.id != provisional_id);
    }

    /// Returns the previous text, or `None` if the comment is not present.
    fn apply_optimistic_edit(
        &mut self,
        user_id: &str,
        id: i64,
        text: &str,
    ) -> Result<Option<String>, ApiError> {
        match self.comments.iter_mut().find(|c| c.id == id) {
            Some(comment) if comment.owned_by(user_id) => {
                let previous = std::mem::replace(&mut comment.text, text.to_string());
                Ok(Some(previous))
            }
            Some(_) => Err(ApiError::OwnershipViolation),
            None => Ok(None),
        }
    }

    fn rollback_edit(&mut self, id: i64, previous: String) {
        if let Some(comment) = self.comments.iter_mut().find(|c| c.id == id) {
            comment.text = previous;
        }
    }

    /// Returns the removed comment and its slot, or `None` if absent.
    fn apply_optimistic_delete(
        &mut self,
        user_id: &str,
        id: i64,
    ) -> Result<Option<(usize, Comment)>, ApiError> {
        match self.comments.iter().position(|c| c.id == id) {
            Some(index) if self.comments[index].owned_by(user_id) => {
                Ok(Some((index, self.comments.remove(index))))
            }
            Some(_) => Err(ApiError::OwnershipViolation),
            None => Ok(None),
        }
    }

    fn rollback_delete(&mut self, removed: (usize, Comment)) {
        let (index, comment) = removed;
        let index = index.min(self.comments.len());
        self.comments.insert(index, comment);
    }
}
