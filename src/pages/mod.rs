//! Headless page controllers.
//!
//! Each controller owns the list state for one page and talks to the
//! hosted database through an injected `DataClient`. Mutations apply
//! optimistically to the local list and reconcile with the confirmed
//! response, rolling back if the backend rejects the write. Ownership is
//! checked locally only as a courtesy; the backend enforces it for real.

pub mod comments;
pub mod uploads;
pub mod vacancies;

pub use comments::CommentsPage;
pub use uploads::{ImageUploader, PromotionPage};
pub use vacancies::VacancyBoard;
