//! Domain records stored in the hosted database.

pub mod comment;
pub mod profile;
pub mod upload;
pub mod vacancy;

pub use comment::{Comment, NewComment};
pub use profile::Profile;
pub use upload::{NewUploadedImage, UploadedImage};
pub use vacancy::{Vacancy, VacancySort};
