//! REST client module for the hosted database.
//!
//! This module provides the `DataClient` for reading and writing the
//! site's tables (comments, vacancies, profiles, uploaded images).
//!
//! Reads use the public API key; writes additionally carry the signed-in
//! user's bearer token so the backend's row-level security can enforce
//! ownership.

pub mod client;
pub mod error;

pub use client::DataClient;
pub use error::ApiError;
