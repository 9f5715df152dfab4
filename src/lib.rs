//! Hornbill - client library for a hosted-backend marketing site.
//!
//! The crate wraps a hosted identity + database backend behind typed Rust
//! APIs so a UI host (native shell, TUI, or web view) only deals with
//! domain types and events:
//!
//! - `auth` - password and OAuth (PKCE) sign-in, session lifecycle, and a
//!   pub/sub feed of auth state changes
//! - `store` - key/value session storage, in-memory or file-backed
//! - `api` - REST access to the hosted database tables
//! - `models` - rows and domain types (comments, vacancies, images)
//! - `pages` - headless page controllers with optimistic list updates
//! - `router` - route table and the auth guard
//!
//! Construction starts from [`Config`]: load it from the environment,
//! build an [`IdentityClient`], and derive a [`DataClient`] per session.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod pages;
pub mod router;
pub mod store;

pub use api::{ApiError, DataClient};
pub use auth::{
    AuthError, AuthEvent, AuthEventKind, CallbackHandler, CallbackOutcome, IdentityClient,
    Provider, Session, Subscription, User,
};
pub use config::Config;
pub use router::{resolve, Route, RouteDecision, SessionStatus, AUTH_CALLBACK_PATH};
pub use store::{SessionStore, StorageScope};
