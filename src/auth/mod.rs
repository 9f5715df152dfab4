//! Authentication module: sessions, the identity client, and the OAuth
//! callback flow.
//!
//! This module provides:
//! - `Session` / `User`: the cached proof of authentication
//! - `IdentityClient`: the single entry point to the hosted auth service
//! - `CallbackHandler`: exactly-once handling of the provider redirect
//! - `AuthEvent` subscription with registration-order delivery
//!
//! Sessions are persisted through the configured session store scope and
//! expire server-side; the client treats local presence as "probably
//! authenticated" only.

pub mod backend;
pub mod callback;
pub mod client;
pub mod error;
pub mod events;
pub mod pkce;
pub mod rest;
pub mod session;

pub use backend::AuthBackend;
pub use callback::{CallbackHandler, CallbackOutcome, CallbackParams, CallbackState};
pub use client::{IdentityClient, OAuthOptions};
pub use error::AuthError;
pub use events::{AuthEvent, AuthEventKind, Subscription};
pub use rest::RestAuthBackend;
pub use session::{Provider, Session, User};
