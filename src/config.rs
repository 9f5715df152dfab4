//! Client configuration, injected through the environment at startup.
//!
//! The backend base URL and public API key are required: the client cannot
//! do anything without them, so their absence is a fatal startup error
//! rather than something to recover from at a call site.
//!
//! The storage scope for sessions is also decided here, once. The original
//! deployment re-derived it from device sniffing at arbitrary call sites,
//! which is how verifiers ended up written to one scope and read from
//! another. Thread this value through instead.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::store::StorageScope;

/// Directory name used for the persistent session store.
const APP_DIR: &str = "hornbill";

/// Required: backend base URL, e.g. `https://xyzcompany.supabase.co`.
pub const ENV_BACKEND_URL: &str = "HORNBILL_BACKEND_URL";

/// Required: the backend's public (anon) API key.
pub const ENV_ANON_KEY: &str = "HORNBILL_ANON_KEY";

/// Optional: `session` keeps sessions in memory only; anything else (or
/// unset) persists them to disk.
pub const ENV_SESSION_SCOPE: &str = "HORNBILL_SESSION_SCOPE";

/// Optional: image host upload endpoint for the promotion page.
pub const ENV_IMAGE_UPLOAD_URL: &str = "HORNBILL_IMAGE_UPLOAD_URL";

/// Optional: unsigned upload preset name for the image host.
pub const ENV_IMAGE_UPLOAD_PRESET: &str = "HORNBILL_IMAGE_UPLOAD_PRESET";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend (auth + database).
    pub backend_url: String,
    /// Public API key sent as the `apikey` header on every request.
    pub anon_key: String,
    /// Storage scope for sessions and the PKCE verifier. Stable for the
    /// lifetime of the client.
    pub session_scope: StorageScope,
    /// Directory backing the persistent store.
    pub store_dir: PathBuf,
    /// Image host upload endpoint, if the promotion page is enabled.
    pub image_upload_url: Option<String>,
    /// Image host upload preset, paired with `image_upload_url`.
    pub image_upload_preset: Option<String>,
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// Fails if either required variable is missing or empty.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let backend_url = require_var(ENV_BACKEND_URL)?;
        let anon_key = require_var(ENV_ANON_KEY)?;

        let session_scope = match std::env::var(ENV_SESSION_SCOPE).ok().as_deref() {
            Some("session") => StorageScope::SessionOnly,
            _ => StorageScope::Persistent,
        };

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            anon_key,
            session_scope,
            store_dir: default_store_dir()?,
            image_upload_url: std::env::var(ENV_IMAGE_UPLOAD_URL).ok(),
            image_upload_preset: std::env::var(ENV_IMAGE_UPLOAD_PRESET).ok(),
        })
    }

    /// Construct a configuration directly, for hosts that do not use the
    /// environment (and for tests).
    pub fn new(backend_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let backend_url: String = backend_url.into();
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session_scope: StorageScope::SessionOnly,
            store_dir: PathBuf::from("."),
            image_upload_url: None,
            image_upload_preset: None,
        }
    }

    pub fn with_session_scope(mut self, scope: StorageScope) -> Self {
        self.session_scope = scope;
        self
    }

    pub fn with_store_dir(mut self, dir: PathBuf) -> Self {
        self.store_dir = dir;
        self
    }
}

fn require_var(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("{} is not set; the client cannot start without it", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} is set but empty; the client cannot start without it", name);
    }
    Ok(value)
}

fn default_store_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().context("Could not find cache directory")?;
    Ok(cache_dir.join(APP_DIR))
}
