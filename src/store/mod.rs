//! Session store module for persisting auth state across page loads.
//!
//! This module provides the `SessionStore` trait plus two backings:
//! - `MemoryStore`: process-lifetime storage (session-only scope)
//! - `FileStore`: disk-backed storage (persistent scope)
//!
//! The scope is decided once, at client construction, and never re-derived
//! mid-flow: the PKCE verifier written before an OAuth redirect must be read
//! back from the same store after it.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

/// Key holding the serialized session.
pub const SESSION_KEY: &str = "hb-auth-session";

/// Key holding the PKCE code verifier between redirect and callback.
pub const CODE_VERIFIER_KEY: &str = "hb-code-verifier";

/// Key holding the post-login destination path.
pub const RETURN_TO_KEY: &str = "hb-return-to";

/// Which storage backing holds the session for the lifetime of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    /// Survives restarts; backed by a file in the cache directory.
    Persistent,
    /// Lives only as long as the process; backed by memory.
    SessionOnly,
}

/// Durable key-value persistence for the serialized session and verifier.
///
/// All operations are synchronous and infallible by contract: a failing
/// backing degrades to a no-op (writes) or a miss (reads) with a logged
/// warning, never an error the caller has to handle.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Build the store matching the configured scope.
pub fn for_scope(scope: StorageScope, cache_dir: std::path::PathBuf) -> Arc<dyn SessionStore> {
    match scope {
        StorageScope::Persistent => Arc::new(FileStore::new(cache_dir)),
        StorageScope::SessionOnly => Arc::new(MemoryStore::new()),
    }
}
