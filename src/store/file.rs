use std::path::PathBuf;

use tracing::warn;

use super::SessionStore;

/// Disk-backed store for the persistent scope.
///
/// One file per key under the configured directory, mirroring how session
/// state survives page reloads in the original deployment. I/O failures are
/// logged and swallowed: a broken cache directory must read as "no session",
/// never as an error.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are our own well-known constants, but sanitize anyway so a
        // hostile key cannot escape the store directory.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.kv", safe))
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!(key, error = %e, "Failed to read session store entry, treating as miss");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(key, error = %e, "Failed to create session store directory, dropping write");
            return;
        }
        if let Err(e) = std::fs::write(self.path_for(key), value) {
            warn!(key, error = %e, "Failed to write session store entry, dropping write");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if !path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(key, error = %e, "Failed to remove session store entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_on_disk() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(tmp.path().to_path_buf());

        assert_eq!(store.get("hb-auth-session"), None);
        store.set("hb-auth-session", "{\"token\":\"abc\"}");
        assert_eq!(
            store.get("hb-auth-session").as_deref(),
            Some("{\"token\":\"abc\"}")
        );
        store.remove("hb-auth-session");
        assert_eq!(store.get("hb-auth-session"), None);
    }

    #[test]
    fn test_survives_reopen() {
        let tmp = tempfile::tempdir().expect("tempdir");
        {
            let store = FileStore::new(tmp.path().to_path_buf());
            store.set("hb-code-verifier", "verifier-value");
        }
        let reopened = FileStore::new(tmp.path().to_path_buf());
        assert_eq!(
            reopened.get("hb-code-verifier").as_deref(),
            Some("verifier-value")
        );
    }

    #[test]
    fn test_key_is_sanitized() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(tmp.path().to_path_buf());
        store.set("../escape", "x");
        // The write lands inside the store directory, not the parent.
        assert_eq!(store.get("../escape").as_deref(), Some("x"));
        assert!(tmp.path().join("___escape.kv").exists());
    }

    #[test]
    fn test_unwritable_directory_degrades_to_noop() {
        let store = FileStore::new(PathBuf::from("/proc/hornbill-no-such-dir"));
        store.set("hb-auth-session", "value");
        assert_eq!(store.get("hb-auth-session"), None);
    }
}
