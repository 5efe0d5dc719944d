//! Persisted session state, one JSON cookie file per login identity.
//!
//! Reuse is optimistic: there is no expiry logic here. The login flow
//! applies whatever is stored and decides freshness by checking whether the
//! site still shows its login form. An unreadable or corrupt file is the
//! same as no file.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use flocksift_common::SessionCookie;

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn state_path(&self, identity: &str) -> PathBuf {
        // Identity comes from caller input; keep it from escaping the dir.
        let safe: String = identity
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}_state.json"))
    }

    /// Load stored cookies for `identity`. Any failure is treated as absent.
    pub fn load(&self, identity: &str) -> Option<Vec<SessionCookie>> {
        let path = self.state_path(identity);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return None,
        };
        match serde_json::from_str::<Vec<SessionCookie>>(&raw) {
            Ok(cookies) => {
                debug!(identity, count = cookies.len(), "Loaded session state");
                Some(cookies)
            }
            Err(e) => {
                warn!(identity, error = %e, "Corrupt session state, ignoring");
                None
            }
        }
    }

    /// Persist cookies for `identity`, replacing any previous state.
    pub fn save(&self, identity: &str, cookies: &[SessionCookie]) -> std::io::Result<()> {
        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir)?;
        }
        let path = self.state_path(identity);
        let raw = serde_json::to_string(cookies)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&path, raw)?;
        debug!(identity, path = %path.display(), "Saved session state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str) -> SessionCookie {
        SessionCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".instagram.com".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: Some("Lax".to_string()),
        }
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        store.save("alice", &[cookie("sessionid")]).unwrap();
        let loaded = store.load("alice").expect("state should exist");

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "sessionid");
    }

    #[test]
    fn missing_state_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load("nobody").is_none());
    }

    #[test]
    fn corrupt_state_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        std::fs::write(dir.path().join("bob_state.json"), "{not json").unwrap();
        assert!(store.load("bob").is_none());
    }

    #[test]
    fn identity_cannot_escape_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.save("../evil", &[cookie("x")]).unwrap();
        // Written inside the store dir, slashes replaced.
        assert!(dir.path().join(".._evil_state.json").exists());
    }
}
