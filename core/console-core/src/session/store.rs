//! Persisted session identity: the current session id and the doomed-session
//! marker.
//!
//! The browser original keeps these in two cookies so they survive a page
//! refresh; that survival is what makes the doomed-session replay check
//! possible at all. The file-backed store writes atomically (tmp + rename)
//! so a crash mid-write never leaves a torn record.

use chrono::Utc;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const STORE_FILE: &str = "session.json";

/// A session id scheduled for deferred server-side invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoomedSession {
    pub session_id: String,
    pub created_at: String,
}

/// Cookie-like persistence for session identity.
pub trait SessionStore {
    /// Session id persisted by the most recent successful status check.
    fn session_id(&self) -> Option<String>;

    fn save_session_id(&mut self, session_id: &str);

    fn doomed_session(&self) -> Option<DoomedSession>;

    /// Marks a session as mid-logout. Overwrites any previous marker.
    fn save_doomed_session(&mut self, session_id: &str);

    fn clear_doomed_session(&mut self);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    doomed: Option<DoomedSession>,
}

/// Returns the default store path (~/.console/session.json).
pub fn default_store_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".console").join(STORE_FILE))
}

/// File-backed store. Read once at construction; every mutation persists.
/// Persistence failures are logged and tolerated: losing the marker degrades
/// to the pre-refresh behavior, it does not break the session.
pub struct FileSessionStore {
    path: PathBuf,
    state: StoredState,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_state(&path).unwrap_or_else(|err| {
            warn!(error = %err, path = %path.display(), "Failed to load session store; starting empty");
            StoredState::default()
        });
        Self { path, state }
    }

    fn persist(&self) {
        if let Err(err) = save_state(&self.path, &self.state) {
            warn!(error = %err, path = %self.path.display(), "Failed to persist session store");
        }
    }
}

impl SessionStore for FileSessionStore {
    fn session_id(&self) -> Option<String> {
        self.state.session_id.clone()
    }

    fn save_session_id(&mut self, session_id: &str) {
        self.state.session_id = Some(session_id.to_string());
        self.persist();
    }

    fn doomed_session(&self) -> Option<DoomedSession> {
        self.state.doomed.clone()
    }

    fn save_doomed_session(&mut self, session_id: &str) {
        self.state.doomed = Some(DoomedSession {
            session_id: session_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        });
        self.persist();
    }

    fn clear_doomed_session(&mut self) {
        self.state.doomed = None;
        self.persist();
    }
}

fn load_state(path: &Path) -> Result<StoredState, String> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(StoredState::default())
        }
        Err(err) => return Err(format!("Failed to read session store: {}", err)),
    };

    serde_json::from_slice(&data).map_err(|err| format!("Failed to parse session store: {}", err))
}

fn save_state(path: &Path, state: &StoredState) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create session store dir: {}", err))?;
    }

    let payload = serde_json::to_vec_pretty(state)
        .map_err(|err| format!("Failed to serialize session store: {}", err))?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, payload)
        .map_err(|err| format!("Failed to write session store: {}", err))?;
    fs::rename(&tmp_path, path).map_err(|err| format!("Failed to commit session store: {}", err))
}

/// In-memory store for tests and embedded hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: StoredState,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn session_id(&self) -> Option<String> {
        self.state.session_id.clone()
    }

    fn save_session_id(&mut self, session_id: &str) {
        self.state.session_id = Some(session_id.to_string());
    }

    fn doomed_session(&self) -> Option<DoomedSession> {
        self.state.doomed.clone()
    }

    fn save_doomed_session(&mut self, session_id: &str) {
        self.state.doomed = Some(DoomedSession {
            session_id: session_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        });
    }

    fn clear_doomed_session(&mut self) {
        self.state.doomed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_across_instances() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("session.json");

        {
            let mut store = FileSessionStore::new(&path);
            assert_eq!(store.session_id(), None);
            store.save_session_id("abc123");
            store.save_doomed_session("abc123");
        }

        let store = FileSessionStore::new(&path);
        assert_eq!(store.session_id(), Some("abc123".to_string()));
        let doomed = store.doomed_session().expect("doomed marker");
        assert_eq!(doomed.session_id, "abc123");
        assert!(chrono::DateTime::parse_from_rfc3339(&doomed.created_at).is_ok());
    }

    #[test]
    fn clearing_the_marker_persists() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("session.json");

        let mut store = FileSessionStore::new(&path);
        store.save_doomed_session("dying");
        store.clear_doomed_session();

        let reloaded = FileSessionStore::new(&path);
        assert_eq!(reloaded.doomed_session(), None);
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("session.json");
        fs::write(&path, b"not json").expect("write");

        let store = FileSessionStore::new(&path);
        assert_eq!(store.session_id(), None);
        assert_eq!(store.doomed_session(), None);
    }
}
