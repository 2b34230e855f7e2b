//! Browser-style storage: expiring cookies and a key-value store
//!
//! The widget only needs two primitives from its host: a cookie jar with
//! max-age expiry and a string key-value store. Both are traits so the host
//! (or a test) injects them.

use crate::scheduler::Clock;
use crate::{ChatError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Cookie jar with max-age expiry
pub trait CookieJar: Send + Sync {
    /// Value of an unexpired cookie
    fn get_cookie(&self, name: &str) -> Option<String>;

    /// Set a cookie that expires after `max_age`
    fn set_cookie(&self, name: &str, value: &str, max_age: Duration) -> Result<()>;
}

/// Per-browser string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Stored value
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store a value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; missing keys are fine
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StorageState {
    #[serde(default)]
    cookies: HashMap<String, StoredCookie>,
    #[serde(default)]
    items: HashMap<String, String>,
}

impl StorageState {
    fn live_cookie(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        self.cookies
            .get(name)
            .filter(|c| c.expires_at > now)
            .map(|c| c.value.clone())
    }

    fn put_cookie(&mut self, name: &str, value: &str, max_age: Duration, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::zero());
        self.cookies.insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
    }
}

fn poisoned() -> ChatError {
    ChatError::storage("storage lock poisoned")
}

/// In-memory storage, gone with the process
pub struct MemoryStorage {
    clock: Arc<dyn Clock>,
    state: Mutex<StorageState>,
}

impl MemoryStorage {
    /// Empty storage reading time from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(StorageState::default()),
        }
    }
}

impl CookieJar for MemoryStorage {
    fn get_cookie(&self, name: &str) -> Option<String> {
        let now = self.clock.now();
        self.state.lock().ok()?.live_cookie(name, now)
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
        let now = self.clock.now();
        self.state
            .lock()
            .map_err(|_| poisoned())?
            .put_cookie(name, value, max_age, now);
        Ok(())
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.state.lock().ok()?.items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .map_err(|_| poisoned())?
            .items
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.state.lock().map_err(|_| poisoned())?.items.remove(key);
        Ok(())
    }
}

/// JSON-file storage so a restarted process behaves like a page reload
pub struct FileStorage {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<StorageState>,
}

impl FileStorage {
    /// Open `path`, starting empty when the file is missing or unreadable
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding unreadable storage file");
                StorageState::default()
            }),
            Err(_) => {
                debug!(path = %path.display(), "no storage file yet");
                StorageState::default()
            }
        };
        Self {
            path,
            clock,
            state: Mutex::new(state),
        }
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write through a temp file and rename
    fn flush(&self, state: &StorageState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(state)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut StorageState)) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        f(&mut state);
        self.flush(&state)
    }
}

impl CookieJar for FileStorage {
    fn get_cookie(&self, name: &str) -> Option<String> {
        let now = self.clock.now();
        self.state.lock().ok()?.live_cookie(name, now)
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
        let now = self.clock.now();
        self.update(|s| s.put_cookie(name, value, max_age, now))
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.state.lock().ok()?.items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.update(|s| {
            s.items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.update(|s| {
            s.items.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualScheduler;

    #[test]
    fn test_cookie_expires_after_max_age() {
        let clock = Arc::new(ManualScheduler::new());
        let storage = MemoryStorage::new(clock.clone());
        storage
            .set_cookie("chat_session_id", "abc", Duration::from_secs(900))
            .unwrap();

        clock.set_elapsed(Duration::from_secs(899));
        assert_eq!(storage.get_cookie("chat_session_id").as_deref(), Some("abc"));

        clock.set_elapsed(Duration::from_secs(900));
        assert_eq!(storage.get_cookie("chat_session_id"), None);
    }

    #[test]
    fn test_items_round_trip() {
        let storage = MemoryStorage::new(Arc::new(ManualScheduler::new()));
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").as_deref(), Some("v"));
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k"), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("storage.json");
        let clock: Arc<dyn Clock> = Arc::new(ManualScheduler::new());

        let first = FileStorage::open(&path, clock.clone());
        first.set_item("chat_state_x", "{}").unwrap();
        first
            .set_cookie("chat_session_id", "x", Duration::from_secs(60))
            .unwrap();

        let second = FileStorage::open(&path, clock);
        assert_eq!(second.get_item("chat_state_x").as_deref(), Some("{}"));
        assert_eq!(second.get_cookie("chat_session_id").as_deref(), Some("x"));
    }

    #[test]
    fn test_file_storage_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();
        let storage = FileStorage::open(&path, Arc::new(ManualScheduler::new()));
        assert_eq!(storage.get_item("anything"), None);
    }
}
