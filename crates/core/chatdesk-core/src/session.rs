//! Session identity and the persisted mode record

use crate::scheduler::Clock;
use crate::storage::{CookieJar, KeyValueStore};
use crate::types::Mode;
use crate::Result;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cookie holding the session id
pub const SESSION_COOKIE: &str = "chat_session_id";

/// Visitor session, shared read-only with the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque id
    pub id: String,
    /// Whether this visit created the id
    pub fresh: bool,
}

impl Session {
    /// Local storage key of this session's mode record
    pub fn state_key(&self) -> String {
        format!("chat_state_{}", self.id)
    }
}

/// New id: `chat_<unix millis>_<9 random lowercase alphanumerics>`
pub fn generate_session_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("chat_{}_{}", now.timestamp_millis(), suffix)
}

/// Reuse the cookie's session or start a new one
///
/// The cookie is only written for a new session, so its expiry counts from
/// creation and reloads do not extend it.
pub fn load_or_create_session(
    cookies: &dyn CookieJar,
    clock: &dyn Clock,
    ttl: Duration,
) -> Session {
    if let Some(id) = cookies.get_cookie(SESSION_COOKIE) {
        if !id.trim().is_empty() {
            debug!(session_id = %id, "resuming session");
            return Session { id, fresh: false };
        }
    }
    let id = generate_session_id(clock.now());
    info!(session_id = %id, "new chat session");
    if let Err(e) = cookies.set_cookie(SESSION_COOKIE, &id, ttl) {
        warn!(error = %e, "could not persist session cookie");
    }
    Session { id, fresh: true }
}

/// JSON stored under [`Session::state_key`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeRecord {
    /// Live-agent chat was active
    pub human_chat_active: bool,
    /// Visitor had left the assistant (form or agent)
    pub waiting_for_human: bool,
    /// When the record was written
    pub timestamp: DateTime<Utc>,
}

impl ModeRecord {
    /// Record describing `mode`
    pub fn for_mode(mode: Mode, now: DateTime<Utc>) -> Self {
        Self {
            human_chat_active: mode == Mode::Human,
            waiting_for_human: mode != Mode::Ia,
            timestamp: now,
        }
    }

    /// Whether a reload should try to resume the agent chat
    pub fn should_resume_human(&self) -> bool {
        self.human_chat_active
    }
}

/// Write the mode record for `session`
pub fn save_mode_record(
    store: &dyn KeyValueStore,
    session: &Session,
    record: &ModeRecord,
) -> Result<()> {
    let json = serde_json::to_string(record)?;
    store.set_item(&session.state_key(), &json)
}

/// Read the mode record; malformed JSON counts as absent and is removed
pub fn load_mode_record(store: &dyn KeyValueStore, session: &Session) -> Option<ModeRecord> {
    let key = session.state_key();
    let raw = store.get_item(&key)?;
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(error = %e, "dropping malformed mode record");
            if let Err(e) = store.remove_item(&key) {
                warn!(error = %e, "could not remove mode record");
            }
            None
        }
    }
}
