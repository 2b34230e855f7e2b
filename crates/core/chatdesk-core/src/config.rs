//! Configuration management and environment variable loading

use crate::relay::MAX_RECONNECT_DELAY;
use crate::{ChatError, Result};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Load environment variables from a .env file
///
/// Safe to call more than once. A missing file is not an error.
///
/// # Example
///
/// ```no_run
/// use chatdesk_core::load_env;
///
/// load_env().ok();
/// let url = std::env::var("CHATDESK_RELAY_URL").unwrap_or_default();
/// ```
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("✓ Loaded environment from: {}", path.display());
            Ok(())
        }
        Err(dotenvy::Error::LineParse(line, pos)) => Err(ChatError::config(format!(
            "Failed to parse .env file at line {}, position {}",
            line, pos
        ))),
        Err(dotenvy::Error::Io(_)) => {
            tracing::debug!("No .env file found - using system environment variables only");
            Ok(())
        }
        Err(e) => Err(ChatError::config(format!(
            "Failed to load .env file: {}",
            e
        ))),
    }
}

/// Load environment variables from a specific file
pub fn load_env_from_path<P: AsRef<Path>>(path: P) -> Result<()> {
    match dotenvy::from_path(path.as_ref()) {
        Ok(_) => {
            tracing::info!("✓ Loaded environment from: {}", path.as_ref().display());
            Ok(())
        }
        Err(e) => Err(ChatError::config(format!(
            "Failed to load {} environment file: {}",
            path.as_ref().display(),
            e
        ))),
    }
}

/// Get optional environment variable with default
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as integer
pub fn get_env_int<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Default relay endpoint of the agent backend
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:8000/ws/chat";

/// Upper bound for `max_reconnect_attempts`
pub const MAX_RECONNECT_ATTEMPTS: u32 = 100;

/// Timing and limit knobs for one widget instance
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// WebSocket endpoint of the agent backend
    pub relay_url: String,
    /// Reconnects attempted after a failed or dropped connection before fallback
    pub max_reconnect_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * reconnect_base`
    pub reconnect_base: Duration,
    /// Fixed part of the simulated typing delay
    pub typing_delay: Duration,
    /// Upper bound of the random jitter added to `typing_delay`
    pub typing_jitter: Duration,
    /// Delay before the quick-action menu reappears after a bot reply
    pub quick_actions_delay: Duration,
    /// Delay before a simulated agent answers in fallback mode
    pub fallback_delay: Duration,
    /// Lifetime of the session cookie
    pub session_ttl: Duration,
    /// Entries mirrored into the context window sent on join
    pub context_window: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            max_reconnect_attempts: 5,
            reconnect_base: Duration::from_millis(3000),
            typing_delay: Duration::from_millis(1500),
            typing_jitter: Duration::from_millis(1000),
            quick_actions_delay: Duration::from_millis(1000),
            fallback_delay: Duration::from_millis(2000),
            session_ttl: Duration::from_secs(15 * 60),
            context_window: 10,
        }
    }
}

impl WidgetConfig {
    /// Build a config from `CHATDESK_*` environment variables over the defaults
    pub fn from_env() -> Self {
        let d = Self::default();
        let ms = |key: &str, default: Duration| {
            Duration::from_millis(get_env_int(key, default.as_millis() as u64))
        };
        Self {
            relay_url: get_env_or("CHATDESK_RELAY_URL", &d.relay_url),
            max_reconnect_attempts: get_env_int(
                "CHATDESK_MAX_RECONNECT_ATTEMPTS",
                d.max_reconnect_attempts,
            ),
            reconnect_base: ms("CHATDESK_RECONNECT_BASE_MS", d.reconnect_base),
            typing_delay: ms("CHATDESK_TYPING_DELAY_MS", d.typing_delay),
            typing_jitter: ms("CHATDESK_TYPING_JITTER_MS", d.typing_jitter),
            quick_actions_delay: ms("CHATDESK_QUICK_ACTIONS_DELAY_MS", d.quick_actions_delay),
            fallback_delay: ms("CHATDESK_FALLBACK_DELAY_MS", d.fallback_delay),
            session_ttl: Duration::from_secs(get_env_int(
                "CHATDESK_SESSION_TTL_SECS",
                d.session_ttl.as_secs(),
            )),
            context_window: get_env_int("CHATDESK_CONTEXT_WINDOW", d.context_window),
        }
    }

    /// Reject configs the widget cannot run with
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.relay_url).map_err(|e| {
            ChatError::config(format!("Invalid relay URL '{}': {}", self.relay_url, e))
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ChatError::config(format!(
                "Relay URL must use ws:// or wss://, got '{}'",
                parsed.scheme()
            )));
        }
        if self.context_window == 0 {
            return Err(ChatError::config("Context window must hold at least one entry"));
        }
        if self.max_reconnect_attempts > MAX_RECONNECT_ATTEMPTS {
            return Err(ChatError::config(format!(
                "At most {} reconnect attempts are supported, got {}",
                MAX_RECONNECT_ATTEMPTS, self.max_reconnect_attempts
            )));
        }
        if self.reconnect_base > MAX_RECONNECT_DELAY {
            return Err(ChatError::config(format!(
                "Reconnect base delay must not exceed {}s",
                MAX_RECONNECT_DELAY.as_secs()
            )));
        }
        if self.session_ttl.is_zero() {
            return Err(ChatError::config("Session TTL must be positive"));
        }
        Ok(())
    }

    /// Config with every artificial delay fixed and jitter removed
    pub fn deterministic() -> Self {
        Self {
            typing_jitter: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_env_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.env");
        std::fs::write(&path, "CHATDESK_TEST_FROM_FILE=ws://relay.test/ws\n").unwrap();

        load_env_from_path(&path).unwrap();
        assert_eq!(
            env::var("CHATDESK_TEST_FROM_FILE").as_deref(),
            Ok("ws://relay.test/ws")
        );
        env::remove_var("CHATDESK_TEST_FROM_FILE");

        let missing = dir.path().join("absent.env");
        assert!(matches!(load_env_from_path(&missing), Err(ChatError::Config(_))));
    }

    #[test]
    fn test_get_env_int() {
        env::set_var("CHATDESK_TEST_INT", "42");
        assert_eq!(get_env_int("CHATDESK_TEST_INT", 0), 42);
        assert_eq!(get_env_int("CHATDESK_NONEXISTENT", 99), 99);
        env::remove_var("CHATDESK_TEST_INT");
    }

    #[test]
    fn test_defaults_match_widget_contract() {
        let config = WidgetConfig::default();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_base, Duration::from_millis(3000));
        assert_eq!(config.session_ttl, Duration::from_secs(900));
        assert_eq!(config.context_window, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_http_scheme() {
        let config = WidgetConfig {
            relay_url: "http://example.com/chat".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ChatError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_window() {
        let config = WidgetConfig {
            context_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_reconnect_settings() {
        let too_many = WidgetConfig {
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS + 1,
            ..Default::default()
        };
        assert!(matches!(too_many.validate(), Err(ChatError::Config(_))));

        let too_slow = WidgetConfig {
            reconnect_base: MAX_RECONNECT_DELAY + Duration::from_millis(1),
            ..Default::default()
        };
        assert!(matches!(too_slow.validate(), Err(ChatError::Config(_))));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        env::set_var("CHATDESK_RECONNECT_BASE_MS", "250");
        let config = WidgetConfig::from_env();
        assert_eq!(config.reconnect_base, Duration::from_millis(250));
        env::remove_var("CHATDESK_RECONNECT_BASE_MS");
    }
}
