//! Logging setup and log tailing

use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// One captured log record, as seen by log tailers
#[derive(Clone, Debug, Serialize)]
pub struct LogEvent {
    /// Level name (`INFO`, `WARN`, ...)
    pub level: String,
    /// Module path of the emitting code
    pub target: String,
    /// Rendered message plus structured fields
    pub message: String,
    /// RFC 3339 capture time
    pub time: String,
}

static LOG_TX: OnceCell<broadcast::Sender<LogEvent>> = OnceCell::new();

/// Subscribe to captured log events; `None` until `init_logging` ran
pub fn subscribe_logs() -> Option<broadcast::Receiver<LogEvent>> {
    LOG_TX.get().map(|tx| tx.subscribe())
}

struct BroadcastLayer {
    tx: broadcast::Sender<LogEvent>,
}

impl<S> Layer<S> for BroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        use tracing::field::{Field, Visit};
        struct MsgVisitor {
            msg: String,
            fields: Vec<String>,
        }
        impl Visit for MsgVisitor {
            fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.msg = format!("{:?}", value);
                } else {
                    self.fields.push(format!("{}={:?}", field.name(), value));
                }
            }
            fn record_str(&mut self, field: &Field, value: &str) {
                if field.name() == "message" {
                    self.msg = value.to_string();
                } else {
                    self.fields.push(format!("{}={}", field.name(), value));
                }
            }
        }
        let mut visitor = MsgVisitor {
            msg: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);
        let mut message = visitor.msg;
        if !visitor.fields.is_empty() {
            message.push(' ');
            message.push_str(&visitor.fields.join(" "));
        }
        let meta = event.metadata();
        let ev = LogEvent {
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message,
            time: chrono::Utc::now().to_rfc3339(),
        };
        let _ = self.tx.send(ev);
    }
}

/// Initialize the global logging system
///
/// `CHATDESK_LOG_LEVEL` sets the default filter; `RUST_LOG` wins when set.
/// With `to_stderr` off, records only reach `subscribe_logs` tailers.
pub fn init_logging(to_stderr: bool) {
    let level = std::env::var("CHATDESK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    let tx = LOG_TX
        .get_or_init(|| {
            let (tx, _rx) = broadcast::channel(1024);
            tx
        })
        .clone();

    let stderr_layer = to_stderr
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(BroadcastLayer { tx })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_after_init() {
        init_logging(false);
        let mut rx = subscribe_logs().expect("logging initialized");
        tracing::warn!(session_id = "chat_1_abc", "relay offline");
        let ev = rx.try_recv().expect("event captured");
        assert_eq!(ev.level, "WARN");
        assert!(ev.message.contains("relay offline"));
        assert!(ev.message.contains("session_id=chat_1_abc"));
    }
}
