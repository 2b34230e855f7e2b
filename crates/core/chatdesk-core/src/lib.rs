//! Chatdesk core
//!
//! The client-side core of a customer-support chat widget:
//!
//! - a scripted keyword engine answering in assistant ("IA") mode
//! - an intake form gating the hand-off to a live agent
//! - a relay client speaking the backend's JSON protocol over WebSocket,
//!   with reconnect backoff and a simulated fallback
//! - session and mode persistence so a reload resumes an agent chat
//!
//! Rendering, storage and timers are injected, so the same controller runs
//! behind a browser bridge, a terminal, or a test harness.
//!
//! # Example
//!
//! ```no_run
//! use chatdesk_core::*;
//! use std::sync::Arc;
//!
//! # struct NoopRenderer;
//! # impl Renderer for NoopRenderer {
//! #     fn render_message(&mut self, _: &ConversationMessage) {}
//! #     fn set_typing(&mut self, _: bool) {}
//! #     fn set_transfer(&mut self, _: bool) {}
//! #     fn show_quick_actions(&mut self, _: &[QuickAction]) {}
//! #     fn hide_quick_actions(&mut self) {}
//! #     fn set_header(&mut self, _: &HeaderLabels) {}
//! #     fn show_intake_form(&mut self) {}
//! #     fn hide_intake_form(&mut self) {}
//! #     fn show_form_errors(&mut self, _: &[FieldError]) {}
//! # }
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let storage = Arc::new(MemoryStorage::new(Arc::new(SystemClock)));
//!     let (widget, ui) = ChatWidget::new(
//!         WidgetConfig::from_env(),
//!         PageContext::default(),
//!         Box::new(NoopRenderer),
//!         WidgetStorage { cookies: storage.clone(), store: storage },
//!     )?;
//!     ui.send(UiEvent::Text("Quanto custa um app?".into())).ok();
//!     widget.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod notices;
pub mod relay;
pub mod render;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod testing;
pub mod types;
pub mod utils;

pub use config::{get_env_int, get_env_or, load_env, load_env_from_path, WidgetConfig};
pub use controller::{ChatController, ControllerDeps, InputOutcome};
pub use engine::{EngineReply, Intent, KeywordEngine, Responder};
pub use error::{ChatError, Result};
pub use relay::protocol::{InboundEvent, OutboundMessage};
pub use relay::transport::{ConnectionId, Connector, RelayConnection, RelayEvent, WsConnector};
pub use relay::{ConnectionState, Delivery, RelayClient, RelaySignal};
pub use render::Renderer;
pub use runtime::{ChatWidget, UiEvent, WidgetStorage};
pub use scheduler::{Clock, FiredTimer, ScheduledTask, Scheduler, SystemClock, TimerId, TokioScheduler};
pub use session::{ModeRecord, Session};
pub use storage::{CookieJar, FileStorage, KeyValueStore, MemoryStorage};
pub use types::*;
pub use utils::logger::{init_logging, subscribe_logs, LogEvent};
pub use utils::redact_pii;
