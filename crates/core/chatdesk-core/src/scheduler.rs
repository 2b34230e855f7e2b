//! Clocks and cancellable timers
//!
//! Every artificial wait in the widget (typing delay, quick-action menu
//! delay, reconnect backoff, simulated agent reply) goes through a
//! [`Scheduler`]. Fired timers come back to the event loop as
//! [`FiredTimer`] values, so tests can swap in a virtual clock.

use crate::engine::EngineReply;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Handle of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Work to perform when a timer fires
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledTask {
    /// Hide the typing indicator and apply the engine's answer
    DeliverReply(EngineReply),
    /// Show the assistant quick-action menu again
    ShowQuickActions,
    /// Retry the relay connection
    Reconnect,
    /// Render a simulated agent reply
    FallbackReply(String),
}

/// A timer that reached its deadline
#[derive(Debug, Clone, PartialEq)]
pub struct FiredTimer {
    /// Timer that fired
    pub id: TimerId,
    /// Its task
    pub task: ScheduledTask,
}

/// Schedules tasks after a delay
pub trait Scheduler: Send + Sync {
    /// Run `task` after `delay`
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerId;

    /// Drop a pending timer; unknown or fired ids are ignored
    fn cancel(&self, id: TimerId);
}

/// Scheduler on the tokio timer wheel, delivering into a channel
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<FiredTimer>,
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<TimerId, AbortHandle>>>,
}

impl TokioScheduler {
    /// Scheduler plus the receiver the event loop reads fired timers from
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiredTimer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                next_id: AtomicU64::new(1),
                pending: Arc::new(Mutex::new(HashMap::new())),
            },
            rx,
        )
    }

    /// Timers not yet fired or cancelled
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);
        trace!(timer = id.0, delay_ms = delay.as_millis() as u64, "timer scheduled");
        // Registered before the task can run, so a zero delay cannot fire first.
        let mut registry = self.pending.lock().ok();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut p) = pending.lock() {
                p.remove(&id);
            }
            let _ = tx.send(FiredTimer { id, task });
        });
        if let Some(p) = registry.as_mut() {
            p.insert(id, handle.abort_handle());
        }
        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some(handle) = self.pending.lock().ok().and_then(|mut p| p.remove(&id)) {
            trace!(timer = id.0, "timer cancelled");
            handle.abort();
        }
    }
}
