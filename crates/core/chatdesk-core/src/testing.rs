//! Testing utilities: virtual time, a recording renderer, a fake relay
//! transport and a harness wiring them to a [`ChatController`].

use crate::config::WidgetConfig;
use crate::controller::{ChatController, ControllerDeps};
use crate::engine::{KeywordEngine, Responder};
use crate::relay::transport::{ConnectionId, Connector, RelayConnection, RelayEvent};
use crate::render::Renderer;
use crate::scheduler::{Clock, FiredTimer, ScheduledTask, Scheduler, TimerId};
use crate::storage::MemoryStorage;
use crate::types::*;
use crate::{ChatError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct ManualState {
    elapsed: Duration,
    next_id: u64,
    timers: BTreeMap<(Duration, u64), ScheduledTask>,
}

/// Virtual clock and timer queue; time only moves when told to
pub struct ManualScheduler {
    start: DateTime<Utc>,
    state: Mutex<ManualState>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Clock starting at 2026-01-01T12:00:00Z
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::from_timestamp(1_767_268_800, 0).unwrap_or_default())
    }

    /// Clock starting at `start`
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                next_id: 1,
                timers: BTreeMap::new(),
            }),
        }
    }

    /// Virtual time since start
    pub fn elapsed(&self) -> Duration {
        lock(&self.state).elapsed
    }

    /// Jump to `elapsed` without firing anything
    pub fn set_elapsed(&self, elapsed: Duration) {
        lock(&self.state).elapsed = elapsed;
    }

    /// Move time forward by `by`, returning every timer that came due in
    /// deadline order. Timers scheduled while handling these are not included.
    pub fn advance(&self, by: Duration) -> Vec<FiredTimer> {
        let target = self.elapsed() + by;
        let mut fired = Vec::new();
        while let Some(timer) = self.pop_due(target) {
            fired.push(timer);
        }
        self.set_elapsed(target);
        fired
    }

    /// Earliest timer due at or before `until`; time moves to its deadline
    pub fn pop_due(&self, until: Duration) -> Option<FiredTimer> {
        let mut state = lock(&self.state);
        let key = *state.timers.keys().next()?;
        if key.0 > until {
            return None;
        }
        let task = state.timers.remove(&key)?;
        state.elapsed = state.elapsed.max(key.0);
        Some(FiredTimer {
            id: TimerId(key.1),
            task,
        })
    }

    /// Deadline of a pending timer, as elapsed time
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        lock(&self.state)
            .timers
            .keys()
            .find(|(_, t)| *t == id.0)
            .map(|(d, _)| *d)
    }

    /// Whether `id` is still pending
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadline(id).is_some()
    }

    /// Number of pending timers
    pub fn pending_count(&self) -> usize {
        lock(&self.state).timers.len()
    }

    /// Pending tasks in deadline order
    pub fn pending_tasks(&self) -> Vec<ScheduledTask> {
        lock(&self.state).timers.values().cloned().collect()
    }

    /// Drop every pending timer
    pub fn clear(&self) {
        lock(&self.state).timers.clear();
    }
}

impl Clock for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.start + elapsed
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerId {
        let mut state = lock(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.elapsed + delay;
        state.timers.insert((deadline, id), task);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        lock(&self.state).timers.retain(|(_, t), _| *t != id.0);
    }
}

/// One call made on a [`RecordingRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// `render_message`
    Message(ConversationMessage),
    /// `set_typing`
    Typing(bool),
    /// `set_transfer`
    Transfer(bool),
    /// `show_quick_actions`
    QuickActions(Vec<QuickAction>),
    /// `hide_quick_actions`
    HideQuickActions,
    /// `set_header`
    Header(HeaderLabels),
    /// `show_intake_form`
    ShowForm,
    /// `hide_intake_form`
    HideForm,
    /// `show_form_errors`
    FormErrors(Vec<FieldError>),
}

/// Renderer that records calls; clones share the record
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    pub fn events(&self) -> Vec<RenderEvent> {
        lock(&self.events).clone()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    /// Rendered messages in order
    pub fn messages(&self) -> Vec<ConversationMessage> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of rendered bot messages
    pub fn bot_texts(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.is_bot())
            .map(|m| m.text)
            .collect()
    }

    /// Latest bot message text
    pub fn last_bot_text(&self) -> Option<String> {
        self.bot_texts().pop()
    }

    fn last_matching<T>(&self, f: impl Fn(&RenderEvent) -> Option<T>) -> Option<T> {
        lock(&self.events).iter().rev().find_map(f)
    }

    /// Whether the typing indicator is showing
    pub fn typing_visible(&self) -> bool {
        self.last_matching(|e| match e {
            RenderEvent::Typing(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(false)
    }

    /// Whether the transfer indicator is showing
    pub fn transfer_visible(&self) -> bool {
        self.last_matching(|e| match e {
            RenderEvent::Transfer(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(false)
    }

    /// Menu currently showing, if any
    pub fn quick_actions(&self) -> Option<Vec<QuickAction>> {
        self.last_matching(|e| match e {
            RenderEvent::QuickActions(a) => Some(Some(a.clone())),
            RenderEvent::HideQuickActions => Some(None),
            _ => None,
        })
        .flatten()
    }

    /// Current header
    pub fn header(&self) -> Option<HeaderLabels> {
        self.last_matching(|e| match e {
            RenderEvent::Header(h) => Some(h.clone()),
            _ => None,
        })
    }

    /// Whether the intake form is showing
    pub fn form_visible(&self) -> bool {
        self.last_matching(|e| match e {
            RenderEvent::ShowForm => Some(true),
            RenderEvent::HideForm => Some(false),
            _ => None,
        })
        .unwrap_or(false)
    }

    /// Latest field errors shown
    pub fn form_errors(&self) -> Option<Vec<FieldError>> {
        self.last_matching(|e| match e {
            RenderEvent::FormErrors(errs) => Some(errs.clone()),
            _ => None,
        })
    }

    fn push(&self, event: RenderEvent) {
        lock(&self.events).push(event);
    }
}

impl Renderer for RecordingRenderer {
    fn render_message(&mut self, message: &ConversationMessage) {
        self.push(RenderEvent::Message(message.clone()));
    }

    fn set_typing(&mut self, visible: bool) {
        self.push(RenderEvent::Typing(visible));
    }

    fn set_transfer(&mut self, visible: bool) {
        self.push(RenderEvent::Transfer(visible));
    }

    fn show_quick_actions(&mut self, actions: &[QuickAction]) {
        self.push(RenderEvent::QuickActions(actions.to_vec()));
    }

    fn hide_quick_actions(&mut self) {
        self.push(RenderEvent::HideQuickActions);
    }

    fn set_header(&mut self, labels: &HeaderLabels) {
        self.push(RenderEvent::Header(labels.clone()));
    }

    fn show_intake_form(&mut self) {
        self.push(RenderEvent::ShowForm);
    }

    fn hide_intake_form(&mut self) {
        self.push(RenderEvent::HideForm);
    }

    fn show_form_errors(&mut self, errors: &[FieldError]) {
        self.push(RenderEvent::FormErrors(errors.to_vec()));
    }
}

#[derive(Default)]
struct FakeState {
    attempts: Vec<ConnectionId>,
    urls: Vec<String>,
    sent: Vec<(ConnectionId, String)>,
    closed: Vec<ConnectionId>,
    fail: bool,
}

/// Connector that records attempts and frames; events are injected by hand
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    /// Connector accepting every attempt
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail synchronously
    pub fn fail_connects(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Every connection id requested
    pub fn attempts(&self) -> Vec<ConnectionId> {
        lock(&self.state).attempts.clone()
    }

    /// URLs requested
    pub fn urls(&self) -> Vec<String> {
        lock(&self.state).urls.clone()
    }

    /// Most recent connection id
    pub fn last_connection(&self) -> Option<ConnectionId> {
        lock(&self.state).attempts.last().copied()
    }

    /// Frames written on any connection
    pub fn sent_frames(&self) -> Vec<String> {
        lock(&self.state).sent.iter().map(|(_, f)| f.clone()).collect()
    }

    /// Frames parsed as JSON
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent_frames()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// Connections closed locally
    pub fn closed(&self) -> Vec<ConnectionId> {
        lock(&self.state).closed.clone()
    }
}

struct FakeConnection {
    id: ConnectionId,
    state: Arc<Mutex<FakeState>>,
}

impl RelayConnection for FakeConnection {
    fn send(&self, frame: String) -> Result<()> {
        lock(&self.state).sent.push((self.id, frame));
        Ok(())
    }

    fn close(&self) {
        lock(&self.state).closed.push(self.id);
    }
}

impl Connector for FakeConnector {
    fn connect(&self, id: ConnectionId, url: &str) -> Result<Box<dyn RelayConnection>> {
        let mut state = lock(&self.state);
        state.attempts.push(id);
        state.urls.push(url.to_string());
        if state.fail {
            return Err(ChatError::connection("connection refused"));
        }
        Ok(Box::new(FakeConnection {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Valid intake form contents
pub fn sample_intake() -> IntakeDraft {
    IntakeDraft {
        name: "Ana Souza".into(),
        email: "ana@example.com".into(),
        phone: "(31) 99999-0000".into(),
        project: ProjectType::Site,
        urgency: Urgency::Alta,
        message: "Preciso de um site institucional".into(),
    }
}

/// A started controller on virtual time with recording collaborators
pub struct TestHarness {
    /// Controller under test
    pub controller: ChatController,
    /// Virtual clock and timers
    pub scheduler: Arc<ManualScheduler>,
    /// Rendered output
    pub renderer: RecordingRenderer,
    /// Relay transport
    pub connector: FakeConnector,
    /// Cookie and local storage
    pub storage: Arc<MemoryStorage>,
    config: WidgetConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Keyword engine, deterministic timings
    pub fn new() -> Self {
        Self::with_responder(Box::new(KeywordEngine::new()))
    }

    /// Custom responder, deterministic timings
    pub fn with_responder(responder: Box<dyn Responder>) -> Self {
        Self::with_config(WidgetConfig::deterministic(), responder)
    }

    /// Custom config and responder
    pub fn with_config(config: WidgetConfig, responder: Box<dyn Responder>) -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let storage = Arc::new(MemoryStorage::new(scheduler.clone()));
        Self::assemble(config, scheduler, storage, responder)
    }

    fn assemble(
        config: WidgetConfig,
        scheduler: Arc<ManualScheduler>,
        storage: Arc<MemoryStorage>,
        responder: Box<dyn Responder>,
    ) -> Self {
        let renderer = RecordingRenderer::new();
        let connector = FakeConnector::new();
        let page = PageContext {
            loaded_at: scheduler.now(),
            ..PageContext::default()
        };
        let deps = ControllerDeps {
            renderer: Box::new(renderer.clone()),
            scheduler: scheduler.clone(),
            clock: scheduler.clone(),
            cookies: storage.clone(),
            store: storage.clone(),
            connector: Arc::new(connector.clone()),
            responder,
        };
        let mut controller = ChatController::new(config.clone(), page, deps);
        controller.start();
        Self {
            controller,
            scheduler,
            renderer,
            connector,
            storage,
            config,
        }
    }

    /// Simulate a page reload: same storage and clock, everything else new
    pub fn reload(self) -> Self {
        let Self {
            scheduler,
            storage,
            config,
            ..
        } = self;
        scheduler.clear();
        Self::assemble(config, scheduler, storage, Box::new(KeywordEngine::new()))
    }

    /// Move virtual time, dispatching timers as they come due
    pub fn advance(&mut self, by: Duration) {
        let target = self.scheduler.elapsed() + by;
        while let Some(fired) = self.scheduler.pop_due(target) {
            self.controller.handle_timer(fired);
        }
        self.scheduler.set_elapsed(target);
    }

    fn current_connection(&self) -> ConnectionId {
        self.controller
            .relay()
            .current_connection()
            .unwrap_or(ConnectionId(0))
    }

    /// Complete the handshake of the current connection
    pub fn open_relay(&mut self) -> ConnectionId {
        let id = self.current_connection();
        self.controller.handle_relay_event(RelayEvent::Opened(id));
        id
    }

    /// Deliver an inbound frame on the current connection
    pub fn relay_frame(&mut self, json: &str) {
        let id = self.current_connection();
        self.controller
            .handle_relay_event(RelayEvent::Frame(id, json.to_string()));
    }

    /// Drop the current connection
    pub fn close_relay(&mut self, reason: &str) {
        let id = self.current_connection();
        self.controller
            .handle_relay_event(RelayEvent::Closed(id, reason.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_fires_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let late = scheduler.schedule(Duration::from_millis(200), ScheduledTask::Reconnect);
        let early = scheduler.schedule(Duration::from_millis(100), ScheduledTask::ShowQuickActions);
        let cancelled = scheduler.schedule(Duration::from_millis(150), ScheduledTask::Reconnect);
        scheduler.cancel(cancelled);

        let fired: Vec<TimerId> = scheduler
            .advance(Duration::from_millis(250))
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(fired, vec![early, late]);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_clock_follows_virtual_time() {
        let scheduler = ManualScheduler::new();
        let t0 = scheduler.now();
        scheduler.set_elapsed(Duration::from_secs(90));
        assert_eq!((scheduler.now() - t0).num_seconds(), 90);
    }
}
