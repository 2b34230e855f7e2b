//! Conversation controller
//!
//! Owns the message log, the active [`Mode`] and the session, and is the
//! only component that talks to the [`Renderer`]. Everything it does is
//! synchronous: waits are scheduled through the [`Scheduler`] and come back
//! as [`FiredTimer`]s, relay activity comes back as [`RelayEvent`]s.
//!
//! ```text
//!        hand-off keyword / "Falar com Atendente"
//!   Ia ───────────────────────────────────────────▶ AwaitingHandoffForm
//!   ▲  ◀──────────────── cancel ─────────────────────┘      │
//!   │                                                 valid submit
//!   └──── "Voltar para IA" / agent_left ──── Human ◀────────┘
//! ```

use crate::config::WidgetConfig;
use crate::engine::{EngineReply, Responder};
use crate::notices;
use crate::relay::protocol::UserData;
use crate::relay::transport::{Connector, RelayEvent};
use crate::relay::{Delivery, RelayClient, RelaySignal};
use crate::render::Renderer;
use crate::scheduler::{Clock, FiredTimer, ScheduledTask, Scheduler, TimerId};
use crate::session::{self, ModeRecord, Session};
use crate::storage::{CookieJar, KeyValueStore};
use crate::types::{
    ClientIntakeRecord, ContextWindow, ConversationMessage, HeaderLabels, IntakeDraft, Mode,
    Origin, PageContext, QuickAction, AGENT_ACTIONS, ASSISTANT_ACTIONS,
};
use crate::{ChatError, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a visitor input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Blank input, nothing happened
    Ignored,
    /// An assistant reply is still pending
    Busy,
    /// The intake form is open; bot replies are blocked
    Blocked,
    /// Assistant reply scheduled
    Pending,
    /// Answered right away
    Handled,
    /// Sent towards the agent
    Forwarded(Delivery),
}

/// Collaborators injected into the controller
pub struct ControllerDeps {
    /// Presentation
    pub renderer: Box<dyn Renderer>,
    /// Timers
    pub scheduler: Arc<dyn Scheduler>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
    /// Session cookie storage
    pub cookies: Arc<dyn CookieJar>,
    /// Mode record storage
    pub store: Arc<dyn KeyValueStore>,
    /// Relay transport
    pub connector: Arc<dyn Connector>,
    /// Assistant answers
    pub responder: Box<dyn Responder>,
}

/// Drives one chat widget instance
pub struct ChatController {
    config: WidgetConfig,
    page: PageContext,
    session: Session,
    renderer: Box<dyn Renderer>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    responder: Box<dyn Responder>,
    relay: RelayClient,

    mode: Mode,
    messages: Vec<ConversationMessage>,
    context: ContextWindow,
    reply_timer: Option<TimerId>,
    quick_actions_timer: Option<TimerId>,
    form_open: bool,
    intake: Option<ClientIntakeRecord>,
}

impl ChatController {
    /// Build a controller; the session is loaded (or created) right away
    pub fn new(config: WidgetConfig, page: PageContext, deps: ControllerDeps) -> Self {
        let session =
            session::load_or_create_session(deps.cookies.as_ref(), deps.clock.as_ref(), config.session_ttl);
        let relay = RelayClient::new(
            &config,
            session.id.clone(),
            deps.connector,
            deps.scheduler.clone(),
            deps.clock.clone(),
        );
        let context = ContextWindow::new(config.context_window);
        Self {
            config,
            page,
            session,
            renderer: deps.renderer,
            scheduler: deps.scheduler,
            clock: deps.clock,
            store: deps.store,
            responder: deps.responder,
            relay,
            mode: Mode::Ia,
            messages: Vec::new(),
            context,
            reply_timer: None,
            quick_actions_timer: None,
            form_open: false,
            intake: None,
        }
    }

    /// Active mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Visitor session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Full message log
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Recent messages sent along with the relay join
    pub fn context(&self) -> &ContextWindow {
        &self.context
    }

    /// Relay client state
    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    /// Submitted intake, if any
    pub fn intake(&self) -> Option<&ClientIntakeRecord> {
        self.intake.as_ref()
    }

    /// Whether the intake form is showing
    pub fn is_form_open(&self) -> bool {
        self.form_open
    }

    /// Whether an assistant reply is waiting on its typing delay
    pub fn reply_pending(&self) -> bool {
        self.reply_timer.is_some()
    }

    /// Resume a live-agent chat from the stored mode record, or greet
    pub fn start(&mut self) {
        let record = session::load_mode_record(self.store.as_ref(), &self.session);
        if record.as_ref().map_or(false, ModeRecord::should_resume_human) {
            info!(session_id = %self.session.id, "resuming live-agent chat");
            self.set_mode(Mode::Human);
            self.renderer.set_header(&HeaderLabels::connecting());
            self.renderer.set_transfer(true);
            self.append_message(notices::RESUMING, Origin::Bot);
            let signals = self.relay.connect(UserData::new(&self.page, None));
            self.apply_signals(signals);
        } else {
            debug!(session_id = %self.session.id, fresh = self.session.fresh, "starting assistant chat");
            self.set_mode(Mode::Ia);
            self.renderer.set_header(&HeaderLabels::assistant());
            self.append_message(notices::WELCOME, Origin::Bot);
            self.renderer.show_quick_actions(&ASSISTANT_ACTIONS);
        }
    }

    /// Log, window and render a message
    pub fn append_message(&mut self, text: &str, origin: Origin) -> &ConversationMessage {
        let message = ConversationMessage {
            text: text.to_string(),
            origin,
            timestamp: self.clock.now(),
        };
        self.context.push(&message);
        self.renderer.render_message(&message);
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Text typed by the visitor
    pub fn handle_user_text(&mut self, text: &str) -> InputOutcome {
        let text = text.trim();
        if text.is_empty() {
            return InputOutcome::Ignored;
        }
        match self.mode {
            Mode::AwaitingHandoffForm => {
                debug!("input blocked while intake form is open");
                InputOutcome::Blocked
            }
            Mode::Ia => {
                if self.reply_pending() {
                    return InputOutcome::Busy;
                }
                self.clear_quick_actions();
                self.append_message(text, Origin::User);
                self.schedule_reply(text);
                InputOutcome::Pending
            }
            Mode::Human => {
                self.append_message(text, Origin::User);
                InputOutcome::Forwarded(self.relay.send_user_message(text))
            }
        }
    }

    /// Quick-action button press
    pub fn handle_quick_action(&mut self, action: QuickAction) -> InputOutcome {
        let allowed = if action.is_agent_action() {
            self.mode == Mode::Human
        } else {
            self.mode == Mode::Ia
        };
        if !allowed {
            debug!(?action, mode = %self.mode, "quick action not available in this mode");
            return InputOutcome::Ignored;
        }
        if self.mode == Mode::Ia && self.reply_pending() {
            return InputOutcome::Busy;
        }

        self.clear_quick_actions();
        self.append_message(action.label(), Origin::User);

        let fixed_reply = match action {
            QuickAction::TalkToAgent => {
                self.open_intake_form();
                return InputOutcome::Handled;
            }
            QuickAction::ReturnToAssistant => {
                self.return_to_ia();
                return InputOutcome::Handled;
            }
            QuickAction::ScheduleCall => notices::SCHEDULE_CALL,
            QuickAction::WhatsApp => notices::WHATSAPP,
            QuickAction::Email => notices::EMAIL,
            QuickAction::FormalProposal => notices::FORMAL_PROPOSAL,
            QuickAction::AppDevelopment
            | QuickAction::Websites
            | QuickAction::CustomSystems
            | QuickAction::RequestQuote => {
                self.schedule_reply(action.label());
                return InputOutcome::Pending;
            }
        };
        self.append_message(fixed_reply, Origin::Bot);
        self.renderer.show_quick_actions(&AGENT_ACTIONS);
        InputOutcome::Handled
    }

    /// Open the intake form; only valid from the assistant mode
    pub fn begin_handoff(&mut self) -> Result<()> {
        match self.mode {
            Mode::Ia => {
                self.open_intake_form();
                Ok(())
            }
            Mode::AwaitingHandoffForm => Ok(()),
            Mode::Human => Err(ChatError::invalid_state("already talking to an agent")),
        }
    }

    /// Validate and submit the intake form, then connect to an agent
    pub fn submit_intake(&mut self, draft: IntakeDraft) -> Result<ClientIntakeRecord> {
        if self.mode != Mode::AwaitingHandoffForm || !self.form_open {
            return Err(ChatError::invalid_state("no intake form is open"));
        }
        if let Err(errors) = draft.validate() {
            debug!(fields = ?errors.iter().map(|e| e.field()).collect::<Vec<_>>(), "intake rejected");
            self.renderer.show_form_errors(&errors);
            return Err(ChatError::Intake(errors));
        }

        let now = self.clock.now();
        let record = ClientIntakeRecord {
            name: draft.name.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.trim().to_string(),
            project: draft.project,
            urgency: draft.urgency,
            message: draft.message.trim().to_string(),
            page_url: self.page.page_url.clone(),
            referrer: self.page.referrer.clone(),
            time_on_page_secs: (now - self.page.loaded_at).num_seconds().max(0),
            session_id: self.session.id.clone(),
            timestamp: now,
        };
        info!(
            session_id = %record.session_id,
            project = ?record.project,
            urgency = ?record.urgency,
            "intake submitted"
        );

        self.form_open = false;
        self.renderer.hide_intake_form();
        self.set_mode(Mode::Human);
        self.renderer.set_header(&HeaderLabels::connecting());
        self.renderer.set_transfer(true);
        self.append_message(&notices::connecting(&record.name), Origin::Bot);

        let signals = self.relay.connect(UserData::new(&self.page, Some(&record)));
        self.intake = Some(record.clone());
        self.apply_signals(signals);
        Ok(record)
    }

    /// Close the form and go back to the assistant
    pub fn cancel_intake(&mut self) -> Result<()> {
        if self.mode != Mode::AwaitingHandoffForm {
            return Err(ChatError::invalid_state("no intake form is open"));
        }
        self.form_open = false;
        self.renderer.hide_intake_form();
        self.set_mode(Mode::Ia);
        self.append_message(notices::HANDOFF_CANCELLED, Origin::Bot);
        self.renderer.show_quick_actions(&ASSISTANT_ACTIONS);
        Ok(())
    }

    /// Leave the agent chat and re-enable the assistant
    pub fn return_to_ia(&mut self) {
        match self.mode {
            Mode::Ia => {}
            Mode::AwaitingHandoffForm => {
                let _ = self.cancel_intake();
            }
            Mode::Human => {
                self.relay.disconnect();
                self.renderer.set_typing(false);
                self.renderer.set_transfer(false);
                self.set_mode(Mode::Ia);
                self.renderer.set_header(&HeaderLabels::assistant());
                self.append_message(notices::BACK_TO_ASSISTANT, Origin::Bot);
                self.renderer.show_quick_actions(&ASSISTANT_ACTIONS);
            }
        }
    }

    /// Apply a fired timer; timers no longer pending are ignored
    pub fn handle_timer(&mut self, fired: FiredTimer) {
        match fired.task {
            ScheduledTask::DeliverReply(reply) => {
                if self.reply_timer != Some(fired.id) {
                    debug!(timer = fired.id.0, "ignoring stale reply timer");
                    return;
                }
                self.reply_timer = None;
                self.renderer.set_typing(false);
                self.deliver_reply(reply);
            }
            ScheduledTask::ShowQuickActions => {
                if self.quick_actions_timer != Some(fired.id) {
                    return;
                }
                self.quick_actions_timer = None;
                if self.mode == Mode::Ia {
                    self.renderer.show_quick_actions(&ASSISTANT_ACTIONS);
                }
            }
            ScheduledTask::Reconnect => {
                let signals = self.relay.on_reconnect_timer(fired.id);
                self.apply_signals(signals);
            }
            ScheduledTask::FallbackReply(text) => {
                if self.relay.take_fallback_timer(fired.id) && self.mode == Mode::Human {
                    self.append_message(&text, Origin::Bot);
                }
            }
        }
    }

    /// Apply a relay transport event
    pub fn handle_relay_event(&mut self, event: RelayEvent) {
        let signals = self.relay.handle_event(event, &self.context);
        self.apply_signals(signals);
    }

    fn deliver_reply(&mut self, reply: EngineReply) {
        if self.mode != Mode::Ia {
            return;
        }
        match reply {
            EngineReply::Handoff => self.open_intake_form(),
            EngineReply::Text(text) => {
                self.append_message(&text, Origin::Bot);
                self.quick_actions_timer = Some(
                    self.scheduler
                        .schedule(self.config.quick_actions_delay, ScheduledTask::ShowQuickActions),
                );
            }
        }
    }

    fn schedule_reply(&mut self, text: &str) {
        let reply = match self.responder.respond(text) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "response engine failed");
                EngineReply::Text(notices::ENGINE_APOLOGY.to_string())
            }
        };
        self.renderer.set_typing(true);
        let delay = self.typing_delay();
        self.reply_timer = Some(self.scheduler.schedule(delay, ScheduledTask::DeliverReply(reply)));
    }

    fn typing_delay(&self) -> Duration {
        let jitter_ms = self.config.typing_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        self.config.typing_delay + Duration::from_millis(jitter)
    }

    fn open_intake_form(&mut self) {
        if self.form_open {
            return;
        }
        if let Some(id) = self.reply_timer.take() {
            self.scheduler.cancel(id);
            self.renderer.set_typing(false);
        }
        self.clear_quick_actions();
        self.form_open = true;
        self.set_mode(Mode::AwaitingHandoffForm);
        self.append_message(notices::HANDOFF_FORM, Origin::Bot);
        self.renderer.show_intake_form();
    }

    fn clear_quick_actions(&mut self) {
        if let Some(id) = self.quick_actions_timer.take() {
            self.scheduler.cancel(id);
        }
        self.renderer.hide_quick_actions();
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, session_id = %self.session.id, "mode changed");
        }
        self.mode = mode;
        let record = ModeRecord::for_mode(mode, self.clock.now());
        if let Err(e) = session::save_mode_record(self.store.as_ref(), &self.session, &record) {
            warn!(error = %e, "could not persist mode");
        }
    }

    fn apply_signals(&mut self, signals: Vec<RelaySignal>) {
        for signal in signals {
            self.apply_signal(signal);
        }
    }

    fn apply_signal(&mut self, signal: RelaySignal) {
        match signal {
            RelaySignal::Notice(text) => {
                self.append_message(&text, Origin::Bot);
            }
            RelaySignal::Offline => {
                self.renderer.set_transfer(false);
                self.append_message(notices::RELAY_OFFLINE, Origin::Bot);
            }
            RelaySignal::AgentMessage(text) => {
                self.renderer.set_typing(false);
                self.append_message(&text, Origin::Bot);
            }
            RelaySignal::Typing(typing) => self.renderer.set_typing(typing),
            RelaySignal::AgentConnected { name, role } => {
                info!(agent = %name, "agent connected");
                self.renderer.set_transfer(false);
                self.renderer.set_header(&HeaderLabels::agent(&name, &role));
                self.append_message(&notices::agent_greeting(&name, &role), Origin::Bot);
                self.renderer.show_quick_actions(&AGENT_ACTIONS);
            }
            RelaySignal::Waiting {
                position,
                wait_minutes,
            } => {
                self.append_message(&notices::waiting_in_queue(position, wait_minutes), Origin::Bot);
            }
            RelaySignal::AgentLeft(text) => {
                self.append_message(&text, Origin::Bot);
                self.return_to_ia();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockResponder;
    use crate::testing::{sample_intake, TestHarness};
    use crate::types::FieldError;

    #[test]
    fn test_start_greets_with_assistant_menu() {
        let h = TestHarness::new();
        assert_eq!(h.controller.mode(), Mode::Ia);
        assert_eq!(h.renderer.bot_texts(), vec![notices::WELCOME.to_string()]);
        assert_eq!(h.renderer.quick_actions(), Some(ASSISTANT_ACTIONS.to_vec()));
        assert_eq!(h.renderer.header(), Some(HeaderLabels::assistant()));
    }

    #[test]
    fn test_reply_arrives_after_typing_delay() {
        let mut h = TestHarness::new();
        assert_eq!(h.controller.handle_user_text("qual o prazo?"), InputOutcome::Pending);
        assert!(h.renderer.typing_visible());
        assert_eq!(h.controller.handle_user_text("oi?"), InputOutcome::Busy);

        h.advance(Duration::from_millis(1499));
        assert_eq!(h.renderer.bot_texts().len(), 1);

        h.advance(Duration::from_millis(1));
        assert!(!h.renderer.typing_visible());
        assert_eq!(
            h.renderer.last_bot_text().as_deref(),
            Some(crate::engine::responses::TIMELINE)
        );
        assert_eq!(h.renderer.quick_actions(), None);

        h.advance(Duration::from_millis(1000));
        assert_eq!(h.renderer.quick_actions(), Some(ASSISTANT_ACTIONS.to_vec()));
    }

    #[test]
    fn test_blank_input_ignored() {
        let mut h = TestHarness::new();
        assert_eq!(h.controller.handle_user_text("   "), InputOutcome::Ignored);
        assert_eq!(h.controller.messages().len(), 1);
    }

    #[test]
    fn test_handoff_keyword_opens_form() {
        let mut h = TestHarness::new();
        h.controller.handle_user_text("quero falar com um atendente");
        assert_eq!(h.controller.mode(), Mode::Ia);
        h.advance(Duration::from_millis(1500));

        assert_eq!(h.controller.mode(), Mode::AwaitingHandoffForm);
        assert!(h.controller.is_form_open());
        assert!(h.renderer.form_visible());
        assert_eq!(h.renderer.last_bot_text().as_deref(), Some(notices::HANDOFF_FORM));
        assert_eq!(h.controller.handle_user_text("olá?"), InputOutcome::Blocked);
    }

    #[test]
    fn test_talk_to_agent_action_opens_form_once() {
        let mut h = TestHarness::new();
        assert_eq!(
            h.controller.handle_quick_action(QuickAction::TalkToAgent),
            InputOutcome::Handled
        );
        assert_eq!(h.controller.mode(), Mode::AwaitingHandoffForm);
        h.controller.begin_handoff().unwrap();
        let forms = h
            .renderer
            .events()
            .into_iter()
            .filter(|e| *e == crate::testing::RenderEvent::ShowForm)
            .count();
        assert_eq!(forms, 1);
    }

    #[test]
    fn test_invalid_intake_keeps_form_open() {
        let mut h = TestHarness::new();
        h.controller.begin_handoff().unwrap();
        let draft = IntakeDraft {
            email: "not-an-email".into(),
            ..sample_intake()
        };
        let err = h.controller.submit_intake(draft).unwrap_err();
        assert_eq!(err.field_errors(), &[FieldError::InvalidEmail]);
        assert_eq!(h.controller.mode(), Mode::AwaitingHandoffForm);
        assert!(h.renderer.form_visible());
        assert_eq!(h.renderer.form_errors(), Some(vec![FieldError::InvalidEmail]));
        assert!(h.connector.attempts().is_empty());
    }

    #[test]
    fn test_valid_intake_connects_relay() {
        let mut h = TestHarness::new();
        h.controller.handle_user_text("oi");
        h.advance(Duration::from_millis(3000));
        h.controller.begin_handoff().unwrap();

        let record = h.controller.submit_intake(sample_intake()).unwrap();
        assert_eq!(record.session_id, h.controller.session().id);
        assert_eq!(h.controller.mode(), Mode::Human);
        assert!(h.renderer.transfer_visible());
        assert_eq!(h.renderer.header(), Some(HeaderLabels::connecting()));
        assert_eq!(h.connector.attempts().len(), 1);

        h.open_relay();
        let join = &h.connector.sent_json()[0];
        assert_eq!(join["userData"]["email"], "ana@example.com");
        assert_eq!(join["userData"]["source"], "Direto");
        assert_eq!(join["conversationHistory"][0]["content"], notices::WELCOME);
    }

    #[test]
    fn test_cancel_returns_to_assistant() {
        let mut h = TestHarness::new();
        h.controller.begin_handoff().unwrap();
        h.controller.cancel_intake().unwrap();
        assert_eq!(h.controller.mode(), Mode::Ia);
        assert!(!h.renderer.form_visible());
        assert_eq!(h.renderer.last_bot_text().as_deref(), Some(notices::HANDOFF_CANCELLED));
        assert_eq!(h.renderer.quick_actions(), Some(ASSISTANT_ACTIONS.to_vec()));
        assert!(h.controller.cancel_intake().is_err());
    }

    #[test]
    fn test_engine_failure_becomes_apology() {
        let mut responder = MockResponder::new();
        responder
            .expect_respond()
            .times(1)
            .returning(|_| Err(ChatError::engine("boom")));
        let mut h = TestHarness::with_responder(Box::new(responder));

        assert_eq!(h.controller.handle_user_text("oi"), InputOutcome::Pending);
        h.advance(Duration::from_millis(1500));
        assert_eq!(h.renderer.last_bot_text().as_deref(), Some(notices::ENGINE_APOLOGY));
        assert_eq!(h.controller.mode(), Mode::Ia);
    }

    #[test]
    fn test_engine_not_consulted_in_human_mode() {
        let mut responder = MockResponder::new();
        responder.expect_respond().never();
        let mut h = TestHarness::with_responder(Box::new(responder));
        h.controller.begin_handoff().unwrap();
        h.controller.submit_intake(sample_intake()).unwrap();
        h.open_relay();

        assert_eq!(
            h.controller.handle_user_text("Quanto custa um app?"),
            InputOutcome::Forwarded(Delivery::Relayed)
        );
        let last = h.connector.sent_json().pop().unwrap();
        assert_eq!(last["type"], "user_message");
        assert_eq!(last["message"], "Quanto custa um app?");
    }

    #[test]
    fn test_agent_actions_answer_locally() {
        let mut h = TestHarness::new();
        h.controller.begin_handoff().unwrap();
        h.controller.submit_intake(sample_intake()).unwrap();
        h.open_relay();
        h.relay_frame(r#"{"type":"transfer_status","status":"connected","agentName":"Bia","agentRole":"Consultora"}"#);
        assert_eq!(h.renderer.header(), Some(HeaderLabels::agent("Bia", "Consultora")));
        assert!(!h.renderer.transfer_visible());
        assert_eq!(h.renderer.quick_actions(), Some(AGENT_ACTIONS.to_vec()));

        let sent_before = h.connector.sent_frames().len();
        assert_eq!(
            h.controller.handle_quick_action(QuickAction::Email),
            InputOutcome::Handled
        );
        assert_eq!(h.renderer.last_bot_text().as_deref(), Some(notices::EMAIL));
        assert_eq!(h.connector.sent_frames().len(), sent_before);
        assert_eq!(
            h.controller.handle_quick_action(QuickAction::Websites),
            InputOutcome::Ignored
        );
    }

    #[test]
    fn test_return_to_assistant_action() {
        let mut h = TestHarness::new();
        h.controller.begin_handoff().unwrap();
        h.controller.submit_intake(sample_intake()).unwrap();
        h.open_relay();

        h.controller.handle_quick_action(QuickAction::ReturnToAssistant);
        assert_eq!(h.controller.mode(), Mode::Ia);
        assert_eq!(h.renderer.header(), Some(HeaderLabels::assistant()));
        assert_eq!(h.renderer.last_bot_text().as_deref(), Some(notices::BACK_TO_ASSISTANT));
        assert!(!h.connector.closed().is_empty());
    }

    #[test]
    fn test_queue_and_typing_frames() {
        let mut h = TestHarness::new();
        h.controller.begin_handoff().unwrap();
        h.controller.submit_intake(sample_intake()).unwrap();
        h.open_relay();

        h.relay_frame(r#"{"type":"transfer_status","status":"waiting","position":3,"waitTime":5}"#);
        assert!(h.renderer.last_bot_text().unwrap().contains("3º na fila"));

        h.relay_frame(r#"{"type":"agent_typing","typing":true}"#);
        assert!(h.renderer.typing_visible());
        h.relay_frame(r#"{"type":"agent_message","message":"Olá, tudo bem?"}"#);
        assert!(!h.renderer.typing_visible());
        assert_eq!(h.renderer.last_bot_text().as_deref(), Some("Olá, tudo bem?"));
    }

    #[test]
    fn test_mode_persisted_on_transitions() {
        let mut h = TestHarness::new();
        let key = h.controller.session().state_key();
        let read = |h: &TestHarness| -> ModeRecord {
            serde_json::from_str(&h.storage.get_item(&key).unwrap()).unwrap()
        };
        assert!(!read(&h).waiting_for_human);

        h.controller.begin_handoff().unwrap();
        let record = read(&h);
        assert!(record.waiting_for_human && !record.human_chat_active);

        h.controller.submit_intake(sample_intake()).unwrap();
        assert!(read(&h).human_chat_active);
    }

    #[test]
    fn test_fallback_reply_dropped_after_leaving_human() {
        let mut h = TestHarness::new();
        h.controller.begin_handoff().unwrap();
        h.controller.submit_intake(sample_intake()).unwrap();

        assert_eq!(
            h.controller.handle_user_text("alguém aí?"),
            InputOutcome::Forwarded(Delivery::Simulated)
        );
        h.controller.return_to_ia();
        let count = h.renderer.bot_texts().len();
        h.advance(Duration::from_millis(2000));
        assert_eq!(h.renderer.bot_texts().len(), count);
    }
}
