//! Event loop driving a [`ChatController`] with real timers and a WebSocket
//! relay. UI input, fired timers and relay events are handled one at a time
//! on a single task.

use crate::config::WidgetConfig;
use crate::controller::{ChatController, ControllerDeps, InputOutcome};
use crate::engine::{KeywordEngine, Responder};
use crate::relay::transport::{Connector, RelayEvent, WsConnector};
use crate::render::Renderer;
use crate::scheduler::{Clock, FiredTimer, SystemClock, TokioScheduler};
use crate::storage::{CookieJar, KeyValueStore};
use crate::types::{IntakeDraft, PageContext, QuickAction};
use crate::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Input from the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Text typed by the visitor
    Text(String),
    /// Quick-action button
    QuickAction(QuickAction),
    /// Open the intake form
    RequestHuman,
    /// Submit the intake form
    SubmitIntake(IntakeDraft),
    /// Close the intake form
    CancelIntake,
    /// Leave the agent chat
    ReturnToAssistant,
    /// Stop the loop
    Shutdown,
}

/// Storage the widget persists into
pub struct WidgetStorage {
    /// Session cookie
    pub cookies: Arc<dyn CookieJar>,
    /// Mode record
    pub store: Arc<dyn KeyValueStore>,
}

/// A running chat widget
pub struct ChatWidget {
    controller: ChatController,
    ui_rx: mpsc::UnboundedReceiver<UiEvent>,
    timer_rx: mpsc::UnboundedReceiver<FiredTimer>,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
}

impl ChatWidget {
    /// Widget answering with the keyword engine
    pub fn new(
        config: WidgetConfig,
        page: PageContext,
        renderer: Box<dyn Renderer>,
        storage: WidgetStorage,
    ) -> Result<(Self, mpsc::UnboundedSender<UiEvent>)> {
        Self::with_responder(config, page, renderer, storage, Box::new(KeywordEngine::new()))
    }

    /// Widget with a custom responder
    pub fn with_responder(
        config: WidgetConfig,
        page: PageContext,
        renderer: Box<dyn Renderer>,
        storage: WidgetStorage,
        responder: Box<dyn Responder>,
    ) -> Result<(Self, mpsc::UnboundedSender<UiEvent>)> {
        config.validate()?;
        let (scheduler, timer_rx) = TokioScheduler::new();
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let connector: Arc<dyn Connector> = Arc::new(WsConnector::new(relay_tx));

        let deps = ControllerDeps {
            renderer,
            scheduler: Arc::new(scheduler),
            clock,
            cookies: storage.cookies,
            store: storage.store,
            connector,
            responder,
        };
        let controller = ChatController::new(config, page, deps);
        Ok((
            Self {
                controller,
                ui_rx,
                timer_rx,
                relay_rx,
            },
            ui_tx,
        ))
    }

    /// Controller state, for inspection
    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    /// Start the conversation and process events until shutdown or until
    /// the UI sender is dropped
    pub async fn run(mut self) -> Result<ChatController> {
        info!(session_id = %self.controller.session().id, "chat widget started");
        self.controller.start();
        loop {
            tokio::select! {
                ui = self.ui_rx.recv() => match ui {
                    Some(UiEvent::Shutdown) | None => break,
                    Some(event) => self.handle_ui(event),
                },
                Some(fired) = self.timer_rx.recv() => self.controller.handle_timer(fired),
                Some(event) = self.relay_rx.recv() => self.controller.handle_relay_event(event),
            }
        }
        info!("chat widget stopped");
        Ok(self.controller)
    }

    fn handle_ui(&mut self, event: UiEvent) {
        match event {
            UiEvent::Text(text) => {
                let outcome = self.controller.handle_user_text(&text);
                if outcome != InputOutcome::Pending {
                    debug!(?outcome, "text handled");
                }
            }
            UiEvent::QuickAction(action) => {
                self.controller.handle_quick_action(action);
            }
            UiEvent::RequestHuman => {
                if let Err(e) = self.controller.begin_handoff() {
                    warn!(error = %e, "hand-off not available");
                }
            }
            UiEvent::SubmitIntake(draft) => {
                if let Err(e) = self.controller.submit_intake(draft) {
                    debug!(error = %e, "intake not accepted");
                }
            }
            UiEvent::CancelIntake => {
                if let Err(e) = self.controller.cancel_intake() {
                    debug!(error = %e, "nothing to cancel");
                }
            }
            UiEvent::ReturnToAssistant => self.controller.return_to_ia(),
            UiEvent::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::responses;
    use crate::storage::MemoryStorage;
    use crate::testing::RecordingRenderer;
    use crate::types::Mode;
    use std::time::Duration;

    fn widget(renderer: &RecordingRenderer) -> (ChatWidget, mpsc::UnboundedSender<UiEvent>) {
        let storage = Arc::new(MemoryStorage::new(Arc::new(SystemClock)));
        ChatWidget::new(
            WidgetConfig::deterministic(),
            PageContext::default(),
            Box::new(renderer.clone()),
            WidgetStorage {
                cookies: storage.clone(),
                store: storage,
            },
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_delivers_reply_after_typing_delay() {
        let renderer = RecordingRenderer::new();
        let (widget, ui) = widget(&renderer);
        let handle = tokio::spawn(widget.run());

        ui.send(UiEvent::Text("Quanto custa um site institucional?".into()))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        ui.send(UiEvent::Shutdown).unwrap();

        let controller = handle.await.unwrap().unwrap();
        assert_eq!(controller.mode(), Mode::Ia);
        assert_eq!(
            renderer.last_bot_text().as_deref(),
            Some(responses::WEB_DEVELOPMENT)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_sender_stops_loop() {
        let renderer = RecordingRenderer::new();
        let (widget, ui) = widget(&renderer);
        drop(ui);
        let controller = widget.run().await.unwrap();
        assert_eq!(controller.messages().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let storage = Arc::new(MemoryStorage::new(Arc::new(SystemClock)));
        let config = WidgetConfig {
            relay_url: "http://nope".into(),
            ..WidgetConfig::default()
        };
        let result = ChatWidget::new(
            config,
            PageContext::default(),
            Box::new(RecordingRenderer::new()),
            WidgetStorage {
                cookies: storage.clone(),
                store: storage,
            },
        );
        assert!(result.is_err());
    }
}
