//! Terminal front end for the chat widget
//!
//! Renders the conversation as plain text, turns input lines into
//! [`UiEvent`]s and optionally tails the core's logs with contact details
//! redacted.

use chatdesk_core::utils::logger::subscribe_logs;
use chatdesk_core::{
    redact_pii, ConversationMessage, FieldError, HeaderLabels, IntakeDraft, QuickAction, Renderer,
    UiEvent,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Log tail settings
#[derive(Clone, Default)]
pub struct TerminalConfig {
    /// Print core logs to stderr
    pub enabled: bool,
    /// Only lines whose message or target contains this
    pub target_filter: Option<String>,
}

/// Prints redacted core logs while the widget runs
pub struct LogTail {
    /// Settings
    pub config: TerminalConfig,
}

impl LogTail {
    /// New tail; nothing happens until [`LogTail::start`]
    pub fn new(config: TerminalConfig) -> Self {
        Self { config }
    }

    /// Spawn the tail task. `None` when disabled or logging is not initialized.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            return None;
        }
        let mut rx = subscribe_logs()?;
        let filter = self.config.target_filter.clone().map(|s| s.to_lowercase());
        Some(tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                if let Some(f) = &filter {
                    if !ev.message.to_lowercase().contains(f) && !ev.target.to_lowercase().contains(f) {
                        continue;
                    }
                }
                eprintln!(
                    "[{}][{}] [{}] {}",
                    ev.time,
                    ev.level,
                    ev.target,
                    redact_pii(&ev.message)
                );
            }
        }))
    }
}

/// Quick actions currently on screen, shared with the input parser
pub type MenuHandle = Arc<Mutex<Vec<QuickAction>>>;

/// Renderer writing plain text
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    menu: MenuHandle,
}

impl<W: Write + Send> TerminalRenderer<W> {
    /// Renderer writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            menu: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the visible menu
    pub fn menu(&self) -> MenuHandle {
        Arc::clone(&self.menu)
    }

    /// Underlying writer
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

fn plain(text: &str) -> String {
    text.replace("**", "")
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render_message(&mut self, message: &ConversationMessage) {
        let who = if message.is_bot() { "🤖" } else { "🧑" };
        let stamp = message.timestamp.format("%H:%M");
        self.line(&format!("\n{} [{}] {}", who, stamp, plain(&message.text)));
    }

    fn set_typing(&mut self, visible: bool) {
        if visible {
            self.line("   … digitando");
        }
    }

    fn set_transfer(&mut self, visible: bool) {
        if visible {
            self.line("   ⏳ transferindo para um atendente…");
        }
    }

    fn show_quick_actions(&mut self, actions: &[QuickAction]) {
        if let Ok(mut menu) = self.menu.lock() {
            *menu = actions.to_vec();
        }
        let mut text = String::from("   Ações rápidas (/quick N):");
        for (i, action) in actions.iter().enumerate() {
            text.push_str(&format!("\n     {}. {}", i + 1, action.label()));
        }
        self.line(&text);
    }

    fn hide_quick_actions(&mut self) {
        if let Ok(mut menu) = self.menu.lock() {
            menu.clear();
        }
    }

    fn set_header(&mut self, labels: &HeaderLabels) {
        self.line(&format!("══ {} · {} ══", labels.title, labels.status));
    }

    fn show_intake_form(&mut self) {
        self.line(
            "   📝 /enviar nome | email | telefone | projeto | urgência | mensagem\n      \
             projeto: app, site, ecommerce, sistema, landing, outro · urgência: baixa, media, alta\n      \
             /cancelar para voltar ao assistente",
        );
    }

    fn hide_intake_form(&mut self) {}

    fn show_form_errors(&mut self, errors: &[FieldError]) {
        for e in errors {
            self.line(&format!("   ⚠️ {}: {}", e.field(), e));
        }
    }
}

/// Turn an input line into a UI event. `Ok(None)` for blank lines.
pub fn parse_line(line: &str, menu: &[QuickAction]) -> Result<Option<UiEvent>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if !line.starts_with('/') {
        return Ok(Some(UiEvent::Text(line.to_string())));
    }
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let event = match cmd {
        "/humano" | "/human" => UiEvent::RequestHuman,
        "/ia" => UiEvent::ReturnToAssistant,
        "/cancelar" | "/cancel" => UiEvent::CancelIntake,
        "/sair" | "/quit" => UiEvent::Shutdown,
        "/quick" => {
            let n: usize = rest
                .trim()
                .parse()
                .map_err(|_| format!("número inválido: '{}'", rest.trim()))?;
            let action = n
                .checked_sub(1)
                .and_then(|i| menu.get(i))
                .copied()
                .ok_or_else(|| format!("nenhuma ação {} no menu", n))?;
            UiEvent::QuickAction(action)
        }
        "/enviar" | "/submit" => UiEvent::SubmitIntake(parse_intake(rest)?),
        other => return Err(format!("comando desconhecido: {}", other)),
    };
    Ok(Some(event))
}

/// `nome | email | telefone | projeto | urgência | mensagem`; the last
/// three are optional
pub fn parse_intake(fields: &str) -> Result<IntakeDraft, String> {
    let parts: Vec<&str> = fields.split('|').map(str::trim).collect();
    let get = |i: usize| parts.get(i).copied().unwrap_or("");
    Ok(IntakeDraft {
        name: get(0).to_string(),
        email: get(1).to_string(),
        phone: get(2).to_string(),
        project: get(3).parse()?,
        urgency: get(4).parse()?,
        message: parts.get(5..).map(|m| m.join(" | ")).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_core::{Origin, ProjectType, Urgency, ASSISTANT_ACTIONS};

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse_line("  quanto custa?  ", &[]),
            Ok(Some(UiEvent::Text("quanto custa?".into())))
        );
        assert_eq!(parse_line("   ", &[]), Ok(None));
    }

    #[test]
    fn test_quick_uses_visible_menu() {
        assert_eq!(
            parse_line("/quick 5", &ASSISTANT_ACTIONS),
            Ok(Some(UiEvent::QuickAction(QuickAction::TalkToAgent)))
        );
        assert!(parse_line("/quick 0", &ASSISTANT_ACTIONS).is_err());
        assert!(parse_line("/quick 1", &[]).is_err());
    }

    #[test]
    fn test_intake_fields() {
        let draft = parse_intake("Ana | ana@example.com | 3199 | app | alta | preciso de ajuda").unwrap();
        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.project, ProjectType::App);
        assert_eq!(draft.urgency, Urgency::Alta);
        assert_eq!(draft.message, "preciso de ajuda");

        let minimal = parse_intake("Ana | ana@example.com | 3199").unwrap();
        assert_eq!(minimal.project, ProjectType::Outro);
        assert_eq!(minimal.urgency, Urgency::Media);
        assert!(parse_intake("Ana | a@b.co | 1 | foguete").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_line("/voar", &[]).is_err());
        assert_eq!(parse_line("/sair", &[]), Ok(Some(UiEvent::Shutdown)));
    }

    #[test]
    fn test_renderer_tracks_menu_and_strips_bold() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let menu = renderer.menu();
        renderer.show_quick_actions(&ASSISTANT_ACTIONS);
        assert_eq!(menu.lock().unwrap().len(), 5);
        renderer.hide_quick_actions();
        assert!(menu.lock().unwrap().is_empty());

        renderer.render_message(&ConversationMessage {
            text: "**Olá**".into(),
            origin: Origin::Bot,
            timestamp: chrono::Utc::now(),
        });
        let out = String::from_utf8(renderer.writer().clone()).unwrap();
        assert!(out.contains("🤖"));
        assert!(out.contains("Olá"));
        assert!(!out.contains("**"));
    }
}
