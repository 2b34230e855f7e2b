//! Conversation modes, header labels and quick actions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side answers the visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Scripted local assistant
    Ia,
    /// Intake form shown, waiting for submit or cancel
    AwaitingHandoffForm,
    /// Messages relayed to a live agent
    Human,
}

impl Mode {
    /// Whether the keyword engine may answer in this mode
    pub fn engine_enabled(&self) -> bool {
        matches!(self, Mode::Ia)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Ia => "ia",
            Mode::AwaitingHandoffForm => "awaiting_handoff_form",
            Mode::Human => "human",
        };
        f.write_str(s)
    }
}

/// Title and status line of the chat header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLabels {
    /// Agent or assistant name
    pub title: String,
    /// Status line under the title
    pub status: String,
}

impl HeaderLabels {
    /// Labels shown while the assistant answers
    pub fn assistant() -> Self {
        Self {
            title: "Assistente IA".into(),
            status: "Online • WP Web Soluções".into(),
        }
    }

    /// Labels shown while the relay is connecting
    pub fn connecting() -> Self {
        Self {
            title: "Conectando...".into(),
            status: "Transferindo para atendente".into(),
        }
    }

    /// Labels for a connected agent
    pub fn agent(name: &str, role: &str) -> Self {
        Self {
            title: name.to_string(),
            status: format!("{} • WP Web Soluções", role),
        }
    }
}

/// Buttons offered below the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickAction {
    /// "💻 Desenvolvimento de Apps"
    AppDevelopment,
    /// "🌐 Sites Institucionais"
    Websites,
    /// "🚀 Sistemas Web Personalizados"
    CustomSystems,
    /// "💰 Solicitar Orçamento"
    RequestQuote,
    /// "👥 Falar com Atendente"
    TalkToAgent,
    /// "📞 Agendar Call de Apresentação"
    ScheduleCall,
    /// "💬 Conversar por WhatsApp"
    WhatsApp,
    /// "📧 Enviar Email Detalhado"
    Email,
    /// "💰 Solicitar Proposta Formal"
    FormalProposal,
    /// "🔄 Voltar para IA"
    ReturnToAssistant,
}

/// Menu shown while the assistant answers
pub const ASSISTANT_ACTIONS: [QuickAction; 5] = [
    QuickAction::AppDevelopment,
    QuickAction::Websites,
    QuickAction::CustomSystems,
    QuickAction::RequestQuote,
    QuickAction::TalkToAgent,
];

/// Menu shown once an agent is connected
pub const AGENT_ACTIONS: [QuickAction; 5] = [
    QuickAction::ScheduleCall,
    QuickAction::WhatsApp,
    QuickAction::Email,
    QuickAction::FormalProposal,
    QuickAction::ReturnToAssistant,
];

impl QuickAction {
    /// Button label, also echoed as the user's message
    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::AppDevelopment => "💻 Desenvolvimento de Apps",
            QuickAction::Websites => "🌐 Sites Institucionais",
            QuickAction::CustomSystems => "🚀 Sistemas Web Personalizados",
            QuickAction::RequestQuote => "💰 Solicitar Orçamento",
            QuickAction::TalkToAgent => "👥 Falar com Atendente",
            QuickAction::ScheduleCall => "📞 Agendar Call de Apresentação",
            QuickAction::WhatsApp => "💬 Conversar por WhatsApp",
            QuickAction::Email => "📧 Enviar Email Detalhado",
            QuickAction::FormalProposal => "💰 Solicitar Proposta Formal",
            QuickAction::ReturnToAssistant => "🔄 Voltar para IA",
        }
    }

    /// Whether the action belongs to the agent menu
    pub fn is_agent_action(&self) -> bool {
        AGENT_ACTIONS.contains(self)
    }

    /// Look an action up by its label
    pub fn from_label(label: &str) -> Option<Self> {
        ASSISTANT_ACTIONS
            .iter()
            .chain(AGENT_ACTIONS.iter())
            .copied()
            .find(|a| a.label() == label.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_enabled_only_in_ia() {
        assert!(Mode::Ia.engine_enabled());
        assert!(!Mode::AwaitingHandoffForm.engine_enabled());
        assert!(!Mode::Human.engine_enabled());
    }

    #[test]
    fn test_label_round_trip() {
        for action in ASSISTANT_ACTIONS.iter().chain(AGENT_ACTIONS.iter()) {
            assert_eq!(QuickAction::from_label(action.label()), Some(*action));
        }
        assert_eq!(QuickAction::from_label("nada"), None);
    }

    #[test]
    fn test_menus_are_disjoint() {
        assert!(ASSISTANT_ACTIONS.iter().all(|a| !a.is_agent_action()));
        assert!(AGENT_ACTIONS.iter().all(|a| a.is_agent_action()));
    }
}
