//! System messages rendered on mode changes and relay events

/// First message of a fresh conversation
pub const WELCOME: &str = "👋 Olá! Sou o **Assistente IA da WP Web Soluções**

Estou aqui para ajudar você com:

📱 **Desenvolvimento** de apps, sites e sistemas
💰 **Orçamentos** e prazos de entrega
🚀 **Processo** de desenvolvimento
👥 **Conexão** com nossos especialistas

Posso responder perguntas técnicas, explicar nossos serviços ou conectar você com um atendente humano quando precisar.

**Como posso ajudar você hoje?**";

/// Shown when the intake form opens
pub const HANDOFF_FORM: &str = "👥 Vou conectar você com um atendente humano!

Para agilizar o atendimento, preencha o formulário abaixo com seus dados de contato.";

/// Shown when the visitor cancels the form
pub const HANDOFF_CANCELLED: &str =
    "Tudo bem! Continuo por aqui. 😊 Como posso ajudar você com nossos serviços?";

/// Shown after a valid submission, before the relay answers
pub fn connecting(name: &str) -> String {
    format!(
        "✅ Obrigado, {}! Seus dados foram enviados.\n\n🔄 Conectando você com um atendente...",
        name.trim()
    )
}

/// Shown when a reload resumes the agent chat
pub const RESUMING: &str = "🔄 Retomando sua conversa com o atendente...";

/// Relay handshake done
pub const RELAY_CONNECTED: &str =
    "✅ Conectado! Estamos localizando um atendente disponível para você...";

/// Relay lost, retry scheduled
pub fn reconnecting(attempt: u32, max: u32) -> String {
    format!(
        "⚠️ Conexão perdida. Tentando reconectar ({}/{})...",
        attempt, max
    )
}

/// Retries exhausted
pub const RELAY_OFFLINE: &str = "📴 Não foi possível conectar ao atendimento ao vivo no momento. \
Continue enviando suas mensagens que nossa equipe responderá, \
ou fale conosco pelo WhatsApp: (31) 99754-2811";

/// Agent picked the chat up
pub fn agent_greeting(name: &str, role: &str) -> String {
    format!(
        "👋 Olá! Sou {}, {} da WP Web Soluções.\n\nEm que posso ajudar você hoje?",
        name, role
    )
}

/// Visitor is queued
pub fn waiting_in_queue(position: Option<u32>, wait_minutes: Option<u32>) -> String {
    let mut text =
        String::from("⏳ Nossos atendentes estão ocupados no momento.");
    if let Some(position) = position {
        text.push_str(&format!(" Você é o {}º na fila.", position));
    }
    if let Some(wait) = wait_minutes {
        text.push_str(&format!(" Tempo estimado: {} minutos.", wait));
    }
    text
}

/// Agent ended the chat without a message of their own
pub const AGENT_LEFT: &str = "O atendente se desconectou.";

/// Back to the assistant
pub const BACK_TO_ASSISTANT: &str =
    "🔄 Voltando para o modo assistente IA. Como posso ajudar você agora?";

/// Replaces an engine failure
pub const ENGINE_APOLOGY: &str = "Desculpe, estou com dificuldades técnicas. Por favor, tente novamente ou entre em contato diretamente pelo WhatsApp: (31) 99754-2811";

/// Shown while the form blocks bot replies
pub const FORM_PENDING: &str =
    "📝 Preencha o formulário acima para falar com um atendente, ou cancele para continuar com o assistente.";

/// Default agent labels before `transfer_status` names one
pub const DEFAULT_AGENT_NAME: &str = "Atendente";

/// Default agent role
pub const DEFAULT_AGENT_ROLE: &str = "Especialista";

pub(crate) const SCHEDULE_CALL: &str = "📅 **Agendamento de Call**

Perfeito! Para agendar uma call de apresentação:

1. **WhatsApp:** (31) 99754-2811
2. **Email:** contato@wpwebsolucoes.com.br
3. **Horário:** Seg-Sex, 9h às 18h

**Na call vamos:**
• Entender seu projeto em detalhes
• Tirar todas as dúvidas técnicas
• Apresentar cases similares
• Discutir prazos e investimento

Pode nos contactar por qualquer canal acima! 📞";

pub(crate) const WHATSAPP: &str = "📱 **WhatsApp Direto**

Clique no link abaixo para conversar diretamente pelo WhatsApp:

[👉 ABRIR WHATSAPP](https://wa.me/5531997542811?text=Olá! Gostaria de conversar sobre meu projeto.)

**No WhatsApp você pode:**
• Enviar arquivos e referências
• Marcar call rapidamente
• Receber resposta em minutos
• Falar com nosso time técnico

Estamos online agora! 🟢";

pub(crate) const EMAIL: &str = "📧 **Contato por Email**

Nosso email: **contato@wpwebsolucoes.com.br**

**No email você pode incluir:**
• Descrição detalhada do projeto
• Requisitos e funcionalidades
• Prazos desejados
• Orçamento aproximado
• Anexos e referências

**Respondemos em até 4 horas úteis!** ⚡

Posso ajudar em mais alguma coisa?";

pub(crate) const FORMAL_PROPOSAL: &str = "📋 **Proposta Formal**

Excelente! Para prepararmos uma proposta personalizada, preciso saber:

1. **Tipo de projeto** (app, site, sistema)
2. **Principais funcionalidades** desejadas
3. **Prazos** esperados
4. **Orçamento** aproximado (se tiver)

**Na proposta você recebe:**
• Escopo detalhado do projeto
• Cronograma faseado
• Investimento transparente
• Tecnologias a serem utilizadas
• Condições de pagamento

Pode me contar mais sobre seu projeto? 🚀";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_notice_includes_known_parts() {
        assert_eq!(
            waiting_in_queue(Some(2), Some(5)),
            "⏳ Nossos atendentes estão ocupados no momento. Você é o 2º na fila. Tempo estimado: 5 minutos."
        );
        assert!(!waiting_in_queue(None, None).contains("fila"));
    }

    #[test]
    fn test_reconnect_notice_counts_attempts() {
        assert!(reconnecting(3, 5).contains("(3/5)"));
    }
}
