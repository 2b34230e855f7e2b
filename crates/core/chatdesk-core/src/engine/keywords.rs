//! Keyword lists, in match priority order

/// Any of these routes the visitor to a human
pub const HANDOFF: &[&str] = &[
    "humano",
    "atendente",
    "pessoa",
    "especialista",
    "consultor",
    "falar com alguém",
    "atendimento humano",
    "quero uma pessoa",
    "não é robô",
    "representante",
    "gerente",
    "vendedor",
    "consultoria",
    "reunião",
    "call",
    "telefone",
    "whatsapp",
    "ligar",
    "contato direto",
];

/// Subjects with a fixed canned answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Mobile apps
    App,
    /// Websites and landing pages
    Web,
    /// Custom systems and platforms
    System,
    /// Prices and budgets
    Pricing,
    /// Development process
    Process,
    /// Technology stack
    TechStack,
    /// The company itself
    Company,
    /// Delivery times
    Timeline,
}

/// Topics with their keywords; the first topic with a hit wins
pub const TOPICS: &[(Topic, &[&str])] = &[
    (Topic::App, &["app", "aplicativo", "mobile"]),
    (Topic::Web, &["site", "institucional", "landing page"]),
    (Topic::System, &["sistema", "plataforma", "software"]),
    (Topic::Pricing, &["orçamento", "preço", "custo", "valor"]),
    (Topic::Process, &["processo", "como funciona", "metodologia"]),
    (Topic::TechStack, &["tecnolog", "stack", "ferramenta"]),
    (Topic::Company, &["empresa", "wp web", "quem são"]),
    (Topic::Timeline, &["tempo", "prazo", "quando", "dura"]),
];

/// Greeting detector
pub const GREETINGS: &[&str] = &[
    "oi", "olá", "ola", "hey", "e aí", "eai", "bom dia", "boa tarde", "boa noite",
];

/// Thanks detector
pub const THANKS: &[&str] = &["obrigado", "obrigada", "valeu", "agradeço", "thanks", "thank you"];

/// Farewell detector
pub const FAREWELLS: &[&str] = &["tchau", "bye", "até mais", "ate mais", "flw", "falou", "adeus"];

/// Technical question detector
pub const TECHNICAL: &[&str] = &[
    "como fazer",
    "como implementar",
    "melhor prática",
    "arquitetura",
    "api",
    "database",
    "backend",
    "frontend",
];

/// Case-insensitive substring hit against a keyword list
pub fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lowered.contains(k))
}
