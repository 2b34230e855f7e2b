//! Host page facts copied into backend payloads

use chrono::{DateTime, Utc};

/// What the embedding page knows about the visitor
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    /// Current page URL
    pub page_url: String,
    /// Browser user agent
    pub user_agent: String,
    /// Preferred language
    pub language: String,
    /// IANA time zone
    pub timezone: String,
    /// Referrer, empty for direct visits
    pub referrer: String,
    /// Screen resolution as `WxH`
    pub screen_resolution: String,
    /// When the page finished loading
    pub loaded_at: DateTime<Utc>,
}

impl PageContext {
    /// Traffic source label derived from the referrer
    pub fn source(&self) -> String {
        if self.referrer.trim().is_empty() {
            "Direto".to_string()
        } else {
            self.referrer.clone()
        }
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            page_url: "https://wpwebsolucoes.com.br/".into(),
            user_agent: "chatdesk".into(),
            language: "pt-BR".into(),
            timezone: "America/Sao_Paulo".into(),
            referrer: String::new(),
            screen_resolution: "1920x1080".into(),
            loaded_at: Utc::now(),
        }
    }
}
