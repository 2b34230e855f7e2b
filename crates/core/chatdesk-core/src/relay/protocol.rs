//! Relay wire protocol (JSON text frames)

use crate::ChatError;
use crate::types::{ClientIntakeRecord, ContextEntry, PageContext, ProjectType, Urgency};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Frames sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once the connection opens
    UserJoin(UserJoin),
    /// Visitor text
    UserMessage(UserMessage),
}

/// `user_join` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoin {
    /// Visitor and page facts
    pub user_data: UserData,
    /// Last entries of the context window
    pub conversation_history: Vec<ContextEntry>,
    /// Session id
    pub session_id: String,
}

/// `user_message` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessage {
    /// Text as typed
    pub message: String,
    /// UTC ISO-8601 send time
    pub timestamp: String,
    /// Session id
    pub session_id: String,
}

impl UserMessage {
    /// Message stamped with `now`
    pub fn new(message: impl Into<String>, session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: session_id.into(),
        }
    }
}

/// `userData` object of the join frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Page URL
    pub page: String,
    /// Browser user agent
    pub user_agent: String,
    /// Preferred language
    pub language: String,
    /// Time zone
    pub timezone: String,
    /// Referrer
    pub referrer: String,
    /// Intake fields, present after a completed form
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub intake: Option<IntakeFields>,
}

/// Intake fields as the backend names them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeFields {
    /// Visitor name
    pub name: String,
    /// Visitor email
    pub email: String,
    /// Visitor phone
    pub phone: String,
    /// Project kind
    pub project: ProjectType,
    /// Urgency
    pub urgency: Urgency,
    /// Free text
    pub message: String,
    /// Traffic source
    pub source: String,
    /// Time on page, e.g. `95s`
    pub time_on_page: String,
    /// Screen resolution
    pub screen_resolution: String,
    /// Submission time
    pub timestamp: String,
}

impl UserData {
    /// Page facts plus, when given, the submitted intake
    pub fn new(page: &PageContext, intake: Option<&ClientIntakeRecord>) -> Self {
        Self {
            page: page.page_url.clone(),
            user_agent: page.user_agent.clone(),
            language: page.language.clone(),
            timezone: page.timezone.clone(),
            referrer: page.referrer.clone(),
            intake: intake.map(|r| IntakeFields {
                name: r.name.clone(),
                email: r.email.clone(),
                phone: r.phone.clone(),
                project: r.project,
                urgency: r.urgency,
                message: r.message.clone(),
                source: page.source(),
                time_on_page: format!("{}s", r.time_on_page_secs),
                screen_resolution: page.screen_resolution.clone(),
                timestamp: r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        }
    }
}

/// Frames received from the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Greeting from the backend
    Welcome {
        /// Text to render
        message: String,
    },
    /// Agent text
    AgentMessage {
        /// Text to render
        message: String,
    },
    /// Agent typing state
    AgentTyping {
        /// Whether the agent is typing
        typing: bool,
    },
    /// Queue / assignment update
    TransferStatus(TransferStatus),
    /// Agent ended the chat
    AgentLeft {
        /// Optional goodbye text
        #[serde(default)]
        message: Option<String>,
    },
    /// Anything else
    #[serde(other)]
    Unknown,
}

/// Assignment state reported by `transfer_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    /// An agent picked the chat up
    Connected,
    /// Visitor is queued
    Waiting,
}

/// `transfer_status` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatus {
    /// Assignment state
    pub status: TransferState,
    /// Agent display name
    #[serde(default)]
    pub agent_name: Option<String>,
    /// Agent role
    #[serde(default)]
    pub agent_role: Option<String>,
    /// Queue position
    #[serde(default)]
    pub position: Option<u32>,
    /// Estimated wait in minutes
    #[serde(default)]
    pub wait_time: Option<u32>,
}

/// Serialize an outbound frame
pub fn encode(message: &OutboundMessage) -> crate::Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Parse an inbound frame
pub fn decode(frame: &str) -> crate::Result<InboundEvent> {
    serde_json::from_str(frame).map_err(|e| ChatError::protocol(format!("bad relay frame: {}", e)))
}
