//! Hand-off intake form: draft, validation and the submitted record

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Whether `email` looks like an address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Kind of project the visitor wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Mobile app
    App,
    /// Institutional website
    Site,
    /// Online store
    Ecommerce,
    /// Custom web system
    Sistema,
    /// Landing page
    Landing,
    /// Anything else
    #[default]
    Outro,
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "app" => Ok(ProjectType::App),
            "site" => Ok(ProjectType::Site),
            "ecommerce" | "e-commerce" => Ok(ProjectType::Ecommerce),
            "sistema" => Ok(ProjectType::Sistema),
            "landing" => Ok(ProjectType::Landing),
            "outro" | "" => Ok(ProjectType::Outro),
            other => Err(format!("unknown project type '{}'", other)),
        }
    }
}

/// How soon the visitor needs the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// No rush
    Baixa,
    /// Normal
    #[default]
    Media,
    /// Urgent
    Alta,
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixa" => Ok(Urgency::Baixa),
            "media" | "média" | "" => Ok(Urgency::Media),
            "alta" => Ok(Urgency::Alta),
            other => Err(format!("unknown urgency '{}'", other)),
        }
    }
}

/// Reason a form field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Name left blank
    MissingName,
    /// Email left blank
    MissingEmail,
    /// Email does not match the address pattern
    InvalidEmail,
    /// Phone left blank
    MissingPhone,
}

impl FieldError {
    /// Form field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::MissingName => "name",
            FieldError::MissingEmail | FieldError::InvalidEmail => "email",
            FieldError::MissingPhone => "phone",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldError::MissingName => "Informe seu nome",
            FieldError::MissingEmail => "Informe seu e-mail",
            FieldError::InvalidEmail => "E-mail inválido",
            FieldError::MissingPhone => "Informe seu telefone",
        };
        f.write_str(s)
    }
}

/// Raw form contents as typed by the visitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeDraft {
    /// Name (required)
    pub name: String,
    /// Email (required, validated)
    pub email: String,
    /// Phone (required)
    pub phone: String,
    /// Project kind
    pub project: ProjectType,
    /// Urgency
    pub urgency: Urgency,
    /// Free text
    pub message: String,
}

impl IntakeDraft {
    /// Check required fields; all problems are reported at once
    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::MissingName);
        }
        let email = self.email.trim();
        if email.is_empty() {
            errors.push(FieldError::MissingEmail);
        } else if !is_valid_email(email) {
            errors.push(FieldError::InvalidEmail);
        }
        if self.phone.trim().is_empty() {
            errors.push(FieldError::MissingPhone);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Submitted intake, immutable and forwarded verbatim on join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIntakeRecord {
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
    /// Page the widget is embedded in
    pub page_url: String,
    /// Referrer of that page
    pub referrer: String,
    /// Seconds between page load and submission
    pub time_on_page_secs: i64,
    /// Session the intake belongs to
    pub session_id: String,
    /// Submission time
    pub timestamp: DateTime<Utc>,
}
