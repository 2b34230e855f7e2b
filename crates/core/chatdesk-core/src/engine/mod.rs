//! Scripted response engine
//!
//! Matching is case-insensitive substring containment against fixed keyword
//! lists, checked in a fixed order: hand-off keywords, then topics, then the
//! greeting / thanks / farewell / technical-question detectors, then a
//! generic echo. The first hit wins.

pub mod keywords;
pub mod responses;

use crate::Result;
use keywords::{contains_any, Topic};

/// What the engine decided for one visitor message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineReply {
    /// Visitor asked for a human; open the intake form
    Handoff,
    /// Answer with this text
    Text(String),
}

/// Classification behind a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Hand-off keyword found
    Handoff,
    /// Topic keyword found
    Topic(Topic),
    /// Greeting
    Greeting,
    /// Thanks
    Thanks,
    /// Farewell
    Farewell,
    /// Technical question
    Technical,
    /// Nothing matched
    Generic,
}

/// Produces the assistant's answer to a visitor message
#[cfg_attr(test, mockall::automock)]
pub trait Responder: Send {
    /// Answer `text`; errors are turned into an apology by the caller
    fn respond(&self, text: &str) -> Result<EngineReply>;
}

/// Keyword-matching responder
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordEngine;

impl KeywordEngine {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }

    /// Classify `text` by the fixed priority order
    pub fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();

        if contains_any(&lowered, keywords::HANDOFF) {
            return Intent::Handoff;
        }

        if let Some((topic, _)) = keywords::TOPICS
            .iter()
            .find(|(_, words)| contains_any(&lowered, words))
        {
            return Intent::Topic(*topic);
        }

        if contains_any(&lowered, keywords::GREETINGS) {
            Intent::Greeting
        } else if contains_any(&lowered, keywords::THANKS) {
            Intent::Thanks
        } else if contains_any(&lowered, keywords::FAREWELLS) {
            Intent::Farewell
        } else if contains_any(&lowered, keywords::TECHNICAL) {
            Intent::Technical
        } else {
            Intent::Generic
        }
    }
}

impl Responder for KeywordEngine {
    fn respond(&self, text: &str) -> Result<EngineReply> {
        let intent = self.classify(text);
        tracing::debug!(?intent, "message classified");
        let reply = match intent {
            Intent::Handoff => return Ok(EngineReply::Handoff),
            Intent::Topic(topic) => responses::topic_response(topic).to_string(),
            Intent::Greeting => responses::GREETING.to_string(),
            Intent::Thanks => responses::THANKS.to_string(),
            Intent::Farewell => responses::FAREWELL.to_string(),
            Intent::Technical => responses::technical_response(text),
            Intent::Generic => responses::generic_response(text),
        };
        Ok(EngineReply::Text(reply))
    }
}
