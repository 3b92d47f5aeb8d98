//! Conversational endpoint backed by a pretrained chat model.
//!
//! The model itself is an external text-generation service; this module
//! owns everything around it: per-caller conversation history, prompt
//! formatting, output cleanup and the fallback policy.
//!
//! # Modules
//!
//! - [`prompt`]: Chat-template formatting of history + new input
//! - [`cleanup`]: Turning raw model output into a short reply
//! - [`generator`]: [`TextGenerator`] trait and the HTTP implementation
//! - [`engine`]: [`ChatEngine`] holding conversations
//! - [`routes`]: Axum handlers

pub mod cleanup;
pub mod engine;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod routes;

pub use cleanup::APOLOGY;
pub use engine::ChatEngine;
pub use error::{ChatError, ErrorKind};
pub use generator::{HttpGenerator, SamplingParams, TextGenerator};

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
