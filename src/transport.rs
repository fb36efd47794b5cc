//! Transport and result boundaries — pure I/O, no business logic.
//!
//! The engine renders questions into `(text, keyboard)` payloads and hands
//! them to a `SequenceTransport`; it never talks to a chat platform directly.
//! Completed sessions are forwarded to a `SequenceResultHandler` for
//! persistence beyond the conversation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::sequence::types::{SequenceAnswer, SequenceSession};

// ── Rendered payloads ───────────────────────────────────────────────

/// One choice button on a rendered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    /// Display label (already translated, emoji included).
    pub label: String,
    /// Interaction token sent back when the button is pressed.
    pub token: String,
}

/// A keyboard of choice buttons, one row per option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

impl Keyboard {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A fully rendered question ready for the transport.
#[derive(Debug, Clone)]
pub struct RenderedQuestion {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

// ── Interaction token wire format ───────────────────────────────────

/// The compact string carried by a choice button:
/// `<namespace>:<question_key>:<option_value>`.
///
/// This is the only wire format the engine defines. Option values may
/// themselves contain `:`; only the first two separators are structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionToken {
    pub namespace: String,
    pub question_key: String,
    pub option_value: String,
}

impl InteractionToken {
    pub fn new(
        namespace: impl Into<String>,
        question_key: impl Into<String>,
        option_value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            question_key: question_key.into(),
            option_value: option_value.into(),
        }
    }

    /// Format for the wire.
    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.question_key, self.option_value)
    }

    /// Parse a token received from the transport.
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let mut parts = raw.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(key), Some(value)) if !ns.is_empty() && !key.is_empty() => {
                Ok(Self::new(ns, key, value))
            }
            _ => Err(TransportError::InvalidToken(raw.to_string())),
        }
    }

    /// Whether this token belongs to the given namespace.
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }
}

impl std::fmt::Display for InteractionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

// ── Boundary traits ─────────────────────────────────────────────────

/// Message delivery boundary implemented by the chat platform adapter.
#[async_trait]
pub trait SequenceTransport: Send + Sync {
    /// Transport name (e.g. "telegram", "cli").
    fn name(&self) -> &str;

    /// Send a question as a new message.
    async fn send_question(
        &self,
        user_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;

    /// Replace the previously sent question in place (choice-button flows).
    async fn edit_question(
        &self,
        user_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;

    /// Send the completion/summary message.
    async fn send_completion(&self, user_id: i64, text: &str) -> Result<(), TransportError>;
}

/// Result boundary — receives each completed session exactly once.
///
/// Failures here are logged by the completion service and never unwind an
/// already-committed completion.
#[async_trait]
pub trait SequenceResultHandler: Send + Sync {
    async fn on_sequence_completed(
        &self,
        session: &SequenceSession,
        answers: &[SequenceAnswer],
    ) -> anyhow::Result<()>;
}
