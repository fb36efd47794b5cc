//! Completion handling — final message rendering and result-handler fanout.

use std::sync::Arc;

use tracing::{info, warn};

use crate::i18n::{Translator, params1};
use crate::transport::SequenceResultHandler;

use super::types::{SequenceDefinition, SequenceSession};

const GENERIC_COMPLETION_KEY: &str = "sequence.completion.generic";

pub struct CompletionService {
    result_handler: Option<Arc<dyn SequenceResultHandler>>,
}

impl CompletionService {
    pub fn new(result_handler: Option<Arc<dyn SequenceResultHandler>>) -> Self {
        Self { result_handler }
    }

    /// Resolve the completion text: direct message wins, then the
    /// localization key, then a generic fallback parameterized with a
    /// human-readable sequence name. Scored sequences get a score line.
    pub fn render_completion(
        &self,
        definition: &SequenceDefinition,
        session: &SequenceSession,
        translator: &dyn Translator,
    ) -> String {
        let mut text = if let Some(message) = &definition.completion_message {
            message.clone()
        } else if let Some(key) = &definition.completion_message_key {
            translator.translate(key, &Default::default())
        } else {
            translator.translate(
                GENERIC_COMPLETION_KEY,
                &params1("sequence_type", humanize(&definition.name)),
            )
        };

        if definition.scored
            && let Some(score) = session.total_score
            && let Some(max) = session.max_possible_score
        {
            let percent = if max > 0 {
                f64::from(score) / f64::from(max) * 100.0
            } else {
                0.0
            };
            text.push_str(&format!("\n\nScore: {score}/{max} ({percent:.1}%)"));
        }

        text
    }

    /// Fan the finished session out to the configured result handler.
    /// Handler failures are logged and swallowed, completion of the
    /// user-facing flow never depends on downstream consumers.
    pub async fn handle_completion(&self, session: &SequenceSession) {
        let Some(handler) = &self.result_handler else {
            return;
        };
        let mut answers: Vec<_> = session.answers.values().cloned().collect();
        answers.sort_by(|a, b| a.answered_at.cmp(&b.answered_at));

        match handler.on_sequence_completed(session, &answers).await {
            Ok(()) => {
                info!(
                    user_id = session.user_id,
                    sequence = %session.sequence_name,
                    "result handler accepted completed sequence"
                );
            }
            Err(error) => {
                warn!(
                    user_id = session.user_id,
                    sequence = %session.sequence_name,
                    %error,
                    "result handler failed"
                );
            }
        }
    }
}

/// "user_info" -> "User Info".
fn humanize(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
