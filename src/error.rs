//! Error types for seqflow.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Sequence engine errors.
///
/// All of these are expected, recoverable failures: the orchestrator turns
/// them into user-facing retry prompts rather than letting them end the run.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Sequence '{name}' not found")]
    SequenceNotFound { name: String },

    #[error("Question '{key}' not found in sequence '{sequence}'")]
    QuestionNotFound { sequence: String, key: String },

    #[error("No active sequence session for user {user_id}")]
    NoActiveSession { user_id: i64 },

    #[error("Invalid answer for question '{question_key}': {reason}")]
    Validation { question_key: String, reason: String },

    #[error("Sequence '{name}' is already registered")]
    DuplicateSequence { name: String },

    #[error("Invalid sequence definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("Sequence '{name}' does not allow restarting")]
    RestartNotAllowed { name: String },
}

impl SequenceError {
    /// The question key to re-prompt with, if this error is tied to one.
    pub fn question_key(&self) -> Option<&str> {
        match self {
            Self::Validation { question_key, .. } => Some(question_key),
            Self::QuestionNotFound { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Transport boundary errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to send question on transport {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to edit question on transport {name}: {reason}")]
    EditFailed { name: String, reason: String },

    #[error("Malformed interaction token: {0}")]
    InvalidToken(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_carries_question_key() {
        let err = SequenceError::Validation {
            question_key: "eyes_color".into(),
            reason: "not an option".into(),
        };
        assert_eq!(err.question_key(), Some("eyes_color"));
    }

    #[test]
    fn lifecycle_errors_have_no_question_key() {
        let err = SequenceError::NoActiveSession { user_id: 42 };
        assert!(err.question_key().is_none());
        let err = SequenceError::SequenceNotFound {
            name: "missing".into(),
        };
        assert!(err.question_key().is_none());
    }

    #[test]
    fn error_display_is_descriptive() {
        let err = Error::from(SequenceError::DuplicateSequence {
            name: "user_info".into(),
        });
        assert!(err.to_string().contains("user_info"));
        assert!(err.to_string().contains("already registered"));
    }
}
