//! Configuration types.

use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Namespace for interaction tokens on choice buttons
    /// (`<namespace>:<question_key>:<option_value>`). Lets several logical
    /// flows share one transport without colliding.
    pub token_namespace: String,
    /// Whether to prefix rendered questions with a `[step/total]` marker
    /// when the definition enables progress display.
    pub show_progress: bool,
    /// Finished (completed/abandoned) sessions older than this are eligible
    /// for the cleanup sweep. The sweep itself is caller-driven.
    pub finished_session_max_age: Duration,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            token_namespace: "sequence_answer".to_string(),
            show_progress: true,
            finished_session_max_age: Duration::from_secs(24 * 3600),
        }
    }
}
