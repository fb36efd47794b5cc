//! Sequence data model: definitions, questions, options, answers, sessions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::condition::Condition;

/// Status of a sequence session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStatus {
    Active,
    Completed,
    Abandoned,
    Paused,
}

impl SequenceStatus {
    /// Whether the session can still accept answers.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the session has finished (completed or abandoned).
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

impl std::fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::Paused => "paused",
        };
        write!(f, "{s}")
    }
}

/// Types of questions within sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    SingleChoice,
    MultipleChoice,
    Boolean,
    Numeric,
    Date,
    Email,
    Phone,
    Url,
    File,
    Rating,
}

impl QuestionType {
    /// Choice types require a non-empty `options` list.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultipleChoice | Self::Boolean)
    }

    /// Types rendered with a one-button-per-option keyboard.
    pub fn uses_keyboard(&self) -> bool {
        matches!(self, Self::SingleChoice | Self::Boolean)
    }
}

/// Option for choice-based questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceOption {
    /// Wire-level answer token; unique within its question.
    pub value: String,
    /// Direct display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Localization key for the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Marks the correct option in scored sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl SequenceOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            label_key: None,
            emoji: None,
            is_correct: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_label_key(mut self, key: impl Into<String>) -> Self {
        self.label_key = Some(key.into());
        self
    }

    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }
}

/// Expected answer for a scored question — a single value or any of a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    One(String),
    Any(Vec<String>),
}

impl CorrectAnswer {
    /// Case-insensitive, whitespace-trimmed match.
    pub fn matches(&self, answer: &str) -> bool {
        let given = answer.trim().to_lowercase();
        match self {
            Self::One(expected) => expected.trim().to_lowercase() == given,
            Self::Any(expected) => expected.iter().any(|e| e.trim().to_lowercase() == given),
        }
    }
}

/// Individual question within a sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceQuestion {
    /// Unique within a definition.
    pub key: String,
    pub question_type: QuestionType,
    /// Direct question text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Localization key for the question text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SequenceOption>>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,

    /// Show this question only when the condition holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
    /// Skip this question when the condition holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<Condition>,

    /// Scoring (when the sequence is scored).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<CorrectAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}

fn default_true() -> bool {
    true
}

impl SequenceQuestion {
    pub fn new(key: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            key: key.into(),
            question_type,
            text: None,
            text_key: None,
            options: None,
            required: true,
            help_text: None,
            show_if: None,
            skip_if: None,
            correct_answer: None,
            points: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = Some(key.into());
        self
    }

    pub fn with_options(mut self, options: Vec<SequenceOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_help_text(mut self, help: impl Into<String>) -> Self {
        self.help_text = Some(help.into());
        self
    }

    pub fn show_if(mut self, condition: Condition) -> Self {
        self.show_if = Some(condition);
        self
    }

    pub fn skip_if(mut self, condition: Condition) -> Self {
        self.skip_if = Some(condition);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn scored(mut self, correct: CorrectAnswer, points: i32) -> Self {
        self.correct_answer = Some(correct);
        self.points = Some(points);
        self
    }

    /// Find an option by its wire value.
    pub fn option_by_value(&self, value: &str) -> Option<&SequenceOption> {
        self.options
            .as_deref()
            .and_then(|opts| opts.iter().find(|o| o.value == value))
    }
}

/// User's answer to a sequence question.
///
/// Immutable once stored, except by overwrite via re-answering the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceAnswer {
    pub question_key: String,
    pub value: String,
    pub answered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<i32>,
}

impl SequenceAnswer {
    pub fn new(question_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            question_key: question_key.into(),
            value: value.into(),
            answered_at: Utc::now(),
            is_correct: None,
            points_earned: None,
        }
    }
}

/// One user's run through a sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSession {
    pub id: Uuid,
    pub user_id: i64,
    pub sequence_name: String,
    /// Monotonic counter of answers submitted. Not an index into the visible
    /// question list, which is derived separately from conditions.
    pub current_step: u32,
    pub answers: HashMap<String, SequenceAnswer>,
    pub status: SequenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_possible_score: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SequenceSession {
    pub fn new(user_id: i64, sequence_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            sequence_name: sequence_name.into(),
            current_step: 0,
            answers: HashMap::new(),
            status: SequenceStatus::Active,
            total_questions: None,
            total_score: None,
            max_possible_score: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn answer(&self, question_key: &str) -> Option<&SequenceAnswer> {
        self.answers.get(question_key)
    }

    pub fn is_answered(&self, question_key: &str) -> bool {
        self.answers.contains_key(question_key)
    }

    /// Upsert an answer and recompute the score total from all stored
    /// answers, so re-answering a question never double-counts points.
    pub fn add_answer(&mut self, answer: SequenceAnswer) {
        self.answers.insert(answer.question_key.clone(), answer);
        let earned: i32 = self.answers.values().filter_map(|a| a.points_earned).sum();
        if self.answers.values().any(|a| a.points_earned.is_some()) {
            self.total_score = Some(earned);
        }
        self.updated_at = Utc::now();
    }

    pub fn advance_step(&mut self) {
        self.current_step += 1;
        self.updated_at = Utc::now();
    }

    pub fn is_complete(&self) -> bool {
        self.status == SequenceStatus::Completed
    }

    pub fn mark_completed(&mut self) {
        self.status = SequenceStatus::Completed;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_abandoned(&mut self) {
        self.status = SequenceStatus::Abandoned;
        self.updated_at = Utc::now();
    }
}

/// Definition of a sequence: a fixed backbone of questions plus behavior
/// flags. Branching is conditional filtering over this list, not a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDefinition {
    /// Unique registry name.
    pub name: String,
    /// Default traversal order; the order a user experiences is this list
    /// filtered live by each question's conditions.
    pub questions: Vec<SequenceQuestion>,
    #[serde(default)]
    pub scored: bool,
    #[serde(default = "default_true")]
    pub allow_restart: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_message_key: Option<String>,
}

impl SequenceDefinition {
    pub fn new(name: impl Into<String>, questions: Vec<SequenceQuestion>) -> Self {
        Self {
            name: name.into(),
            questions,
            scored: false,
            allow_restart: true,
            show_progress: true,
            welcome_message: None,
            welcome_message_key: None,
            completion_message: None,
            completion_message_key: None,
        }
    }

    pub fn scored(mut self) -> Self {
        self.scored = true;
        self
    }

    pub fn no_restart(mut self) -> Self {
        self.allow_restart = false;
        self
    }

    pub fn with_completion_message(mut self, message: impl Into<String>) -> Self {
        self.completion_message = Some(message.into());
        self
    }

    pub fn with_completion_message_key(mut self, key: impl Into<String>) -> Self {
        self.completion_message_key = Some(key.into());
        self
    }

    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = Some(message.into());
        self
    }

    pub fn with_welcome_message_key(mut self, key: impl Into<String>) -> Self {
        self.welcome_message_key = Some(key.into());
        self
    }

    pub fn question_by_key(&self, key: &str) -> Option<&SequenceQuestion> {
        self.questions.iter().find(|q| q.key == key)
    }

    /// Sum of points over all questions (0 for unscored definitions).
    pub fn total_possible_score(&self) -> i32 {
        if !self.scored {
            return 0;
        }
        self.questions.iter().filter_map(|q| q.points).sum()
    }
}
