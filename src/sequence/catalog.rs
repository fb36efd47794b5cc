//! Sequence catalog — the in-memory registry of sequence definitions.
//!
//! Owns definition registration/validation, resolves "what is the next
//! question" through the condition evaluator, and applies per-type answer
//! validation. Read-mostly: definitions are registered at process start.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use regex::Regex;
use tracing::{info, warn};

use crate::error::SequenceError;

use super::condition::ConditionEvaluator;
use super::types::{QuestionType, SequenceDefinition, SequenceQuestion, SequenceSession};

/// Compiled validators for free-text question types.
#[derive(Debug)]
struct AnswerValidators {
    email: Regex,
    phone: Regex,
    url: Regex,
}

impl AnswerValidators {
    fn new() -> Self {
        Self {
            email: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap(),
            phone: Regex::new(r"^\+?[0-9][0-9 ()\-]{5,18}$").unwrap(),
            url: Regex::new(r"^https?://\S+\.\S+$").unwrap(),
        }
    }
}

/// In-memory registry of named sequence definitions.
pub struct SequenceCatalog {
    definitions: RwLock<HashMap<String, Arc<SequenceDefinition>>>,
    evaluator: ConditionEvaluator,
    validators: AnswerValidators,
}

impl SequenceCatalog {
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            evaluator: ConditionEvaluator::new(),
            validators: AnswerValidators::new(),
        }
    }

    /// Register a definition. Fails on duplicate names; use
    /// [`register_or_replace`](Self::register_or_replace) to overwrite.
    pub fn register(&self, definition: SequenceDefinition) -> Result<(), SequenceError> {
        validate_definition(&definition)?;
        let mut definitions = self.definitions.write().unwrap();
        if definitions.contains_key(&definition.name) {
            return Err(SequenceError::DuplicateSequence {
                name: definition.name,
            });
        }
        info!(sequence = %definition.name, questions = definition.questions.len(), "registered sequence");
        definitions.insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Register a definition, replacing any existing one with the same name.
    pub fn register_or_replace(&self, definition: SequenceDefinition) -> Result<(), SequenceError> {
        validate_definition(&definition)?;
        let mut definitions = self.definitions.write().unwrap();
        info!(sequence = %definition.name, "registered sequence (replace allowed)");
        definitions.insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Remove a definition. Returns `false` when the name was unknown.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.definitions.write().unwrap().remove(name).is_some();
        if removed {
            info!(sequence = %name, "unregistered sequence");
        }
        removed
    }

    pub fn definition(&self, name: &str) -> Option<Arc<SequenceDefinition>> {
        self.definitions.read().unwrap().get(name).cloned()
    }

    pub fn sequence_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve the next question for a session: the first question in the
    /// backbone order that is currently visible and not yet answered.
    ///
    /// "Answered" means the key is present in the session's answers,
    /// regardless of current visibility — a question answered under an
    /// earlier condition state stays answered even if later answers would
    /// hide it. Returns `None` when the sequence is complete.
    pub fn next_question_key(&self, session: &SequenceSession) -> Option<String> {
        let definition = self.definition(&session.sequence_name)?;
        definition
            .questions
            .iter()
            .find(|q| !session.is_answered(&q.key) && self.evaluator.should_show(q, session))
            .map(|q| q.key.clone())
    }

    /// Condition check for a single question against a session snapshot.
    pub fn should_show(&self, question: &SequenceQuestion, session: &SequenceSession) -> bool {
        self.evaluator.should_show(question, session)
    }

    /// Validate an answer against a question's type and options.
    ///
    /// Choice values are matched against option tokens exactly
    /// (case-sensitive), unlike condition comparisons.
    pub fn validate_answer(
        &self,
        sequence_name: &str,
        question_key: &str,
        raw_value: &str,
    ) -> Result<(), SequenceError> {
        let definition =
            self.definition(sequence_name)
                .ok_or_else(|| SequenceError::SequenceNotFound {
                    name: sequence_name.to_string(),
                })?;
        let question =
            definition
                .question_by_key(question_key)
                .ok_or_else(|| SequenceError::QuestionNotFound {
                    sequence: sequence_name.to_string(),
                    key: question_key.to_string(),
                })?;

        let trimmed = raw_value.trim();
        if trimmed.is_empty() {
            if question.required {
                return Err(invalid(question_key, "an answer is required"));
            }
            // Optional questions accept a blank answer without type checks
            return Ok(());
        }

        match question.question_type {
            QuestionType::SingleChoice | QuestionType::Boolean => {
                self.check_option(question, raw_value)
            }
            QuestionType::MultipleChoice => {
                for part in raw_value.split(',') {
                    self.check_option(question, part.trim())?;
                }
                Ok(())
            }
            QuestionType::Numeric => trimmed
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| invalid(question_key, "expected a number")),
            QuestionType::Rating => match trimmed.parse::<i64>() {
                Ok(n) if n >= 1 => Ok(()),
                _ => Err(invalid(question_key, "expected a positive whole number")),
            },
            QuestionType::Date => chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| invalid(question_key, "expected a date in YYYY-MM-DD format")),
            QuestionType::Email => {
                if self.validators.email.is_match(trimmed) {
                    Ok(())
                } else {
                    Err(invalid(question_key, "expected a valid email address"))
                }
            }
            QuestionType::Phone => {
                if self.validators.phone.is_match(trimmed) {
                    Ok(())
                } else {
                    Err(invalid(question_key, "expected a valid phone number"))
                }
            }
            QuestionType::Url => {
                if self.validators.url.is_match(trimmed) {
                    Ok(())
                } else {
                    Err(invalid(question_key, "expected a valid http(s) URL"))
                }
            }
            QuestionType::Text | QuestionType::File => Ok(()),
        }
    }

    fn check_option(&self, question: &SequenceQuestion, value: &str) -> Result<(), SequenceError> {
        if question.option_by_value(value).is_some() {
            return Ok(());
        }
        let available: Vec<&str> = question
            .options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        Err(invalid(
            &question.key,
            format!("please select one of: {}", available.join(", ")),
        ))
    }
}

impl Default for SequenceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(question_key: &str, reason: impl Into<String>) -> SequenceError {
    SequenceError::Validation {
        question_key: question_key.to_string(),
        reason: reason.into(),
    }
}

/// Structural checks applied once, at registration time.
fn validate_definition(definition: &SequenceDefinition) -> Result<(), SequenceError> {
    let fail = |reason: String| SequenceError::InvalidDefinition {
        name: definition.name.clone(),
        reason,
    };

    if definition.name.trim().is_empty() {
        return Err(fail("sequence name is empty".into()));
    }
    if definition.questions.is_empty() {
        return Err(fail("sequence has no questions".into()));
    }

    let mut keys = HashSet::new();
    for question in &definition.questions {
        if !keys.insert(question.key.as_str()) {
            return Err(fail(format!("duplicate question key '{}'", question.key)));
        }

        if question.question_type.is_choice() {
            let options = question.options.as_deref().unwrap_or_default();
            if options.is_empty() {
                return Err(fail(format!(
                    "choice question '{}' has no options",
                    question.key
                )));
            }
            let mut values = HashSet::new();
            for option in options {
                if !values.insert(option.value.as_str()) {
                    return Err(fail(format!(
                        "question '{}' has duplicate option value '{}'",
                        question.key, option.value
                    )));
                }
            }
        }
    }

    // Conditions referencing unknown keys always evaluate against an absent
    // answer; surface them early but keep registration permissive.
    for question in &definition.questions {
        let mut refs = Vec::new();
        if let Some(c) = &question.show_if {
            c.referenced_questions(&mut refs);
        }
        if let Some(c) = &question.skip_if {
            c.referenced_questions(&mut refs);
        }
        for referenced in refs {
            if !keys.contains(referenced) {
                warn!(
                    sequence = %definition.name,
                    question = %question.key,
                    referenced,
                    "condition references a question key not in this sequence"
                );
            }
        }
    }

    Ok(())
}
