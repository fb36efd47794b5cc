//! Sequence orchestrator — the single entry point a channel adapter talks to.
//!
//! Every read-modify-write path takes the per-user lock from the store, so a
//! double-tapped button or two racing messages from the same user serialize
//! into answer-then-reject rather than a double answer.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::SequenceConfig;
use crate::error::{Error, SequenceError};
use crate::i18n::Translator;
use crate::transport::{InteractionToken, SequenceResultHandler, SequenceTransport};

use super::catalog::SequenceCatalog;
use super::completion::CompletionService;
use super::progress::ProgressService;
use super::question::QuestionService;
use super::store::SessionStore;
use super::types::{SequenceAnswer, SequenceDefinition, SequenceQuestion, SequenceSession};

/// What a submitted answer did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Key of the question now pending, `None` when nothing remains.
    pub next_question_key: Option<String>,
    pub completed: bool,
}

pub struct SequenceOrchestrator {
    catalog: Arc<SequenceCatalog>,
    store: Arc<SessionStore>,
    transport: Arc<dyn SequenceTransport>,
    translator: Arc<dyn Translator>,
    questions: QuestionService,
    progress: ProgressService,
    completion: CompletionService,
    config: SequenceConfig,
}

impl SequenceOrchestrator {
    pub fn new(
        catalog: Arc<SequenceCatalog>,
        store: Arc<SessionStore>,
        transport: Arc<dyn SequenceTransport>,
        translator: Arc<dyn Translator>,
        result_handler: Option<Arc<dyn SequenceResultHandler>>,
        config: SequenceConfig,
    ) -> Self {
        Self {
            questions: QuestionService::new(config.clone()),
            progress: ProgressService::new(Arc::clone(&catalog)),
            completion: CompletionService::new(result_handler),
            catalog,
            store,
            transport,
            translator,
            config,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Create a fresh session for the user. An active session on a
    /// `no_restart` definition blocks this; anything else is replaced.
    #[instrument(skip(self))]
    pub async fn start(
        &self,
        user_id: i64,
        sequence_name: &str,
    ) -> Result<SequenceSession, SequenceError> {
        let definition = self.definition(sequence_name)?;

        let lock = self.store.user_lock(user_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.get(user_id).await
            && existing.status.is_active()
            && existing.sequence_name == sequence_name
            && !definition.allow_restart
        {
            warn!(user_id, sequence = sequence_name, "restart refused");
            return Err(SequenceError::RestartNotAllowed {
                name: sequence_name.to_string(),
            });
        }

        let max_score = definition
            .scored
            .then(|| definition.total_possible_score());
        self.store
            .create(
                user_id,
                sequence_name,
                definition.questions.len() as u32,
                max_score,
            )
            .await;

        self.store
            .get(user_id)
            .await
            .ok_or(SequenceError::NoActiveSession { user_id })
    }

    /// Send the definition's welcome message (when present) followed by the
    /// first pending question. Returns the key of the question sent.
    pub async fn send_first_question(&self, user_id: i64) -> Result<Option<String>, Error> {
        let session = self.session(user_id).await?;
        let definition = self.definition(&session.sequence_name)?;

        if let Some(welcome) = self.welcome_text(&definition) {
            self.transport.send_question(user_id, &welcome, None).await?;
        }
        self.send_current_question(user_id, false).await
    }

    /// Record one answer; under the user lock the whole
    /// validate-score-store-advance chain is atomic per user.
    ///
    /// `question_key` comes from a parsed interaction token; free-text
    /// answers pass `None` and are attributed to the pending question.
    #[instrument(skip(self, raw_value))]
    pub async fn process_answer(
        &self,
        user_id: i64,
        question_key: Option<&str>,
        raw_value: &str,
    ) -> Result<AnswerOutcome, SequenceError> {
        let lock = self.store.user_lock(user_id);
        let _guard = lock.lock().await;

        let session = self
            .store
            .get(user_id)
            .await
            .filter(|s| s.status.is_active())
            .ok_or(SequenceError::NoActiveSession { user_id })?;
        let definition = self.definition(&session.sequence_name)?;

        let key = match question_key {
            Some(key) => key.to_string(),
            None => match self.catalog.next_question_key(&session) {
                Some(key) => key,
                // nothing pending, a stale or duplicate submission
                None => {
                    self.finalize(user_id).await;
                    return Ok(AnswerOutcome {
                        next_question_key: None,
                        completed: true,
                    });
                }
            },
        };

        // Stale button taps on an already-answered question are rejected
        // before validation so they cannot double-score.
        if session.is_answered(&key) && question_key.is_some() {
            warn!(user_id, question = %key, "duplicate answer ignored");
            return Ok(AnswerOutcome {
                next_question_key: self.catalog.next_question_key(&session),
                completed: false,
            });
        }

        let question = definition
            .question_by_key(&key)
            .ok_or_else(|| SequenceError::QuestionNotFound {
                sequence: definition.name.clone(),
                key: key.clone(),
            })?;
        self.questions
            .validate_answer(&self.catalog, &session.sequence_name, question, raw_value)?;

        let answer = self.grade(&definition, question, raw_value);
        self.store.add_answer(user_id, answer).await;
        self.store.advance_step(user_id).await;

        let refreshed = self
            .store
            .get(user_id)
            .await
            .ok_or(SequenceError::NoActiveSession { user_id })?;
        let next_question_key = self.catalog.next_question_key(&refreshed);
        let completed = next_question_key.is_none();
        if completed {
            self.finalize(user_id).await;
        }
        info!(
            user_id,
            question = %key,
            next = next_question_key.as_deref().unwrap_or("-"),
            completed,
            "answer processed"
        );
        Ok(AnswerOutcome {
            next_question_key,
            completed,
        })
    }

    /// Parse an interaction token and feed it through [`process_answer`].
    /// Tokens outside the configured namespace are reported as invalid.
    ///
    /// [`process_answer`]: Self::process_answer
    pub async fn process_token(&self, user_id: i64, token: &str) -> Result<AnswerOutcome, Error> {
        let parsed = InteractionToken::parse(token)?;
        if !parsed.in_namespace(&self.config.token_namespace) {
            return Err(Error::Transport(
                crate::error::TransportError::InvalidToken(token.to_string()),
            ));
        }
        Ok(self
            .process_answer(user_id, Some(&parsed.question_key), &parsed.option_value)
            .await?)
    }

    /// Abandon without deleting; the session stays queryable.
    pub async fn abandon(&self, user_id: i64) -> Result<(), SequenceError> {
        if self.store.abandon(user_id).await {
            Ok(())
        } else {
            Err(SequenceError::NoActiveSession { user_id })
        }
    }

    pub async fn clear(&self, user_id: i64) -> bool {
        self.store.clear(user_id).await
    }

    /// Sweep finished sessions older than the configured max age.
    pub async fn cleanup_finished_sessions(&self) -> usize {
        self.store
            .cleanup_finished_sessions(self.config.finished_session_max_age)
            .await
    }

    // ── Delivery ────────────────────────────────────────────────────

    /// Render and deliver the pending question; `edit_in_place` replaces the
    /// previous message (button flows) instead of sending a new one.
    pub async fn send_current_question(
        &self,
        user_id: i64,
        edit_in_place: bool,
    ) -> Result<Option<String>, Error> {
        let session = self.session(user_id).await?;
        let definition = self.definition(&session.sequence_name)?;

        let Some(key) = self.catalog.next_question_key(&session) else {
            return Ok(None);
        };
        let question = definition
            .question_by_key(&key)
            .ok_or_else(|| SequenceError::QuestionNotFound {
                sequence: definition.name.clone(),
                key: key.clone(),
            })?;

        let visible_total = definition
            .show_progress
            .then(|| self.progress.visible_question_count(&definition, &session));
        let rendered =
            self.questions
                .render(question, &session, self.translator.as_ref(), visible_total);

        if edit_in_place {
            self.transport
                .edit_question(user_id, &rendered.text, rendered.keyboard.as_ref())
                .await?;
        } else {
            self.transport
                .send_question(user_id, &rendered.text, rendered.keyboard.as_ref())
                .await?;
        }
        Ok(Some(key))
    }

    /// Deliver the completion message for a finished session.
    pub async fn send_completion(&self, user_id: i64) -> Result<(), Error> {
        let session = self.session(user_id).await?;
        let definition = self.definition(&session.sequence_name)?;
        let text =
            self.completion
                .render_completion(&definition, &session, self.translator.as_ref());
        self.transport.send_completion(user_id, &text).await?;
        Ok(())
    }

    /// One-shot driver for a channel adapter: record the answer, then either
    /// deliver the next question or the completion message.
    pub async fn handle_answer(
        &self,
        user_id: i64,
        question_key: Option<&str>,
        raw_value: &str,
        edit_in_place: bool,
    ) -> Result<AnswerOutcome, Error> {
        let outcome = self.process_answer(user_id, question_key, raw_value).await?;
        if outcome.completed {
            self.send_completion(user_id).await?;
        } else {
            self.send_current_question(user_id, edit_in_place).await?;
        }
        Ok(outcome)
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub async fn session(&self, user_id: i64) -> Result<SequenceSession, SequenceError> {
        self.store
            .get(user_id)
            .await
            .ok_or(SequenceError::NoActiveSession { user_id })
    }

    pub async fn current_question_key(&self, user_id: i64) -> Result<Option<String>, SequenceError> {
        let session = self.session(user_id).await?;
        Ok(self.catalog.next_question_key(&session))
    }

    pub async fn is_complete(&self, user_id: i64) -> Result<bool, SequenceError> {
        Ok(self.session(user_id).await?.is_complete())
    }

    /// `(answered, visible_total)` for the user's session.
    pub async fn progress(&self, user_id: i64) -> Result<(u32, u32), SequenceError> {
        let session = self.session(user_id).await?;
        let definition = self.definition(&session.sequence_name)?;
        Ok(self.progress.progress(&definition, &session))
    }

    // ── Internals ───────────────────────────────────────────────────

    fn definition(&self, name: &str) -> Result<Arc<SequenceDefinition>, SequenceError> {
        self.catalog
            .definition(name)
            .ok_or_else(|| SequenceError::SequenceNotFound {
                name: name.to_string(),
            })
    }

    fn welcome_text(&self, definition: &SequenceDefinition) -> Option<String> {
        if let Some(message) = &definition.welcome_message {
            return Some(message.clone());
        }
        definition
            .welcome_message_key
            .as_ref()
            .map(|key| self.translator.translate(key, &Default::default()))
    }

    fn grade(
        &self,
        definition: &SequenceDefinition,
        question: &SequenceQuestion,
        raw_value: &str,
    ) -> SequenceAnswer {
        let mut answer = SequenceAnswer::new(&question.key, raw_value);
        if !definition.scored {
            return answer;
        }
        if let Some(correct) = &question.correct_answer {
            let is_correct = correct.matches(raw_value);
            answer.is_correct = Some(is_correct);
            answer.points_earned = Some(if is_correct {
                question.points.unwrap_or(0)
            } else {
                0
            });
        }
        answer
    }

    /// Mark completed and fan out to the result handler; idempotent on
    /// already-finished sessions.
    async fn finalize(&self, user_id: i64) {
        let already_finished = self
            .store
            .get(user_id)
            .await
            .is_some_and(|s| s.status.is_finished());
        if already_finished {
            return;
        }
        self.store.complete(user_id).await;
        if let Some(session) = self.store.get(user_id).await {
            self.completion.handle_completion(&session).await;
        }
    }
}
