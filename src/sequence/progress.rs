//! Progress computation over the currently visible question set.
//!
//! Visibility is re-evaluated on every call, so totals shrink or grow as
//! answers flip `show_if`/`skip_if` conditions. The step counter only ever
//! moves forward; consumers wanting a stable denominator should snapshot
//! `total_questions` at session creation instead.

use std::sync::Arc;

use super::catalog::SequenceCatalog;
use super::types::{SequenceDefinition, SequenceSession};

pub struct ProgressService {
    catalog: Arc<SequenceCatalog>,
}

impl ProgressService {
    pub fn new(catalog: Arc<SequenceCatalog>) -> Self {
        Self { catalog }
    }

    /// Number of questions currently visible to this session.
    pub fn visible_question_count(
        &self,
        definition: &SequenceDefinition,
        session: &SequenceSession,
    ) -> u32 {
        definition
            .questions
            .iter()
            .filter(|question| self.catalog.should_show(question, session))
            .count() as u32
    }

    /// `(answered_so_far, visible_total)`.
    pub fn progress(
        &self,
        definition: &SequenceDefinition,
        session: &SequenceSession,
    ) -> (u32, u32) {
        (
            session.current_step,
            self.visible_question_count(definition, session),
        )
    }

    /// Percentage of the visible set already answered, clamped to 100.
    pub fn completion_percentage(
        &self,
        definition: &SequenceDefinition,
        session: &SequenceSession,
    ) -> f64 {
        let (answered, total) = self.progress(definition, session);
        if total == 0 {
            return 0.0;
        }
        (f64::from(answered) / f64::from(total) * 100.0).min(100.0)
    }

    /// Visible questions still unanswered.
    pub fn remaining(&self, definition: &SequenceDefinition, session: &SequenceSession) -> u32 {
        definition
            .questions
            .iter()
            .filter(|question| {
                !session.is_answered(&question.key) && self.catalog.should_show(question, session)
            })
            .count() as u32
    }

    pub fn is_first(&self, session: &SequenceSession) -> bool {
        session.current_step == 0
    }

    pub fn is_last(&self, definition: &SequenceDefinition, session: &SequenceSession) -> bool {
        self.remaining(definition, session) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::condition::Condition;
    use crate::sequence::types::{
        QuestionType, SequenceAnswer, SequenceOption, SequenceQuestion,
    };

    fn branching_definition() -> SequenceDefinition {
        SequenceDefinition::new(
            "branchy",
            vec![
                SequenceQuestion::new("confirm_name", QuestionType::Boolean)
                    .with_text("Use profile name?")
                    .with_options(vec![
                        SequenceOption::new("true").with_label("Yes"),
                        SequenceOption::new("false").with_label("No"),
                    ]),
                SequenceQuestion::new("actual_name", QuestionType::Text)
                    .with_text("Your name?")
                    .show_if(Condition::equals("confirm_name", "false")),
                SequenceQuestion::new("eyes_color", QuestionType::Text).with_text("Eye color?"),
            ],
        )
    }

    fn service() -> ProgressService {
        ProgressService::new(Arc::new(SequenceCatalog::new()))
    }

    fn answered(session: &mut SequenceSession, key: &str, value: &str) {
        session.add_answer(SequenceAnswer::new(key, value));
        session.advance_step();
    }

    #[test]
    fn visible_total_follows_conditions() {
        let definition = branching_definition();
        let service = service();
        let mut session = SequenceSession::new(1, "branchy");

        // show_if unevaluable before the gate answer exists: hidden
        assert_eq!(service.visible_question_count(&definition, &session), 2);

        answered(&mut session, "confirm_name", "false");
        assert_eq!(service.visible_question_count(&definition, &session), 3);

        session.add_answer(SequenceAnswer::new("confirm_name", "true"));
        assert_eq!(service.visible_question_count(&definition, &session), 2);
    }

    #[test]
    fn progress_counts_submitted_answers() {
        let definition = branching_definition();
        let service = service();
        let mut session = SequenceSession::new(1, "branchy");

        assert_eq!(service.progress(&definition, &session), (0, 2));
        assert!(service.is_first(&session));

        answered(&mut session, "confirm_name", "true");
        assert_eq!(service.progress(&definition, &session), (1, 2));
        assert!(!service.is_first(&session));
    }

    #[test]
    fn percentage_is_zero_for_empty_visible_set() {
        let definition = SequenceDefinition::new(
            "gated",
            vec![SequenceQuestion::new("only", QuestionType::Text)
                .show_if(Condition::equals("never", "yes"))],
        );
        let session = SequenceSession::new(1, "gated");
        assert_eq!(service().completion_percentage(&definition, &session), 0.0);
    }

    #[test]
    fn percentage_ramps_and_clamps() {
        let definition = branching_definition();
        let service = service();
        let mut session = SequenceSession::new(1, "branchy");

        answered(&mut session, "confirm_name", "true");
        assert_eq!(service.completion_percentage(&definition, &session), 50.0);

        answered(&mut session, "eyes_color", "blue");
        assert_eq!(service.completion_percentage(&definition, &session), 100.0);

        // extra steps never push past 100
        session.advance_step();
        assert_eq!(service.completion_percentage(&definition, &session), 100.0);
    }

    #[test]
    fn remaining_and_is_last() {
        let definition = branching_definition();
        let service = service();
        let mut session = SequenceSession::new(1, "branchy");

        assert_eq!(service.remaining(&definition, &session), 2);
        assert!(!service.is_last(&definition, &session));

        answered(&mut session, "confirm_name", "true");
        assert_eq!(service.remaining(&definition, &session), 1);
        assert!(service.is_last(&definition, &session));

        answered(&mut session, "eyes_color", "blue");
        assert_eq!(service.remaining(&definition, &session), 0);
    }
}
