//! Question presentation — turns a definition's question into the text and
//! keyboard a transport can deliver.

use crate::config::SequenceConfig;
use crate::error::SequenceError;
use crate::i18n::{TranslateParams, Translator};
use crate::transport::{InteractionToken, Keyboard, KeyboardButton, RenderedQuestion};

use super::catalog::SequenceCatalog;
use super::types::{SequenceQuestion, SequenceSession};

pub struct QuestionService {
    config: SequenceConfig,
}

impl QuestionService {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    /// Render a question for delivery. `visible_total` is the count of
    /// currently visible questions and drives the progress marker; `None`
    /// suppresses it regardless of config.
    pub fn render(
        &self,
        question: &SequenceQuestion,
        session: &SequenceSession,
        translator: &dyn Translator,
        visible_total: Option<u32>,
    ) -> RenderedQuestion {
        let mut text = String::new();

        if self.config.show_progress
            && let Some(total) = visible_total
            && total > 0
        {
            // current_step counts submitted answers, so position is 1-based
            // and clamped for sessions whose visible set shrank mid-flight.
            let position = (session.current_step + 1).min(total);
            text.push_str(&format!("[{position}/{total}] "));
        }

        text.push_str(&self.question_text(question, translator));

        if let Some(help) = &question.help_text
            && !help.is_empty()
        {
            text.push_str("\n\n");
            text.push_str(help);
        }

        RenderedQuestion {
            text,
            keyboard: self.keyboard(question, translator),
        }
    }

    /// Universal answer check: required questions reject blank input; all
    /// type- and option-level rules stay with the catalog and are delegated
    /// to it, so rendering concerns and cross-question rules evolve apart.
    pub fn validate_answer(
        &self,
        catalog: &SequenceCatalog,
        sequence_name: &str,
        question: &SequenceQuestion,
        raw_text: &str,
    ) -> Result<(), SequenceError> {
        if question.required && raw_text.trim().is_empty() {
            return Err(SequenceError::Validation {
                question_key: question.key.clone(),
                reason: "an answer is required".to_string(),
            });
        }
        catalog.validate_answer(sequence_name, &question.key, raw_text)
    }

    fn question_text(&self, question: &SequenceQuestion, translator: &dyn Translator) -> String {
        if let Some(key) = &question.text_key {
            return translator.translate(key, &TranslateParams::new());
        }
        question.text.clone().unwrap_or_else(|| question.key.clone())
    }

    fn keyboard(
        &self,
        question: &SequenceQuestion,
        translator: &dyn Translator,
    ) -> Option<Keyboard> {
        let options = question.options.as_deref().unwrap_or_default();
        if !question.question_type.uses_keyboard() || options.is_empty() {
            return None;
        }

        let rows = options
            .iter()
            .map(|option| {
                let label = option
                    .label
                    .clone()
                    .or_else(|| {
                        option
                            .label_key
                            .as_ref()
                            .map(|key| translator.translate(key, &TranslateParams::new()))
                    })
                    .unwrap_or_else(|| option.value.clone());
                let label = match &option.emoji {
                    Some(emoji) => format!("{emoji} {label}"),
                    None => label,
                };
                let token = InteractionToken::new(
                    &self.config.token_namespace,
                    &question.key,
                    &option.value,
                );
                vec![KeyboardButton {
                    label,
                    token: token.encode(),
                }]
            })
            .collect();

        Some(Keyboard { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::KeyTranslator;
    use crate::sequence::types::{QuestionType, SequenceOption, SequenceSession};

    fn service() -> QuestionService {
        QuestionService::new(SequenceConfig::default())
    }

    fn session() -> SequenceSession {
        SequenceSession::new(1, "user_info")
    }

    #[test]
    fn renders_progress_marker_and_text() {
        let question =
            SequenceQuestion::new("name", QuestionType::Text).with_text("What is your name?");
        let rendered = service().render(&question, &session(), &KeyTranslator, Some(3));
        assert_eq!(rendered.text, "[1/3] What is your name?");
        assert!(rendered.keyboard.is_none());
    }

    #[test]
    fn progress_suppressed_without_visible_total() {
        let question = SequenceQuestion::new("name", QuestionType::Text).with_text("Name?");
        let rendered = service().render(&question, &session(), &KeyTranslator, None);
        assert_eq!(rendered.text, "Name?");
    }

    #[test]
    fn progress_suppressed_by_config() {
        let config = SequenceConfig {
            show_progress: false,
            ..SequenceConfig::default()
        };
        let question = SequenceQuestion::new("name", QuestionType::Text).with_text("Name?");
        let rendered =
            QuestionService::new(config).render(&question, &session(), &KeyTranslator, Some(3));
        assert_eq!(rendered.text, "Name?");
    }

    #[test]
    fn position_is_clamped_to_total() {
        let question = SequenceQuestion::new("last", QuestionType::Text).with_text("Last?");
        let mut session = session();
        for _ in 0..5 {
            session.advance_step();
        }
        let rendered = service().render(&question, &session, &KeyTranslator, Some(3));
        assert!(rendered.text.starts_with("[3/3] "));
    }

    #[test]
    fn help_text_follows_blank_line() {
        let question = SequenceQuestion::new("email", QuestionType::Email)
            .with_text("Email?")
            .with_help_text("We never share it.");
        let rendered = service().render(&question, &session(), &KeyTranslator, None);
        assert_eq!(rendered.text, "Email?\n\nWe never share it.");
    }

    #[test]
    fn text_key_goes_through_translator() {
        let question =
            SequenceQuestion::new("name", QuestionType::Text).with_text_key("sequence.ask_name");
        let rendered = service().render(&question, &session(), &KeyTranslator, None);
        assert_eq!(rendered.text, "sequence.ask_name");
    }

    #[test]
    fn missing_text_falls_back_to_key() {
        let question = SequenceQuestion::new("name", QuestionType::Text);
        let rendered = service().render(&question, &session(), &KeyTranslator, None);
        assert_eq!(rendered.text, "name");
    }

    #[test]
    fn single_choice_builds_one_button_per_option() {
        let question = SequenceQuestion::new("eyes_color", QuestionType::SingleChoice)
            .with_text("Eye color?")
            .with_options(vec![
                SequenceOption::new("blue").with_label("Blue").with_emoji("🔵"),
                SequenceOption::new("green").with_label("Green"),
                SequenceOption::new("other"),
            ]);
        let rendered = service().render(&question, &session(), &KeyTranslator, None);
        let keyboard = rendered.keyboard.unwrap();
        assert_eq!(keyboard.rows.len(), 3);
        assert_eq!(keyboard.rows[0][0].label, "🔵 Blue");
        assert_eq!(keyboard.rows[0][0].token, "sequence_answer:eyes_color:blue");
        assert_eq!(keyboard.rows[1][0].label, "Green");
        assert_eq!(keyboard.rows[2][0].label, "other");
    }

    #[test]
    fn option_label_key_goes_through_translator() {
        let question = SequenceQuestion::new("confirm", QuestionType::Boolean)
            .with_text("Confirm?")
            .with_options(vec![
                SequenceOption::new("true").with_label_key("common.yes"),
                SequenceOption::new("false").with_label_key("common.no"),
            ]);
        let rendered = service().render(&question, &session(), &KeyTranslator, None);
        let keyboard = rendered.keyboard.unwrap();
        assert_eq!(keyboard.rows[0][0].label, "common.yes");
    }

    #[test]
    fn blank_answer_rejected_before_catalog_rules() {
        use crate::sequence::catalog::SequenceCatalog;
        use crate::sequence::types::SequenceDefinition;

        let catalog = SequenceCatalog::new();
        catalog
            .register(SequenceDefinition::new(
                "survey",
                vec![
                    SequenceQuestion::new("name", QuestionType::Text).with_text("Name?"),
                    SequenceQuestion::new("nickname", QuestionType::Text)
                        .with_text("Nickname?")
                        .optional(),
                ],
            ))
            .unwrap();
        let service = service();
        let required = SequenceQuestion::new("name", QuestionType::Text);
        let optional = SequenceQuestion::new("nickname", QuestionType::Text).optional();

        assert!(service
            .validate_answer(&catalog, "survey", &required, "   ")
            .is_err());
        assert!(service
            .validate_answer(&catalog, "survey", &optional, "")
            .is_ok());
        assert!(service
            .validate_answer(&catalog, "survey", &required, "Ada")
            .is_ok());
    }

    #[test]
    fn free_text_types_get_no_keyboard() {
        let question = SequenceQuestion::new("choices", QuestionType::MultipleChoice)
            .with_text("Pick some")
            .with_options(vec![SequenceOption::new("a"), SequenceOption::new("b")]);
        // multiple choice answers arrive as typed comma lists, not buttons
        assert!(service()
            .render(&question, &session(), &KeyTranslator, None)
            .keyboard
            .is_none());
    }
}
