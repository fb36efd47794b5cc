//! Built-in sequence definitions.

use super::condition::Condition;
use super::types::{QuestionType, SequenceDefinition, SequenceOption, SequenceQuestion};

fn eye_color_option(value: &str) -> SequenceOption {
    SequenceOption::new(value)
        .with_label_key(format!("sequence.user_info.questions.eyes_color.options.{value}"))
        .with_emoji("👁️")
}

fn marital_status_option(value: &str, emoji: &str) -> SequenceOption {
    SequenceOption::new(value)
        .with_label_key(format!(
            "sequence.user_info.questions.marital_status.options.{value}"
        ))
        .with_emoji(emoji)
}

/// Profile onboarding: confirm the displayed name, branch into a free-text
/// name question only when the user rejects it, then two choice questions.
pub fn user_info_sequence() -> SequenceDefinition {
    let questions = vec![
        SequenceQuestion::new("confirm_user_name", QuestionType::Boolean)
            .with_text_key("sequence.user_info.questions.confirm_user_name.question")
            .with_options(vec![
                SequenceOption::new("true")
                    .with_label_key("sequence.user_info.questions.confirm_user_name.options.yes")
                    .with_emoji("✅"),
                SequenceOption::new("false")
                    .with_label_key("sequence.user_info.questions.confirm_user_name.options.no")
                    .with_emoji("❌"),
            ]),
        SequenceQuestion::new("actual_name", QuestionType::Text)
            .with_text_key("sequence.user_info.questions.actual_name.question")
            .show_if(Condition::equals("confirm_user_name", "false")),
        SequenceQuestion::new("eyes_color", QuestionType::SingleChoice)
            .with_text_key("sequence.user_info.questions.eyes_color.question")
            .with_options(
                ["brown", "blue", "green", "hazel", "gray", "other"]
                    .into_iter()
                    .map(eye_color_option)
                    .collect(),
            ),
        SequenceQuestion::new("marital_status", QuestionType::SingleChoice)
            .with_text_key("sequence.user_info.questions.marital_status.question")
            .with_options(vec![
                marital_status_option("single", "💚"),
                marital_status_option("married", "💍"),
                marital_status_option("divorced", "💔"),
                marital_status_option("widowed", "🕊️"),
                marital_status_option("prefer_not_to_say", "🤐"),
            ]),
    ];

    SequenceDefinition::new("user_info", questions)
        .with_welcome_message_key("sequence.user_info.welcome")
        .with_completion_message_key("sequence.user_info.completion")
}
