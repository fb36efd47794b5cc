//! Condition trees and their evaluator.
//!
//! Conditions gate a question's visibility against the answers recorded so
//! far in a session — never against hypothetical future answers. The tree is
//! a tagged variant parsed at definition-load time, so malformed conditions
//! fail fast instead of at evaluation time.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{SequenceQuestion, SequenceSession};

/// Comparison applied by a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    InList,
    NotInList,
    IsEmpty,
    IsNotEmpty,
}

/// Boolean combinator for composite conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolOperator {
    And,
    Or,
    Not,
}

/// A boolean condition over previously given answers.
///
/// Deserializes from the dict shape used by sequence definition files:
/// composites are `{"operator": ..., "conditions": [...]}`, leaves are
/// `{"question": ..., "condition": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Composite {
        operator: BoolOperator,
        #[serde(default)]
        conditions: Vec<Condition>,
    },
    Leaf {
        question: String,
        #[serde(rename = "condition", alias = "op", default)]
        op: ConditionOp,
        #[serde(default)]
        value: serde_json::Value,
    },
}

impl Condition {
    pub fn equals(question: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(question, ConditionOp::Equals, value.into())
    }

    pub fn not_equals(question: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(question, ConditionOp::NotEquals, value.into())
    }

    pub fn contains(question: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(question, ConditionOp::Contains, value.into())
    }

    pub fn in_list<I, S>(question: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<serde_json::Value> = values
            .into_iter()
            .map(|v| serde_json::Value::String(v.into()))
            .collect();
        Self::Leaf {
            question: question.into(),
            op: ConditionOp::InList,
            value: serde_json::Value::Array(list),
        }
    }

    pub fn is_empty(question: impl Into<String>) -> Self {
        Self::Leaf {
            question: question.into(),
            op: ConditionOp::IsEmpty,
            value: serde_json::Value::Null,
        }
    }

    pub fn is_not_empty(question: impl Into<String>) -> Self {
        Self::Leaf {
            question: question.into(),
            op: ConditionOp::IsNotEmpty,
            value: serde_json::Value::Null,
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::Composite {
            operator: BoolOperator::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::Composite {
            operator: BoolOperator::Or,
            conditions,
        }
    }

    pub fn negate(condition: Condition) -> Self {
        Self::Composite {
            operator: BoolOperator::Not,
            conditions: vec![condition],
        }
    }

    fn leaf(question: impl Into<String>, op: ConditionOp, value: impl Into<serde_json::Value>) -> Self {
        Self::Leaf {
            question: question.into(),
            op,
            value: value.into(),
        }
    }

    /// Question keys this condition reads, for definition validation.
    pub fn referenced_questions<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Leaf { question, .. } => out.push(question),
            Self::Composite { conditions, .. } => {
                for c in conditions {
                    c.referenced_questions(out);
                }
            }
        }
    }
}

/// Pure condition evaluator over a session's recorded answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a condition against the session's answers so far.
    pub fn evaluate(&self, condition: &Condition, session: &SequenceSession) -> bool {
        match condition {
            Condition::Composite { operator, conditions } => {
                self.evaluate_composite(*operator, conditions, session)
            }
            Condition::Leaf { question, op, value } => {
                self.evaluate_leaf(question, *op, value, session)
            }
        }
    }

    /// Whether a question should currently be asked.
    ///
    /// Absent `show_if` defaults to visible; absent `skip_if` never skips.
    pub fn should_show(&self, question: &SequenceQuestion, session: &SequenceSession) -> bool {
        if let Some(show_if) = &question.show_if
            && !self.evaluate(show_if, session)
        {
            tracing::debug!(question = %question.key, "hidden by show_if condition");
            return false;
        }
        if let Some(skip_if) = &question.skip_if
            && self.evaluate(skip_if, session)
        {
            tracing::debug!(question = %question.key, "skipped by skip_if condition");
            return false;
        }
        true
    }

    fn evaluate_composite(
        &self,
        operator: BoolOperator,
        conditions: &[Condition],
        session: &SequenceSession,
    ) -> bool {
        match operator {
            // Empty child list evaluates to true for both combinators
            BoolOperator::And => conditions.iter().all(|c| self.evaluate(c, session)),
            BoolOperator::Or => {
                conditions.is_empty() || conditions.iter().any(|c| self.evaluate(c, session))
            }
            BoolOperator::Not => {
                if conditions.len() != 1 {
                    // Permissive fallback, kept from the original engine
                    warn!(
                        children = conditions.len(),
                        "not operator expects exactly one child condition"
                    );
                    return true;
                }
                !self.evaluate(&conditions[0], session)
            }
        }
    }

    fn evaluate_leaf(
        &self,
        question: &str,
        op: ConditionOp,
        expected: &serde_json::Value,
        session: &SequenceSession,
    ) -> bool {
        let answer = session.answer(question);

        // Absent answers: presence checks resolve the obvious way, every
        // comparison (negated ones included) resolves to false.
        let Some(answer) = answer else {
            return match op {
                ConditionOp::IsEmpty => true,
                ConditionOp::IsNotEmpty => false,
                _ => false,
            };
        };

        let actual = answer.value.to_lowercase();
        match op {
            ConditionOp::Equals => actual == value_text(expected).to_lowercase(),
            ConditionOp::NotEquals => actual != value_text(expected).to_lowercase(),
            ConditionOp::Contains => actual.contains(&value_text(expected).to_lowercase()),
            ConditionOp::NotContains => !actual.contains(&value_text(expected).to_lowercase()),
            ConditionOp::InList => expected
                .as_array()
                .is_some_and(|list| list.iter().any(|v| value_text(v).to_lowercase() == actual)),
            ConditionOp::NotInList => expected
                .as_array()
                .is_none_or(|list| !list.iter().any(|v| value_text(v).to_lowercase() == actual)),
            ConditionOp::IsEmpty => answer.value.trim().is_empty(),
            ConditionOp::IsNotEmpty => !answer.value.trim().is_empty(),
        }
    }
}

/// Plain-text rendering of a JSON scalar for comparison.
fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::types::{QuestionType, SequenceAnswer};

    fn session_with(answers: &[(&str, &str)]) -> SequenceSession {
        let mut session = SequenceSession::new(1, "test");
        for (key, value) in answers {
            session.add_answer(SequenceAnswer::new(*key, *value));
        }
        session
    }

    #[test]
    fn equals_is_case_insensitive() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("color", "Blue")]);
        assert!(eval.evaluate(&Condition::equals("color", "blue"), &session));
        assert!(eval.evaluate(&Condition::equals("color", "BLUE"), &session));
        assert!(!eval.evaluate(&Condition::equals("color", "red"), &session));
    }

    #[test]
    fn missing_answer_fails_comparisons() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[]);
        assert!(!eval.evaluate(&Condition::equals("color", "blue"), &session));
        assert!(!eval.evaluate(&Condition::contains("color", "bl"), &session));
        assert!(!eval.evaluate(&Condition::in_list("color", ["blue"]), &session));
    }

    #[test]
    fn missing_answer_fails_negated_comparisons_too() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[]);
        assert!(!eval.evaluate(&Condition::not_equals("color", "blue"), &session));
        let not_contains = Condition::Leaf {
            question: "color".into(),
            op: ConditionOp::NotContains,
            value: "bl".into(),
        };
        assert!(!eval.evaluate(&not_contains, &session));
        let not_in_list = Condition::Leaf {
            question: "color".into(),
            op: ConditionOp::NotInList,
            value: serde_json::json!(["blue", "green"]),
        };
        assert!(!eval.evaluate(&not_in_list, &session));
    }

    #[test]
    fn missing_answer_presence_checks() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[]);
        assert!(eval.evaluate(&Condition::is_empty("color"), &session));
        assert!(!eval.evaluate(&Condition::is_not_empty("color"), &session));
    }

    #[test]
    fn contains_and_negation() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("bio", "I like Rust and hiking")]);
        assert!(eval.evaluate(&Condition::contains("bio", "rust"), &session));
        assert!(!eval.evaluate(
            &Condition::Leaf {
                question: "bio".into(),
                op: ConditionOp::NotContains,
                value: "rust".into(),
            },
            &session
        ));
    }

    #[test]
    fn in_list_membership() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("color", "Blue")]);
        assert!(eval.evaluate(&Condition::in_list("color", ["red", "blue"]), &session));
        assert!(!eval.evaluate(&Condition::in_list("color", ["red", "green"]), &session));
    }

    #[test]
    fn in_list_with_non_list_value_is_false() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("color", "blue")]);
        let cond = Condition::Leaf {
            question: "color".into(),
            op: ConditionOp::InList,
            value: "blue".into(),
        };
        assert!(!eval.evaluate(&cond, &session));
        let cond = Condition::Leaf {
            question: "color".into(),
            op: ConditionOp::NotInList,
            value: "blue".into(),
        };
        assert!(eval.evaluate(&cond, &session));
    }

    #[test]
    fn is_empty_on_whitespace_answer() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("note", "   ")]);
        assert!(eval.evaluate(&Condition::is_empty("note"), &session));
        assert!(!eval.evaluate(&Condition::is_not_empty("note"), &session));
    }

    #[test]
    fn and_or_combinators() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("a", "1"), ("b", "2")]);

        let both = Condition::and(vec![Condition::equals("a", "1"), Condition::equals("b", "2")]);
        assert!(eval.evaluate(&both, &session));

        let one_wrong =
            Condition::and(vec![Condition::equals("a", "1"), Condition::equals("b", "9")]);
        assert!(!eval.evaluate(&one_wrong, &session));

        let either =
            Condition::or(vec![Condition::equals("a", "9"), Condition::equals("b", "2")]);
        assert!(eval.evaluate(&either, &session));
    }

    #[test]
    fn empty_composites_are_true() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[]);
        assert!(eval.evaluate(&Condition::and(vec![]), &session));
        assert!(eval.evaluate(&Condition::or(vec![]), &session));
    }

    #[test]
    fn not_negates_single_child() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("a", "1")]);
        assert!(!eval.evaluate(&Condition::negate(Condition::equals("a", "1")), &session));
        assert!(eval.evaluate(&Condition::negate(Condition::equals("a", "2")), &session));
    }

    #[test]
    fn not_with_wrong_arity_defaults_to_true() {
        // Permissive fallback behavior, pinned deliberately
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("a", "1")]);
        let empty = Condition::Composite {
            operator: BoolOperator::Not,
            conditions: vec![],
        };
        assert!(eval.evaluate(&empty, &session));
        let two = Condition::Composite {
            operator: BoolOperator::Not,
            conditions: vec![Condition::equals("a", "1"), Condition::equals("a", "1")],
        };
        assert!(eval.evaluate(&two, &session));
    }

    #[test]
    fn should_show_defaults_to_visible() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[]);
        let plain = SequenceQuestion::new("q", QuestionType::Text);
        assert!(eval.should_show(&plain, &session));
    }

    #[test]
    fn should_show_combines_show_if_and_skip_if() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("confirm", "false")]);

        let shown = SequenceQuestion::new("name", QuestionType::Text)
            .show_if(Condition::equals("confirm", "false"));
        assert!(eval.should_show(&shown, &session));

        let hidden = SequenceQuestion::new("name", QuestionType::Text)
            .show_if(Condition::equals("confirm", "true"));
        assert!(!eval.should_show(&hidden, &session));

        let skipped = SequenceQuestion::new("name", QuestionType::Text)
            .skip_if(Condition::equals("confirm", "false"));
        assert!(!eval.should_show(&skipped, &session));
    }

    #[test]
    fn should_show_is_pure() {
        let eval = ConditionEvaluator::new();
        let session = session_with(&[("a", "yes")]);
        let q = SequenceQuestion::new("q", QuestionType::Text)
            .show_if(Condition::equals("a", "yes"));
        let first = eval.should_show(&q, &session);
        let second = eval.should_show(&q, &session);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn condition_deserializes_from_dict_shape() {
        let json = r#"{"condition": "equals", "question": "confirm_user_name", "value": "false"}"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(cond, Condition::equals("confirm_user_name", "false"));

        let json = r#"{
            "operator": "and",
            "conditions": [
                {"question": "a", "condition": "equals", "value": "1"},
                {"question": "b", "condition": "is_not_empty"}
            ]
        }"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        match cond {
            Condition::Composite { operator, conditions } => {
                assert_eq!(operator, BoolOperator::And);
                assert_eq!(conditions.len(), 2);
            }
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn leaf_op_defaults_to_equals() {
        let json = r#"{"question": "a", "value": "1"}"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(cond, Condition::equals("a", "1"));
    }

    #[test]
    fn malformed_condition_fails_at_parse_time() {
        // Neither leaf nor composite shape
        let json = r#"{"operand": "xor"}"#;
        assert!(serde_json::from_str::<Condition>(json).is_err());
    }

    #[test]
    fn referenced_questions_walks_tree() {
        let cond = Condition::and(vec![
            Condition::equals("a", "1"),
            Condition::or(vec![Condition::is_empty("b"), Condition::equals("c", "3")]),
        ]);
        let mut refs = Vec::new();
        cond.referenced_questions(&mut refs);
        assert_eq!(refs, vec!["a", "b", "c"]);
    }
}
