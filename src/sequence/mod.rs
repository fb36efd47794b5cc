//! Conversational sequence engine.
//!
//! A sequence is a registered [`SequenceDefinition`]: an ordered list of
//! questions, some gated by conditions on earlier answers. Each user has at
//! most one [`SequenceSession`] walking through it. The
//! [`SequenceOrchestrator`] is the façade a channel adapter drives; the
//! remaining modules are its collaborators.

pub mod catalog;
pub mod completion;
pub mod condition;
pub mod definitions;
pub mod orchestrator;
pub mod progress;
pub mod question;
pub mod store;
pub mod types;

pub use catalog::SequenceCatalog;
pub use completion::CompletionService;
pub use condition::{BoolOperator, Condition, ConditionEvaluator, ConditionOp};
pub use orchestrator::{AnswerOutcome, SequenceOrchestrator};
pub use progress::ProgressService;
pub use question::QuestionService;
pub use store::SessionStore;
pub use types::{
    CorrectAnswer, QuestionType, SequenceAnswer, SequenceDefinition, SequenceOption,
    SequenceQuestion, SequenceSession, SequenceStatus,
};
