//! seqflow — configuration-driven conversational sequence engine.
//!
//! A sequence is a named, ordered list of questions with per-question
//! conditional visibility, validation, and optional scoring. The engine walks
//! a user through the list one answer at a time, tracks a per-user session,
//! and renders progress and completion summaries. Transport (chat platform),
//! localization, and result persistence are injected behind narrow traits.

pub mod config;
pub mod error;
pub mod i18n;
pub mod sequence;
pub mod transport;
