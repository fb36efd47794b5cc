//! Translation boundary.
//!
//! The engine never formats final UI strings itself: it selects a translation
//! key plus a flat parameter map and hands both to a `Translator`. Question
//! and option texts may also be given directly, in which case the translator
//! is bypassed for that string.

use std::collections::HashMap;

/// Flat parameter map passed alongside a translation key.
pub type TranslateParams = HashMap<String, String>;

/// Localization collaborator.
///
/// Implementations own locale selection and message formats; the engine only
/// supplies keys and parameters.
pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, params: &TranslateParams) -> String;
}

/// Fallback translator that echoes the key, appending any parameters.
///
/// Useful for tests and for running the demo without translation files.
#[derive(Debug, Clone, Default)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate(&self, key: &str, params: &TranslateParams) -> String {
        if params.is_empty() {
            return key.to_string();
        }
        let mut pairs: Vec<_> = params.iter().collect();
        pairs.sort();
        let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{key} [{}]", rendered.join(", "))
    }
}

/// Convenience constructor for a one-entry parameter map.
pub fn params1(key: &str, value: impl Into<String>) -> TranslateParams {
    let mut params = TranslateParams::new();
    params.insert(key.to_string(), value.into());
    params
}
