//! Question registry for mapping declared question types to converters.

use std::collections::{HashMap, HashSet};

use super::handler::QuestionConverter;

/// Registry mapping declared question types to converters.
///
/// Types marked as features convert to non-scored widgets; every other
/// registered type is a question.
pub struct QuestionRegistry {
    converters: HashMap<String, Box<dyn QuestionConverter>>,
    feature_types: HashSet<String>,
}

impl QuestionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            feature_types: HashSet::new(),
        }
    }

    /// Register a converter for a declared question type.
    pub fn register(
        &mut self,
        question_type: impl Into<String>,
        converter: impl QuestionConverter + 'static,
    ) {
        self.converters
            .insert(question_type.into(), Box::new(converter));
    }

    /// Mark question types as features.
    pub fn feature(&mut self, question_types: impl IntoIterator<Item = impl Into<String>>) {
        for question_type in question_types {
            self.feature_types.insert(question_type.into());
        }
    }

    /// Get the converter for a declared question type.
    #[must_use]
    pub fn get_converter(&self, question_type: &str) -> Option<&dyn QuestionConverter> {
        self.converters.get(question_type).map(|c| c.as_ref())
    }

    /// Check if a question type converts to a feature.
    #[must_use]
    pub fn is_feature(&self, question_type: &str) -> bool {
        self.feature_types.contains(question_type)
    }

    /// Check if a converter is registered for a question type.
    #[must_use]
    pub fn has_converter(&self, question_type: &str) -> bool {
        self.converters.contains_key(question_type)
    }

    /// Return set of all registered question types.
    #[must_use]
    pub fn registered_types(&self) -> HashSet<&str> {
        self.converters.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for QuestionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
