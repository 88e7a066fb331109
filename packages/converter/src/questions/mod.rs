//! Question converter system.
//!
//! This module provides a registry-based approach to converting QTI question
//! items. Converters are registered per declared question type, allowing for
//! extensible and testable conversion.

mod config;
mod core;
mod engine;
mod handler;
pub mod handlers;
mod types;

pub use config::create_question_registry;
pub use core::QuestionRegistry;
pub use engine::{ConversionEngine, ConvertedQuestion};
pub use handler::{
    correct_ident, declared_type, final_conditions, label_text, placeholder_names,
    points_possible, read_context, response_conditions, response_labels, response_lid, stimulus,
    substitute_placeholder, QuestionConverter,
};
pub use types::*;
