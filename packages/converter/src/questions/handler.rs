//! Question converter trait and shared QTI extraction helpers.

use roxmltree::Node;

use super::types::{DynamicContent, QuestionContext, QuestionPayload, Validation};
use crate::config::PLACEHOLDER_PATTERN;
use crate::error::{ConverterError, Result};
use crate::xml::{
    find_all_by_path, find_by_path, find_descendants, get_attribute, get_text,
    item_metadata_field,
};

/// Trait for question converters.
///
/// A converter turns one QTI `<item>` into a target payload. Answer key
/// extraction is separate from payload construction so it can be exercised on
/// its own.
pub trait QuestionConverter: Send + Sync {
    /// Type tag of the payload this converter produces.
    fn type_tag(&self) -> &'static str;

    /// Build the payload for an item.
    ///
    /// # Arguments
    /// * `node` - The `<item>` element
    /// * `context` - Declared type, identifier and points of the item
    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload>;

    /// Extract the scoring rules of an item.
    ///
    /// # Errors
    /// Returns `MalformedAnswerKey` when the response processing the converter
    /// relies on is absent.
    fn answer_key(&self, node: Node<'_, '_>, context: &QuestionContext)
        -> Result<Option<Validation>>;

    /// Variable table for formula questions.
    fn dynamic_content(
        &self,
        _node: Node<'_, '_>,
        _context: &QuestionContext,
    ) -> Result<Option<DynamicContent>> {
        Ok(None)
    }
}

/// Read the declared question type of an item.
///
/// Falls back to the common cartridge profile when `question_type` is absent.
pub fn declared_type(item: Node<'_, '_>) -> Option<String> {
    item_metadata_field(item, "question_type")
        .filter(|t| !t.is_empty())
        .or_else(|| item_metadata_field(item, "cc_profile").filter(|t| !t.is_empty()))
}

/// Read `points_possible`, falling back to `default_points`.
pub fn points_possible(item: Node<'_, '_>, default_points: f64) -> f64 {
    match item_metadata_field(item, "points_possible") {
        Some(raw) => raw.parse::<f64>().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "Unparsable points_possible, using default");
            default_points
        }),
        None => default_points,
    }
}

/// Build the converter context for an item.
pub fn read_context(item: Node<'_, '_>, default_points: f64) -> QuestionContext {
    QuestionContext {
        ident: get_attribute(item, "ident").map(str::to_string),
        question_type: declared_type(item).unwrap_or_default(),
        points: points_possible(item, default_points),
    }
}

/// Question text: the first `presentation/material/mattext`.
pub fn stimulus(item: Node<'_, '_>) -> String {
    find_by_path(item, "presentation/material/mattext")
        .map(get_text)
        .unwrap_or_default()
}

/// All response conditions in document order.
pub fn response_conditions<'a, 'input>(item: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    find_all_by_path(item, "resprocessing/respcondition")
}

/// Response conditions that stop evaluation (`continue="No"`).
pub fn final_conditions<'a, 'input>(item: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    response_conditions(item)
        .into_iter()
        .filter(|c| get_attribute(*c, "continue").is_some_and(|v| v.eq_ignore_ascii_case("no")))
        .collect()
}

/// Text of the first `varequal` compared against `respident`.
pub fn correct_ident(item: Node<'_, '_>, respident: &str) -> Option<String> {
    response_conditions(item)
        .into_iter()
        .flat_map(|c| find_descendants(c, "varequal"))
        .find(|v| get_attribute(*v, "respident") == Some(respident))
        .map(get_text)
}

/// Find a `response_lid` by identifier.
pub fn response_lid<'a, 'input>(item: Node<'a, 'input>, ident: &str) -> Option<Node<'a, 'input>> {
    find_descendants(item, "response_lid").find(|lid| get_attribute(*lid, "ident") == Some(ident))
}

/// Display text of a `response_label` or `material` container.
pub fn label_text(node: Node<'_, '_>) -> String {
    find_descendants(node, "mattext")
        .next()
        .map(get_text)
        .unwrap_or_default()
}

/// `(ident, text)` of every `response_label` of a response element.
pub fn response_labels(response: Node<'_, '_>) -> Vec<(String, String)> {
    find_descendants(response, "response_label")
        .map(|label| {
            (
                get_attribute(label, "ident").unwrap_or_default().to_string(),
                label_text(label),
            )
        })
        .collect()
}

/// Placeholder names in a template, in order of appearance.
///
/// # Examples
/// ```
/// use qti_converter::questions::placeholder_names;
///
/// assert_eq!(placeholder_names("[x] plus [y] is [x]"), vec!["x", "y", "x"]);
/// ```
pub fn placeholder_names(template: &str) -> Vec<String> {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Replace the first `[name]` in `template`.
pub fn substitute_placeholder(template: &str, name: &str, replacement: &str) -> String {
    template.replacen(&format!("[{name}]"), replacement, 1)
}

/// Parse a numeric answer value.
pub fn parse_number(question_type: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConverterError::malformed(question_type, format!("'{raw}' is not a number")))
}
