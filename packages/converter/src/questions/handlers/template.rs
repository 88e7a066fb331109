//! Converters for template questions with named blanks.
//!
//! The question text carries `[name]` placeholders. A placeholder is a blank
//! when the item declares `response_lid[ident="response_<name>"]`; any other
//! bracketed text is left in place.

use roxmltree::Node;

use crate::answers::AnswerExpander;
use crate::error::{ConverterError, Result};
use crate::questions::handler::{
    correct_ident, placeholder_names, response_labels, response_lid, stimulus,
    substitute_placeholder, QuestionConverter,
};
use crate::questions::types::{
    ClozeDropdownQuestion, ClozeTextQuestion, QuestionContext, QuestionPayload, ResponseSpec,
    Validation,
};

/// Token a blank is replaced with in the target template.
pub const RESPONSE_TOKEN: &str = "{{response}}";

/// A named blank and its response element.
struct Blank<'a, 'input> {
    name: String,
    lid: Node<'a, 'input>,
}

impl Blank<'_, '_> {
    fn response_ident(&self) -> String {
        format!("response_{}", self.name)
    }
}

/// Find the blanks of an item, in template order.
fn find_blanks<'a, 'input>(item: Node<'a, 'input>) -> Vec<Blank<'a, 'input>> {
    placeholder_names(&stimulus(item))
        .into_iter()
        .filter_map(|name| {
            response_lid(item, &format!("response_{name}")).map(|lid| Blank { name, lid })
        })
        .collect()
}

/// Replace every blank with the response token.
fn build_template(template: &str, blanks: &[Blank<'_, '_>]) -> String {
    blanks.iter().fold(template.to_string(), |acc, blank| {
        substitute_placeholder(&acc, &blank.name, RESPONSE_TOKEN)
    })
}

/// Expand per-blank candidates into a partial match (v2) validation.
fn expand_validation(
    blanks: &[Blank<'_, '_>],
    candidates: &[Vec<String>],
    context: &QuestionContext,
) -> Result<Validation> {
    let expander = AnswerExpander::new(candidates, context.points);

    if let Some(index) = expander.first_empty_blank() {
        let name = blanks.get(index).map(|b| b.name.as_str()).unwrap_or_default();
        return Err(ConverterError::malformed(
            &context.question_type,
            format!("blank '{name}' has no accepted answers"),
        ));
    }

    let (valid, alternates) = expander.valid_and_alternates().ok_or_else(|| {
        ConverterError::malformed(&context.question_type, "no accepted answers")
    })?;

    Ok(Validation::partial_match_v2(valid.into())
        .with_alternates(alternates.into_iter().map(ResponseSpec::from).collect()))
}

/// Converter for `fill_in_multiple_blanks_question`.
///
/// Every label of a blank is an accepted answer, so the answer key is the
/// cross product of all blanks.
pub struct FillTheBlanksConverter;

impl FillTheBlanksConverter {
    fn candidates(blanks: &[Blank<'_, '_>]) -> Vec<Vec<String>> {
        blanks
            .iter()
            .map(|blank| {
                response_labels(blank.lid)
                    .into_iter()
                    .map(|(_, text)| text)
                    .collect()
            })
            .collect()
    }
}

impl QuestionConverter for FillTheBlanksConverter {
    fn type_tag(&self) -> &'static str {
        "clozetext"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        let blanks = find_blanks(node);

        Ok(QuestionPayload::ClozeText(ClozeTextQuestion {
            stimulus: String::new(),
            template: build_template(&stimulus(node), &blanks),
            validation: self.answer_key(node, context)?.unwrap_or_default(),
        }))
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let blanks = find_blanks(node);
        let candidates = Self::candidates(&blanks);
        expand_validation(&blanks, &candidates, context).map(Some)
    }
}

/// Converter for `multiple_dropdowns_question`.
///
/// Each blank accepts the single label selected by its response condition.
pub struct MultipleDropdownsConverter;

impl MultipleDropdownsConverter {
    fn candidates(node: Node<'_, '_>, blanks: &[Blank<'_, '_>]) -> Vec<Vec<String>> {
        blanks
            .iter()
            .map(|blank| {
                let correct = correct_ident(node, &blank.response_ident());
                response_labels(blank.lid)
                    .into_iter()
                    .filter(|(ident, _)| Some(ident) == correct.as_ref())
                    .map(|(_, text)| text)
                    .collect()
            })
            .collect()
    }
}

impl QuestionConverter for MultipleDropdownsConverter {
    fn type_tag(&self) -> &'static str {
        "clozedropdown"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        let blanks = find_blanks(node);
        let possible_responses = blanks
            .iter()
            .map(|blank| {
                response_labels(blank.lid)
                    .into_iter()
                    .map(|(_, text)| text)
                    .collect()
            })
            .collect();

        Ok(QuestionPayload::ClozeDropdown(ClozeDropdownQuestion {
            stimulus: String::new(),
            template: build_template(&stimulus(node), &blanks),
            possible_responses,
            duplicate_responses: None,
            validation: self.answer_key(node, context)?.unwrap_or_default(),
        }))
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let blanks = find_blanks(node);
        let candidates = Self::candidates(node, &blanks);
        expand_validation(&blanks, &candidates, context).map(Some)
    }
}
