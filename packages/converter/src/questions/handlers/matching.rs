//! Converter for matching questions.

use roxmltree::Node;

use super::template::RESPONSE_TOKEN;
use crate::answers::AnswerExpander;
use crate::config::MatchingLayout;
use crate::error::{ConverterError, Result};
use crate::questions::handler::{correct_ident, response_labels, stimulus, QuestionConverter};
use crate::questions::types::{
    AssociationQuestion, ClozeDropdownQuestion, QuestionContext, QuestionPayload, ResponseSpec,
    ResponseValue, ScoringType, Validation,
};
use crate::xml::{find_all_by_path, find_by_path, get_attribute, get_text};

/// One left-hand row of a matching question.
struct MatchRow {
    text: String,
    labels: Vec<String>,
    accepted: Option<String>,
}

fn read_rows(node: Node<'_, '_>) -> Vec<MatchRow> {
    find_all_by_path(node, "presentation/response_lid")
        .into_iter()
        .map(|lid| {
            let correct = get_attribute(lid, "ident").and_then(|ident| correct_ident(node, ident));
            let labels = response_labels(lid);
            let accepted = labels
                .iter()
                .find(|(ident, _)| Some(ident) == correct.as_ref())
                .map(|(_, text)| text.clone());

            MatchRow {
                text: find_by_path(lid, "material/mattext")
                    .map(get_text)
                    .unwrap_or_default(),
                labels: labels.into_iter().map(|(_, text)| text).collect(),
                accepted,
            }
        })
        .collect()
}

/// Converter for `matching_question`.
///
/// The dropdown layout renders one line per row with a dropdown blank; the
/// association layout renders a drag-and-drop list.
pub struct MatchingConverter {
    layout: MatchingLayout,
}

impl MatchingConverter {
    #[must_use]
    pub fn new(layout: MatchingLayout) -> Self {
        Self { layout }
    }

    fn accepted_per_row(rows: &[MatchRow], context: &QuestionContext) -> Result<Vec<String>> {
        rows.iter()
            .map(|row| {
                row.accepted.clone().ok_or_else(|| {
                    ConverterError::malformed(
                        &context.question_type,
                        format!("row '{}' has no correct match", row.text),
                    )
                })
            })
            .collect()
    }
}

impl QuestionConverter for MatchingConverter {
    fn type_tag(&self) -> &'static str {
        match self.layout {
            MatchingLayout::Dropdown => "clozedropdown",
            MatchingLayout::Association => "association",
        }
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        let rows = read_rows(node);
        let validation = self.answer_key(node, context)?.unwrap_or_default();

        Ok(match self.layout {
            MatchingLayout::Dropdown => QuestionPayload::ClozeDropdown(ClozeDropdownQuestion {
                stimulus: stimulus(node),
                template: rows
                    .iter()
                    .map(|row| format!("<p>{} {RESPONSE_TOKEN}</p>", row.text))
                    .collect(),
                possible_responses: rows.iter().map(|row| row.labels.clone()).collect(),
                duplicate_responses: Some(true),
                validation,
            }),
            MatchingLayout::Association => QuestionPayload::Association(AssociationQuestion {
                stimulus: stimulus(node),
                stimulus_list: rows.iter().map(|row| row.text.clone()).collect(),
                possible_responses: rows.first().map(|row| row.labels.clone()).unwrap_or_default(),
                duplicate_responses: true,
                validation,
            }),
        })
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let accepted = Self::accepted_per_row(&read_rows(node), context)?;

        let validation = match self.layout {
            MatchingLayout::Dropdown => {
                let candidates: Vec<Vec<String>> =
                    accepted.into_iter().map(|label| vec![label]).collect();
                let (valid, alternates) = AnswerExpander::new(&candidates, context.points)
                    .valid_and_alternates()
                    .ok_or_else(|| {
                        ConverterError::malformed(&context.question_type, "no accepted answers")
                    })?;
                Validation::partial_match_v2(valid.into())
                    .with_alternates(alternates.into_iter().map(ResponseSpec::from).collect())
            }
            MatchingLayout::Association => Validation {
                scoring_type: Some(ScoringType::PartialMatch),
                valid_response: Some(ResponseSpec::scored(
                    ResponseValue::Labels(accepted),
                    context.points,
                )),
                ..Validation::default()
            },
        };

        Ok(Some(validation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    const MATCHING: &str = r#"<item ident="m1">
      <presentation>
        <material><mattext>Match the capitals</mattext></material>
        <response_lid ident="response_10">
          <material><mattext>France</mattext></material>
          <render_choice>
            <response_label ident="501"><material><mattext>Paris</mattext></material></response_label>
            <response_label ident="502"><material><mattext>Rome</mattext></material></response_label>
          </render_choice>
        </response_lid>
        <response_lid ident="response_11">
          <material><mattext>Italy</mattext></material>
          <render_choice>
            <response_label ident="501"><material><mattext>Paris</mattext></material></response_label>
            <response_label ident="502"><material><mattext>Rome</mattext></material></response_label>
          </render_choice>
        </response_lid>
      </presentation>
      <resprocessing>
        <respcondition><conditionvar><varequal respident="response_10">501</varequal></conditionvar><setvar varname="SCORE" action="Add">50</setvar></respcondition>
        <respcondition><conditionvar><varequal respident="response_11">502</varequal></conditionvar><setvar varname="SCORE" action="Add">50</setvar></respcondition>
      </resprocessing>
    </item>"#;

    fn labels(values: &[&str]) -> ResponseValue {
        ResponseValue::Labels(values.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_matching_as_dropdowns() {
        let doc = Document::parse(MATCHING).unwrap();
        let context = QuestionContext::new("matching_question", 1.0);
        let converter = MatchingConverter::new(MatchingLayout::Dropdown);

        let QuestionPayload::ClozeDropdown(question) =
            converter.convert(doc.root_element(), &context).unwrap()
        else {
            panic!("expected clozedropdown payload");
        };

        assert_eq!(question.stimulus, "Match the capitals");
        assert_eq!(
            question.template,
            "<p>France {{response}}</p><p>Italy {{response}}</p>"
        );
        assert_eq!(question.duplicate_responses, Some(true));
        assert_eq!(question.possible_responses[1], vec!["Paris", "Rome"]);
        assert_eq!(
            question.validation.valid_response.unwrap().value,
            labels(&["Paris", "Rome"])
        );
    }

    #[test]
    fn test_matching_as_association() {
        let doc = Document::parse(MATCHING).unwrap();
        let context = QuestionContext::new("matching_question", 1.0);
        let converter = MatchingConverter::new(MatchingLayout::Association);
        assert_eq!(converter.type_tag(), "association");

        let QuestionPayload::Association(question) =
            converter.convert(doc.root_element(), &context).unwrap()
        else {
            panic!("expected association payload");
        };

        assert_eq!(question.stimulus_list, vec!["France", "Italy"]);
        assert_eq!(question.possible_responses, vec!["Paris", "Rome"]);
        assert_eq!(question.validation.scoring_type, Some(ScoringType::PartialMatch));
        assert_eq!(
            question.validation.valid_response.unwrap().value,
            labels(&["Paris", "Rome"])
        );
    }

    #[test]
    fn test_matching_row_without_answer() {
        let xml = MATCHING.replace(r#"respident="response_11">502"#, r#"respident="response_12">502"#);
        let doc = Document::parse(&xml).unwrap();
        let context = QuestionContext::new("matching_question", 1.0);

        let err = MatchingConverter::new(MatchingLayout::Dropdown)
            .convert(doc.root_element(), &context)
            .unwrap_err();
        assert!(err.to_string().contains("Italy"));
    }
}
