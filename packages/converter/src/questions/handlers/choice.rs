//! Converters for choice questions.
//!
//! Multiple choice and true/false share one converter; multiple answers
//! differs only in how the answer key is read and scored.

use roxmltree::Node;

use crate::error::{ConverterError, Result};
use crate::questions::handler::{
    final_conditions, response_conditions, response_labels, stimulus, QuestionConverter,
};
use crate::questions::types::{
    ChoiceOption, ChoiceQuestion, QuestionContext, QuestionPayload, ResponseSpec, ResponseValue,
    Validation,
};
use crate::xml::{
    find_all_by_path, find_by_path, find_children, find_descendants, get_attribute, get_text,
};

/// Score assigned by the response condition of the correct choice.
const FULL_SCORE: f64 = 100.0;

/// Build the shared `mcq` payload.
fn choice_payload(
    node: Node<'_, '_>,
    context: &QuestionContext,
    multiple_responses: bool,
    validation: Validation,
) -> Result<QuestionPayload> {
    let lid = find_by_path(node, "presentation/response_lid").ok_or_else(|| {
        ConverterError::missing(
            "response_lid",
            context.ident.clone().unwrap_or_else(|| "item".to_string()),
        )
    })?;

    let options = response_labels(lid)
        .into_iter()
        .map(|(value, label)| ChoiceOption { value, label })
        .collect();

    Ok(QuestionPayload::MultipleChoice(ChoiceQuestion {
        stimulus: stimulus(node),
        options,
        multiple_responses,
        response_id: get_attribute(lid, "ident").unwrap_or_default().to_string(),
        validation,
    }))
}

/// Converter for `multiple_choice_question` and `true_false_question`.
///
/// The correct option is the one compared in the response condition that
/// sets the score to 100.
pub struct MultipleChoiceConverter;

impl QuestionConverter for MultipleChoiceConverter {
    fn type_tag(&self) -> &'static str {
        "mcq"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        let validation = self.answer_key(node, context)?.unwrap_or_default();
        choice_payload(node, context, false, validation)
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let correct = response_conditions(node)
            .into_iter()
            .find(|condition| {
                let setvars: Vec<_> = find_children(*condition, "setvar").collect();
                setvars.len() == 1
                    && get_text(setvars[0]).parse::<f64>().ok() == Some(FULL_SCORE)
            })
            .and_then(|condition| find_descendants(condition, "varequal").next())
            .map(get_text)
            .ok_or_else(|| {
                ConverterError::malformed(
                    &context.question_type,
                    "no response condition awards the full score",
                )
            })?;

        Ok(Some(Validation::exact_match(ResponseSpec::scored(
            ResponseValue::Labels(vec![correct]),
            context.points,
        ))))
    }
}

/// Converter for `multiple_answers_question`.
///
/// The correct options are the equality conditions under the `and` of the
/// first non-continuing response condition. Wrong selections cost the full
/// point value.
pub struct MultipleAnswersConverter;

impl QuestionConverter for MultipleAnswersConverter {
    fn type_tag(&self) -> &'static str {
        "mcq"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        let validation = self.answer_key(node, context)?.unwrap_or_default();
        choice_payload(node, context, true, validation)
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let condition = final_conditions(node).into_iter().next().ok_or_else(|| {
            ConverterError::malformed(&context.question_type, "no final response condition")
        })?;

        let correct: Vec<String> = find_all_by_path(condition, "conditionvar/and/varequal")
            .into_iter()
            .map(get_text)
            .collect();

        Ok(Some(
            Validation::partial_match_v2(ResponseSpec::scored(
                ResponseValue::Labels(correct),
                context.points,
            ))
            .with_penalty(context.points),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::types::{Rounding, ScoringType};
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    const MULTIPLE_CHOICE: &str = r#"<item ident="q1">
      <presentation>
        <material><mattext>What is 2+2?</mattext></material>
        <response_lid ident="response1" rcardinality="Single">
          <render_choice>
            <response_label ident="1487"><material><mattext>4</mattext></material></response_label>
            <response_label ident="9301"><material><mattext>5</mattext></material></response_label>
          </render_choice>
        </response_lid>
      </presentation>
      <resprocessing>
        <outcomes><decvar maxvalue="100" minvalue="0" varname="SCORE" vartype="Decimal"/></outcomes>
        <respcondition continue="No">
          <conditionvar><varequal respident="response1">1487</varequal></conditionvar>
          <setvar action="Set" varname="SCORE">100</setvar>
        </respcondition>
      </resprocessing>
    </item>"#;

    const MULTIPLE_ANSWERS: &str = r#"<item ident="q2">
      <presentation>
        <material><mattext>Pick primes</mattext></material>
        <response_lid ident="response1" rcardinality="Multiple">
          <render_choice>
            <response_label ident="a"><material><mattext>2</mattext></material></response_label>
            <response_label ident="b"><material><mattext>3</mattext></material></response_label>
            <response_label ident="c"><material><mattext>4</mattext></material></response_label>
          </render_choice>
        </response_lid>
      </presentation>
      <resprocessing>
        <respcondition continue="No">
          <conditionvar><and>
            <varequal respident="response1">a</varequal>
            <varequal respident="response1">b</varequal>
            <not><varequal respident="response1">c</varequal></not>
          </and></conditionvar>
          <setvar action="Set" varname="SCORE">100</setvar>
        </respcondition>
      </resprocessing>
    </item>"#;

    #[test]
    fn test_multiple_choice() {
        let doc = Document::parse(MULTIPLE_CHOICE).unwrap();
        let context = QuestionContext::new("multiple_choice_question", 1.0);

        let payload = MultipleChoiceConverter
            .convert(doc.root_element(), &context)
            .unwrap();

        let QuestionPayload::MultipleChoice(question) = payload else {
            panic!("expected mcq payload");
        };
        assert_eq!(question.stimulus, "What is 2+2?");
        assert_eq!(question.response_id, "response1");
        assert!(!question.multiple_responses);
        assert_eq!(question.options.len(), 2);
        assert_eq!(question.options[0].value, "1487");
        assert_eq!(question.options[0].label, "4");

        let valid = question.validation.valid_response.unwrap();
        assert_eq!(valid.value, ResponseValue::Labels(vec!["1487".to_string()]));
        assert_eq!(valid.score, Some(1.0));
        assert_eq!(question.validation.scoring_type, Some(ScoringType::ExactMatch));
    }

    #[test]
    fn test_multiple_choice_without_full_score() {
        let xml = MULTIPLE_CHOICE.replace(">100<", ">50<");
        let doc = Document::parse(&xml).unwrap();
        let context = QuestionContext::new("multiple_choice_question", 1.0);

        let err = MultipleChoiceConverter
            .answer_key(doc.root_element(), &context)
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_answer_key");
    }

    #[test]
    fn test_multiple_answers() {
        let doc = Document::parse(MULTIPLE_ANSWERS).unwrap();
        let context = QuestionContext::new("multiple_answers_question", 2.0);

        let payload = MultipleAnswersConverter
            .convert(doc.root_element(), &context)
            .unwrap();

        let QuestionPayload::MultipleChoice(question) = payload else {
            panic!("expected mcq payload");
        };
        assert!(question.multiple_responses);
        assert_eq!(question.validation.scoring_type, Some(ScoringType::PartialMatchV2));
        assert_eq!(question.validation.rounding, Some(Rounding::None));
        assert_eq!(question.validation.penalty, Some(2.0));
        assert_eq!(
            question.validation.valid_response.unwrap().value,
            ResponseValue::Labels(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_multiple_answers_without_final_condition() {
        let xml = MULTIPLE_ANSWERS.replace("continue=\"No\"", "continue=\"Yes\"");
        let doc = Document::parse(&xml).unwrap();
        let context = QuestionContext::new("multiple_answers_question", 1.0);

        assert!(MultipleAnswersConverter
            .convert(doc.root_element(), &context)
            .is_err());
    }
}
