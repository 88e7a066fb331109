//! Converter for numerical questions.

use roxmltree::Node;

use crate::error::{ConverterError, Result};
use crate::questions::handler::{final_conditions, parse_number, stimulus, QuestionConverter};
use crate::questions::types::{
    FormulaQuestion, MathValue, QuestionContext, QuestionPayload, ResponseSpec, ResponseValue,
    Validation,
};
use crate::xml::{find_descendants, get_text};

use super::template::RESPONSE_TOKEN;

/// Number of digits after the decimal point as written.
fn decimal_places(raw: &str) -> usize {
    raw.trim()
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

/// Express a range as `center\pm<half width>`, rounded to the bounds' precision.
///
/// # Examples
/// ```
/// use qti_converter::questions::handlers::range_to_equiv_value;
///
/// assert_eq!(range_to_equiv_value("1.5", "2.5", "numerical_question").unwrap(), "2.0\\pm0.5");
/// assert_eq!(range_to_equiv_value("3", "3", "numerical_question").unwrap(), "3\\pm0");
/// ```
pub fn range_to_equiv_value(lower: &str, upper: &str, question_type: &str) -> Result<String> {
    let precision = decimal_places(lower).max(decimal_places(upper));
    let low = parse_number(question_type, lower)?;
    let high = parse_number(question_type, upper)?;

    let center = (low + high) / 2.0;
    let half_width = ((low - high) / 2.0).abs();

    Ok(format!("{center:.precision$}\\pm{half_width:.precision$}"))
}

/// Converter for `numerical_question`.
///
/// Each accepted range becomes one `equivValue` answer; the first range is
/// the valid response and the others alternates.
pub struct NumericalConverter;

impl QuestionConverter for NumericalConverter {
    fn type_tag(&self) -> &'static str {
        "formulaV2"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        Ok(QuestionPayload::Formula(FormulaQuestion {
            is_math: true,
            stimulus: stimulus(node),
            template: RESPONSE_TOKEN.to_string(),
            validation: self.answer_key(node, context)?.unwrap_or_default(),
        }))
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let conditions = final_conditions(node);
        let lower_bounds = conditions
            .iter()
            .flat_map(|c| find_descendants(*c, "vargte"))
            .map(get_text);
        let upper_bounds = conditions
            .iter()
            .flat_map(|c| find_descendants(*c, "varlte"))
            .map(get_text);

        let mut answers = lower_bounds
            .zip(upper_bounds)
            .map(|(lower, upper)| {
                let value = range_to_equiv_value(&lower, &upper, &context.question_type)?;
                Ok(ResponseSpec::scored(
                    ResponseValue::Math(vec![MathValue::equiv_value(value)]),
                    context.points,
                ))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter();

        let valid = answers.next().ok_or_else(|| {
            ConverterError::malformed(&context.question_type, "no accepted range")
        })?;

        Ok(Some(
            Validation::exact_match(valid).with_alternates(answers.collect()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    const NUMERICAL: &str = r#"<item ident="n1">
      <presentation>
        <material><mattext>Half of four?</mattext></material>
        <response_str ident="response1" rcardinality="Single"><render_fib fibtype="Decimal"/></response_str>
      </presentation>
      <resprocessing>
        <respcondition continue="No">
          <conditionvar><or>
            <varequal respident="response1">2.0</varequal>
            <and><vargte respident="response1">1.5</vargte><varlte respident="response1">2.5</varlte></and>
          </or></conditionvar>
          <setvar action="Set" varname="SCORE">100</setvar>
        </respcondition>
        <respcondition continue="No">
          <conditionvar><and><vargte respident="response1">1.95</vargte><varlte respident="response1">2.05</varlte></and></conditionvar>
          <setvar action="Set" varname="SCORE">100</setvar>
        </respcondition>
      </resprocessing>
    </item>"#;

    fn math(value: &str) -> ResponseValue {
        ResponseValue::Math(vec![MathValue::equiv_value(value)])
    }

    #[test]
    fn test_numerical_ranges() {
        let doc = Document::parse(NUMERICAL).unwrap();
        let context = QuestionContext::new("numerical_question", 1.0);

        let QuestionPayload::Formula(question) =
            NumericalConverter.convert(doc.root_element(), &context).unwrap()
        else {
            panic!("expected formulaV2 payload");
        };

        assert!(question.is_math);
        assert_eq!(question.template, "{{response}}");
        assert_eq!(
            question.validation.valid_response.unwrap().value,
            math("2.0\\pm0.5")
        );
        assert_eq!(
            question.validation.alt_responses.unwrap()[0].value,
            math("2.00\\pm0.05")
        );
    }

    #[test]
    fn test_numerical_without_ranges() {
        let xml = r#"<item><resprocessing><respcondition continue="No"><conditionvar><varequal respident="r">2</varequal></conditionvar></respcondition></resprocessing></item>"#;
        let doc = Document::parse(xml).unwrap();
        let context = QuestionContext::new("numerical_question", 1.0);

        let err = NumericalConverter
            .answer_key(doc.root_element(), &context)
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_answer_key");
    }

    #[test]
    fn test_precision_follows_bounds() {
        assert_eq!(decimal_places("10"), 0);
        assert_eq!(decimal_places("0.125"), 3);
        assert_eq!(
            range_to_equiv_value("9", "11", "numerical_question").unwrap(),
            "10\\pm1"
        );
        assert!(range_to_equiv_value("x", "1", "numerical_question").is_err());
    }
}
