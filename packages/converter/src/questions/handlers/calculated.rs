//! Converter for calculated (formula) questions.
//!
//! Variables in the question text are bound to columns of a dynamic content
//! table; each source variable set becomes one row with the expected answer in
//! the last column.

use indexmap::IndexMap;
use roxmltree::Node;
use uuid::Uuid;

use crate::error::{ConverterError, Result};
use crate::questions::handler::{
    placeholder_names, stimulus, substitute_placeholder, QuestionConverter,
};
use crate::questions::types::{
    DynamicContent, DynamicRow, FormulaQuestion, MathValue, QuestionContext, QuestionPayload,
    ResponseSpec, ResponseValue, Validation,
};
use crate::xml::{find_all_by_path, find_by_path, find_children, get_attribute, get_text};

use super::template::RESPONSE_TOKEN;

/// Column holding the expected answer.
const ANSWER_COLUMN: &str = "answer";

/// Token referring to the answer column.
const ANSWER_TOKEN: &str = "{{var:answer}}";

/// Converter for `calculated_question`.
pub struct CalculatedConverter;

impl CalculatedConverter {
    /// Question text with `[var]` placeholders bound to `{{var:val<i>}}`.
    fn template_stimulus(node: Node<'_, '_>) -> String {
        let text = stimulus(node);
        let names = placeholder_names(&text);
        names
            .iter()
            .enumerate()
            .fold(text, |acc, (index, name)| {
                substitute_placeholder(&acc, name, &format!("{{{{var:val{index}}}}}"))
            })
    }
}

impl QuestionConverter for CalculatedConverter {
    fn type_tag(&self) -> &'static str {
        "clozeformula"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        Ok(QuestionPayload::ClozeFormula(FormulaQuestion {
            is_math: true,
            stimulus: Self::template_stimulus(node),
            template: RESPONSE_TOKEN.to_string(),
            validation: self.answer_key(node, context)?.unwrap_or_default(),
        }))
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let tolerance = find_by_path(node, "itemproc_extension/calculated/answer_tolerance")
            .map(get_text)
            .ok_or_else(|| {
                ConverterError::malformed(&context.question_type, "no answer tolerance")
            })?;

        Ok(Some(Validation::exact_match(ResponseSpec::scored(
            ResponseValue::MathBlanks(vec![vec![MathValue::equiv_value(format!(
                "{ANSWER_TOKEN}\\pm{tolerance}"
            ))]]),
            context.points,
        ))))
    }

    fn dynamic_content(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<DynamicContent>> {
        let names = placeholder_names(&stimulus(node));
        let var_sets = find_all_by_path(node, "itemproc_extension/calculated/var_sets/var_set");

        if var_sets.is_empty() {
            return Err(ConverterError::malformed(
                &context.question_type,
                "no variable sets",
            ));
        }

        let mut rows = IndexMap::new();
        for (index, var_set) in var_sets.into_iter().enumerate() {
            let mut values = names
                .iter()
                .map(|name| {
                    find_children(var_set, "var")
                        .find(|var| get_attribute(*var, "name") == Some(name.as_str()))
                        .map(get_text)
                        .ok_or_else(|| {
                            ConverterError::malformed(
                                &context.question_type,
                                format!("variable set {index} has no value for '{name}'"),
                            )
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let answer = find_children(var_set, "answer")
                .next()
                .map(get_text)
                .ok_or_else(|| {
                    ConverterError::malformed(
                        &context.question_type,
                        format!("variable set {index} has no answer"),
                    )
                })?;
            values.push(answer);

            rows.insert(Uuid::new_v4(), DynamicRow { values, index });
        }

        let mut cols: Vec<String> = (0..names.len()).map(|i| format!("val{i}")).collect();
        cols.push(ANSWER_COLUMN.to_string());

        Ok(Some(DynamicContent { cols, rows }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    const CALCULATED: &str = r#"<item ident="c1">
      <presentation>
        <material><mattext>What is [x] + [y]?</mattext></material>
        <response_str ident="response1"><render_fib fibtype="Decimal"/></response_str>
      </presentation>
      <itemproc_extension>
        <calculated>
          <answer_tolerance>0.01</answer_tolerance>
          <formulas decimal_places="0"><formula>x+y</formula></formulas>
          <var_sets>
            <var_set ident="1"><var name="x">5</var><var name="y">3</var><answer>8</answer></var_set>
            <var_set ident="2"><var name="y">1</var><var name="x">2</var><answer>3</answer></var_set>
          </var_sets>
        </calculated>
      </itemproc_extension>
    </item>"#;

    #[test]
    fn test_calculated_payload() {
        let doc = Document::parse(CALCULATED).unwrap();
        let context = QuestionContext::new("calculated_question", 2.0);

        let QuestionPayload::ClozeFormula(question) = CalculatedConverter
            .convert(doc.root_element(), &context)
            .unwrap()
        else {
            panic!("expected clozeformula payload");
        };

        assert_eq!(question.stimulus, "What is {{var:val0}} + {{var:val1}}?");
        assert_eq!(question.template, "{{response}}");
        assert_eq!(
            question.validation.valid_response.unwrap().value,
            ResponseValue::MathBlanks(vec![vec![MathValue::equiv_value(
                "{{var:answer}}\\pm0.01"
            )]])
        );
    }

    #[test]
    fn test_calculated_dynamic_content() {
        let doc = Document::parse(CALCULATED).unwrap();
        let context = QuestionContext::new("calculated_question", 1.0);

        let content = CalculatedConverter
            .dynamic_content(doc.root_element(), &context)
            .unwrap()
            .unwrap();

        assert_eq!(content.cols, vec!["val0", "val1", "answer"]);
        let rows: Vec<_> = content.rows.values().cloned().collect();
        assert_eq!(
            rows,
            vec![
                DynamicRow {
                    values: vec!["5".to_string(), "3".to_string(), "8".to_string()],
                    index: 0,
                },
                DynamicRow {
                    values: vec!["2".to_string(), "1".to_string(), "3".to_string()],
                    index: 1,
                },
            ]
        );
    }

    #[test]
    fn test_uneven_variable_sets() {
        let xml = CALCULATED.replace(r#"<var name="y">1</var>"#, "");
        let doc = Document::parse(&xml).unwrap();
        let context = QuestionContext::new("calculated_question", 1.0);

        let err = CalculatedConverter
            .dynamic_content(doc.root_element(), &context)
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_answer_key");
    }

    #[test]
    fn test_missing_tolerance() {
        let xml = CALCULATED.replace("<answer_tolerance>0.01</answer_tolerance>", "");
        let doc = Document::parse(&xml).unwrap();
        let context = QuestionContext::new("calculated_question", 1.0);

        assert!(CalculatedConverter
            .convert(doc.root_element(), &context)
            .is_err());
    }
}
