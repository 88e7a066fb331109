//! Converters for free-text questions and text-only content.

use roxmltree::Node;

use crate::error::{ConverterError, Result};
use crate::questions::handler::{final_conditions, stimulus, QuestionConverter};
use crate::questions::types::{
    AllowedFileTypes, FileUploadQuestion, LongTextQuestion, QuestionContext, QuestionPayload,
    ResponseSpec, ResponseValue, SharedPassage, ShortTextQuestion, Validation,
};
use crate::xml::{find_by_path, find_descendants, get_attribute, get_text};

/// Converter for `short_answer_question`.
///
/// The first accepted text is the valid response; the others are alternates
/// worth the same score.
pub struct ShortAnswerConverter;

impl QuestionConverter for ShortAnswerConverter {
    fn type_tag(&self) -> &'static str {
        "shorttext"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        let response = find_by_path(node, "presentation/response_str").ok_or_else(|| {
            ConverterError::missing(
                "response_str",
                context.ident.clone().unwrap_or_else(|| "item".to_string()),
            )
        })?;

        Ok(QuestionPayload::ShortText(ShortTextQuestion {
            stimulus: stimulus(node),
            response_id: get_attribute(response, "ident")
                .unwrap_or_default()
                .to_string(),
            validation: self.answer_key(node, context)?.unwrap_or_default(),
        }))
    }

    fn answer_key(
        &self,
        node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        let mut accepted = final_conditions(node)
            .into_iter()
            .next()
            .map(|condition| {
                find_descendants(condition, "varequal")
                    .map(get_text)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
            .into_iter();

        let primary = accepted.next().ok_or_else(|| {
            ConverterError::malformed(&context.question_type, "no accepted answer")
        })?;
        let alternates = accepted
            .map(|text| ResponseSpec::scored(ResponseValue::Text(text), context.points))
            .collect();

        Ok(Some(
            Validation::exact_match(ResponseSpec::scored(
                ResponseValue::Text(primary),
                context.points,
            ))
            .with_alternates(alternates),
        ))
    }
}

/// Converter for `essay_question`.
pub struct EssayConverter;

impl QuestionConverter for EssayConverter {
    fn type_tag(&self) -> &'static str {
        "longtextV2"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        Ok(QuestionPayload::LongText(LongTextQuestion {
            stimulus: stimulus(node),
            validation: self.answer_key(node, context)?.unwrap_or_default(),
        }))
    }

    fn answer_key(
        &self,
        _node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        Ok(Some(Validation::max_score(context.points)))
    }
}

/// Converter for `file_upload_question`. Every file type is accepted.
pub struct FileUploadConverter;

impl QuestionConverter for FileUploadConverter {
    fn type_tag(&self) -> &'static str {
        "fileupload"
    }

    fn convert(&self, node: Node<'_, '_>, context: &QuestionContext) -> Result<QuestionPayload> {
        Ok(QuestionPayload::FileUpload(FileUploadQuestion {
            stimulus: stimulus(node),
            validation: self.answer_key(node, context)?.unwrap_or_default(),
            allowed: AllowedFileTypes::all(),
        }))
    }

    fn answer_key(
        &self,
        _node: Node<'_, '_>,
        context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        Ok(Some(Validation::max_score(context.points)))
    }
}

/// Converter for `text_only_question`, which becomes a shared passage feature.
pub struct TextOnlyConverter;

impl QuestionConverter for TextOnlyConverter {
    fn type_tag(&self) -> &'static str {
        "sharedpassage"
    }

    fn convert(&self, node: Node<'_, '_>, _context: &QuestionContext) -> Result<QuestionPayload> {
        Ok(QuestionPayload::SharedPassage(SharedPassage {
            heading: String::new(),
            content: stimulus(node),
        }))
    }

    fn answer_key(
        &self,
        _node: Node<'_, '_>,
        _context: &QuestionContext,
    ) -> Result<Option<Validation>> {
        Ok(None)
    }
}
