//! Question type table for Canvas QTI exports.

use super::core::QuestionRegistry;
use super::handlers::{
    CalculatedConverter, EssayConverter, FileUploadConverter, FillTheBlanksConverter,
    MatchingConverter, MultipleAnswersConverter, MultipleChoiceConverter,
    MultipleDropdownsConverter, NumericalConverter, ShortAnswerConverter, TextOnlyConverter,
};
use crate::config::ConvertOptions;

/// Create a question registry configured for Canvas QTI exports.
///
/// Covers the Canvas question types and the common cartridge profiles used by
/// plain cartridge exports.
#[must_use]
pub fn create_question_registry(options: &ConvertOptions) -> QuestionRegistry {
    let mut registry = QuestionRegistry::new();

    // Choice questions
    registry.register("multiple_choice_question", MultipleChoiceConverter);
    registry.register("true_false_question", MultipleChoiceConverter);
    registry.register("multiple_answers_question", MultipleAnswersConverter);

    // Text questions
    registry.register("short_answer_question", ShortAnswerConverter);
    registry.register("essay_question", EssayConverter);
    registry.register("file_upload_question", FileUploadConverter);

    // Template questions
    registry.register("fill_in_multiple_blanks_question", FillTheBlanksConverter);
    registry.register("multiple_dropdowns_question", MultipleDropdownsConverter);
    registry.register(
        "matching_question",
        MatchingConverter::new(options.matching_layout),
    );

    // Math questions
    registry.register("numerical_question", NumericalConverter);
    registry.register("calculated_question", CalculatedConverter);

    // Common cartridge profiles
    registry.register("cc.multiple_choice.v0p1", MultipleChoiceConverter);
    registry.register("cc.true_false.v0p1", MultipleChoiceConverter);
    registry.register("cc.multiple_response.v0p1", MultipleAnswersConverter);
    registry.register("cc.fib.v0p1", ShortAnswerConverter);
    registry.register("cc.essay.v0p1", EssayConverter);

    // Features: content without a response
    registry.register("text_only_question", TextOnlyConverter);
    registry.feature(["text_only_question"]);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingLayout;

    #[test]
    fn test_create_question_registry() {
        let registry = create_question_registry(&ConvertOptions::default());

        assert!(registry.has_converter("multiple_choice_question"));
        assert!(registry.has_converter("calculated_question"));
        assert!(registry.has_converter("cc.fib.v0p1"));
        assert!(!registry.has_converter("hot_spot_question"));

        assert!(registry.is_feature("text_only_question"));
        assert!(!registry.is_feature("essay_question"));
        assert_eq!(registry.registered_types().len(), 17);
    }

    #[test]
    fn test_matching_layout_option() {
        let options = ConvertOptions::default().with_matching_layout(MatchingLayout::Association);
        let registry = create_question_registry(&options);

        let converter = registry.get_converter("matching_question").unwrap();
        assert_eq!(converter.type_tag(), "association");
    }
}
