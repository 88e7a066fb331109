//! Conversion engine that dispatches question items to their converters.

use roxmltree::Node;

use super::config::create_question_registry;
use super::core::QuestionRegistry;
use super::handler::read_context;
use super::types::{DynamicContent, QuestionPayload};
use crate::assets::{rewrite_asset_references, AssetManifest};
use crate::config::ConvertOptions;
use crate::error::{ConverterError, Result};
use crate::types::WidgetKind;

/// Output of converting one question item.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedQuestion {
    /// Question or feature.
    pub kind: WidgetKind,

    /// Declared source question type.
    pub question_type: String,

    /// Target payload with asset references rewritten.
    pub payload: QuestionPayload,

    /// Variable table for formula questions.
    pub dynamic_content: Option<DynamicContent>,
}

/// Engine that converts question items using the registry.
///
/// The engine reads the declared type of an item, hands it to the registered
/// converter and rewrites file references in the resulting rich text. It
/// raises `UnsupportedQuestionType` for any type without a converter.
pub struct ConversionEngine {
    registry: QuestionRegistry,
    default_points: f64,
}

impl ConversionEngine {
    /// Create a new engine with the given registry.
    #[must_use]
    pub fn new(registry: QuestionRegistry, default_points: f64) -> Self {
        Self {
            registry,
            default_points,
        }
    }

    /// Create an engine with the standard type table.
    #[must_use]
    pub fn from_options(options: &ConvertOptions) -> Self {
        Self::new(create_question_registry(options), options.default_points)
    }

    /// Get a reference to the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &QuestionRegistry {
        &self.registry
    }

    /// Convert a question item.
    ///
    /// # Arguments
    /// * `item` - The `<item>` element
    /// * `base_dir` - Directory of the source document, for resolving file references
    /// * `assets` - Run-wide asset manifest
    ///
    /// # Errors
    /// Returns `UnsupportedQuestionType` for unknown types and any error raised
    /// by the converter.
    pub fn convert(
        &self,
        item: Node<'_, '_>,
        base_dir: &str,
        assets: &mut AssetManifest,
    ) -> Result<ConvertedQuestion> {
        let context = read_context(item, self.default_points);

        let converter = self
            .registry
            .get_converter(&context.question_type)
            .ok_or_else(|| ConverterError::UnsupportedQuestionType(context.question_type.clone()))?;

        let mut payload = converter.convert(item, &context)?;
        let dynamic_content = converter.dynamic_content(item, &context)?;

        for (path, text) in payload.rich_text_mut() {
            let rewritten = rewrite_asset_references(text, base_dir, assets);
            if rewritten != *text {
                tracing::debug!(field = %path, ident = ?context.ident, "Rewrote asset references");
                *text = rewritten;
            }
        }

        let kind = if self.registry.is_feature(&context.question_type) {
            WidgetKind::Feature
        } else {
            WidgetKind::Question
        };

        Ok(ConvertedQuestion {
            kind,
            question_type: context.question_type,
            payload,
            dynamic_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn item(question_type: &str, body: &str) -> String {
        format!(
            r#"<item ident="i1"><itemmetadata><qtimetadata>
              <qtimetadatafield><fieldlabel>question_type</fieldlabel><fieldentry>{question_type}</fieldentry></qtimetadatafield>
            </qtimetadata></itemmetadata>{body}</item>"#
        )
    }

    #[test]
    fn test_engine_converts_feature() {
        let engine = ConversionEngine::from_options(&ConvertOptions::default());
        let xml = item(
            "text_only_question",
            "<presentation><material><mattext>Intro</mattext></material></presentation>",
        );
        let doc = Document::parse(&xml).unwrap();
        let mut assets = AssetManifest::new();

        let converted = engine.convert(doc.root_element(), "", &mut assets).unwrap();
        assert_eq!(converted.kind, WidgetKind::Feature);
        assert_eq!(converted.question_type, "text_only_question");
        assert_eq!(converted.payload.type_tag(), "sharedpassage");
        assert!(converted.dynamic_content.is_none());
    }

    #[test]
    fn test_engine_rewrites_assets() {
        let engine = ConversionEngine::from_options(&ConvertOptions::default());
        let xml = item(
            "essay_question",
            r#"<presentation><material><mattext>&lt;img src="$IMS-CC-FILEBASE$/Uploaded Media/dog.jpg"&gt;</mattext></material></presentation>"#,
        );
        let doc = Document::parse(&xml).unwrap();
        let mut assets = AssetManifest::new();

        let converted = engine
            .convert(doc.root_element(), "quiz", &mut assets)
            .unwrap();

        let entry = assets.get("quiz/Uploaded Media/dog.jpg").unwrap();
        let text = converted.payload.asset_bearing_text();
        assert_eq!(
            text[0].1,
            format!(r#"<img src="___EXPORT_ROOT___/assets/{}">"#, entry.destination)
        );
        assert_eq!(converted.kind, WidgetKind::Question);
    }

    #[test]
    fn test_engine_unsupported_type() {
        let engine = ConversionEngine::from_options(&ConvertOptions::default());
        let xml = item("hot_spot_question", "");
        let doc = Document::parse(&xml).unwrap();
        let mut assets = AssetManifest::new();

        let err = engine
            .convert(doc.root_element(), "", &mut assets)
            .unwrap_err();
        assert!(matches!(err, ConverterError::UnsupportedQuestionType(ref t) if t == "hot_spot_question"));
    }
}
