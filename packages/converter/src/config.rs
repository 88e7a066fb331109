//! Configuration constants and option validation for the converter.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ConverterError, Result};

/// Maximum number of child questions attached to one stimulus item.
///
/// Authoring items with many widgets is impractical on the target platform,
/// so children beyond this limit are dropped and logged.
pub const MAX_QUESTIONS_PER_ITEM: usize = 30;

/// Point value used when a question does not declare `points_possible`.
pub const DEFAULT_POINTS: f64 = 1.0;

/// Name of the manifest at the root of the source archive.
pub const MANIFEST_PATH: &str = "imsmanifest.xml";

/// Resource type prefix for QTI 1.2 assessments.
pub const QTI_RESOURCE_PREFIX: &str = "imsqti_xmlv1p2";

/// Resource type for learning application resources (item banks, assessment metadata).
pub const LEARNING_APPLICATION_RESOURCE: &str =
    "associatedcontent/imscc_xmlv1p1/learning-application-resource";

/// Path prefix of the Canvas-flavoured assessment documents.
///
/// These carry richer question types than the plain common cartridge file and
/// take precedence when both are present.
pub const NON_CC_ASSESSMENTS_PREFIX: &str = "non_cc_assessments/";

/// Directory holding course files in the source archive.
pub const WEB_RESOURCES_DIR: &str = "web_resources";

/// Prefix that asset references are rewritten to.
pub const EXPORT_ASSET_PREFIX: &str = "___EXPORT_ROOT___/assets/";

/// Identifier of the implicit section wrapping every assessment.
pub const ROOT_SECTION_IDENT: &str = "root_section";

/// Tag key used to mark items coming from an item bank.
pub const ITEM_BANK_TAG: &str = "Item Bank";

/// Status written on every item and activity.
pub const PUBLISHED_STATUS: &str = "published";

/// Version written to the export marker document.
pub const EXPORT_FORMAT_VERSION: f64 = 2.0;

/// Placeholder tokens in question templates: `[name]`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid regex"));

/// File-base placeholders used by the two historical export formats.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub static FILEBASE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$IMS[-_]CC[-_]FILEBASE\$(.*)$").expect("valid regex"));

/// `src` and `href` attributes in rich text.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
pub static ASSET_ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(src|href)\s*=\s*("([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// How matching questions are laid out in the target format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchingLayout {
    /// One dropdown blank per left-hand row.
    #[default]
    Dropdown,
    /// Drag-and-drop association list.
    Association,
}

/// Options that influence a single conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Child questions kept per stimulus item.
    pub max_questions_per_item: usize,

    /// Layout used for matching questions.
    pub matching_layout: MatchingLayout,

    /// Points used when a question declares none.
    pub default_points: f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            max_questions_per_item: MAX_QUESTIONS_PER_ITEM,
            matching_layout: MatchingLayout::default(),
            default_points: DEFAULT_POINTS,
        }
    }
}

impl ConvertOptions {
    /// Set the child question cap.
    #[must_use]
    pub fn with_max_questions(mut self, max: usize) -> Self {
        self.max_questions_per_item = max;
        self
    }

    /// Set the matching layout.
    #[must_use]
    pub fn with_matching_layout(mut self, layout: MatchingLayout) -> Self {
        self.matching_layout = layout;
        self
    }
}

/// Validate a child question cap.
///
/// # Examples
/// ```
/// use qti_converter::config::validate_max_questions;
///
/// assert!(validate_max_questions(30).is_ok());
/// assert!(validate_max_questions(0).is_err());
/// ```
pub fn validate_max_questions(max: usize) -> Result<()> {
    if max == 0 {
        return Err(ConverterError::InvalidOption(
            "max questions per item must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Remove quote characters from an assessment title.
///
/// # Examples
/// ```
/// use qti_converter::config::sanitize_title;
///
/// assert_eq!(sanitize_title("The \"Final\" Quiz"), "The Final Quiz");
/// ```
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '"' | '\u{201C}' | '\u{201D}'))
        .collect()
}

/// Keep only characters that are safe in a file extension.
///
/// # Examples
/// ```
/// use qti_converter::config::sanitize_extension;
///
/// assert_eq!(sanitize_extension(".png"), ".png");
/// assert_eq!(sanitize_extension(".jp g"), ".jpg");
/// ```
pub fn sanitize_extension(ext: &str) -> String {
    ext.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect()
}
