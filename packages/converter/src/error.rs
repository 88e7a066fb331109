//! Error types for the converter.
//!
//! Uses the dual-error pattern: `ConverterError` for library consumers with
//! detailed error context. Errors raised while converting a single question are
//! recovered by the graph builder and recorded in the run's error log; only
//! structural failures propagate out of a conversion.

use thiserror::Error;

/// Main error type for the converter library.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The declared question type has no registered converter.
    #[error("Unsupported question type: '{0}'")]
    UnsupportedQuestionType(String),

    /// A response condition, equality or range element the converter needs is absent.
    #[error("Malformed answer key for {question_type}: {message}")]
    MalformedAnswerKey {
        question_type: String,
        message: String,
    },

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// A bank stimulus cannot host child questions.
    #[error("Invalid stimulus item {0}: bank item was not converted with regions")]
    InvalidStimulus(String),

    /// A bank item or widget referenced from an assessment was never converted.
    #[error("Could not find converted {kind} for item_ref {item_ref}")]
    BankLookupFailure { kind: &'static str, item_ref: String },

    /// A referenced bank item exists in its bank but failed to convert.
    #[error("Bank item {0} is unavailable: it failed to convert")]
    BankItemUnavailable(String),

    /// The archive or one of its documents lacks a required structure.
    #[error("Invalid archive structure: {0}")]
    ArchiveStructure(String),

    /// Invalid CLI or library option.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Zip archive error.
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Build a `MalformedAnswerKey` error.
    pub fn malformed(question_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedAnswerKey {
            question_type: question_type.into(),
            message: message.into(),
        }
    }

    /// Build a `MissingElement` error.
    pub fn missing(element: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
            context: context.into(),
        }
    }

    /// Stable error type used as `error_type` in the error log.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedQuestionType(_) => "unsupported_question",
            Self::MalformedAnswerKey { .. } => "malformed_answer_key",
            Self::MissingElement { .. } => "missing_element",
            Self::InvalidStimulus(_) => "invalid_stimulus",
            Self::BankLookupFailure { .. } => "bank_lookup_failure",
            Self::BankItemUnavailable(_) => "bank_item_unavailable",
            Self::ArchiveStructure(_) => "archive_structure",
            Self::InvalidOption(_) => "invalid_option",
            Self::XmlParse(_) => "xml_parse",
            Self::Zip(_) => "zip",
            Self::Json(_) => "json",
            Self::Io(_) => "io",
        }
    }

    /// Whether this error must abort the whole run instead of being logged.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BankLookupFailure { .. } | Self::Zip(_) | Self::Io(_)
        )
    }
}

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, ConverterError>;
