//! Target question payloads and scoring rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::ScoredResponse;

/// How responses are compared against the answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringType {
    #[serde(rename = "exactMatch")]
    ExactMatch,
    #[serde(rename = "partialMatch")]
    PartialMatch,
    #[serde(rename = "partialMatchV2")]
    PartialMatchV2,
}

/// Rounding applied to partial scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    None,
}

/// Math answer compared by value equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathValue {
    pub method: String,
    pub value: String,
}

impl MathValue {
    /// Create an `equivValue` comparison.
    #[must_use]
    pub fn equiv_value(value: impl Into<String>) -> Self {
        Self {
            method: "equivValue".to_string(),
            value: value.into(),
        }
    }
}

/// Value of an accepted response; its shape depends on the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    /// Free text answer.
    Text(String),
    /// Option identifiers or one label per blank.
    Labels(Vec<String>),
    /// Math answers for a single response box.
    Math(Vec<MathValue>),
    /// Math answers per response box.
    MathBlanks(Vec<Vec<MathValue>>),
}

/// One accepted response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub value: ResponseValue,
}

impl ResponseSpec {
    /// Create a scored response.
    #[must_use]
    pub fn scored(value: ResponseValue, score: f64) -> Self {
        Self {
            score: Some(score),
            value,
        }
    }

    /// Create a response that carries no score of its own.
    #[must_use]
    pub fn unscored(value: ResponseValue) -> Self {
        Self { score: None, value }
    }
}

impl From<ScoredResponse> for ResponseSpec {
    fn from(response: ScoredResponse) -> Self {
        Self::scored(ResponseValue::Labels(response.value), response.score)
    }
}

/// Scoring rules of a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_type: Option<ScoringType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounding: Option<Rounding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_response: Option<ResponseSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_responses: Option<Vec<ResponseSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
}

impl Validation {
    /// Exact match against one valid response.
    #[must_use]
    pub fn exact_match(valid: ResponseSpec) -> Self {
        Self {
            scoring_type: Some(ScoringType::ExactMatch),
            valid_response: Some(valid),
            ..Self::default()
        }
    }

    /// Partial match (v2) without rounding against one valid response.
    #[must_use]
    pub fn partial_match_v2(valid: ResponseSpec) -> Self {
        Self {
            scoring_type: Some(ScoringType::PartialMatchV2),
            rounding: Some(Rounding::None),
            valid_response: Some(valid),
            ..Self::default()
        }
    }

    /// Only a maximum score, for manually graded questions.
    #[must_use]
    pub fn max_score(points: f64) -> Self {
        Self {
            max_score: Some(points),
            ..Self::default()
        }
    }

    /// Attach alternate responses.
    #[must_use]
    pub fn with_alternates(mut self, alternates: Vec<ResponseSpec>) -> Self {
        self.alt_responses = Some(alternates);
        self
    }

    /// Attach a penalty.
    #[must_use]
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = Some(penalty);
        self
    }
}

/// Choice of a multiple choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// `mcq` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceQuestion {
    pub stimulus: String,
    pub options: Vec<ChoiceOption>,
    pub multiple_responses: bool,
    pub response_id: String,
    pub validation: Validation,
}

/// `shorttext` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTextQuestion {
    pub stimulus: String,
    pub response_id: String,
    pub validation: Validation,
}

/// `clozetext` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClozeTextQuestion {
    pub stimulus: String,
    pub template: String,
    pub validation: Validation,
}

/// `clozedropdown` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClozeDropdownQuestion {
    pub stimulus: String,
    pub template: String,
    pub possible_responses: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_responses: Option<bool>,
    pub validation: Validation,
}

/// `formulaV2` and `clozeformula` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaQuestion {
    pub is_math: bool,
    pub stimulus: String,
    pub template: String,
    pub validation: Validation,
}

/// `association` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationQuestion {
    pub stimulus: String,
    pub stimulus_list: Vec<String>,
    pub possible_responses: Vec<String>,
    pub duplicate_responses: bool,
    pub validation: Validation,
}

/// `longtextV2` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTextQuestion {
    pub stimulus: String,
    pub validation: Validation,
}

/// File types accepted by a file upload question.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedFileTypes {
    pub allow_pdf: bool,
    pub allow_jpg: bool,
    pub allow_gif: bool,
    pub allow_png: bool,
    pub allow_csv: bool,
    pub allow_rtf: bool,
    pub allow_txt: bool,
    pub allow_xps: bool,
    pub allow_ms_word: bool,
    pub allow_ms_excel: bool,
    pub allow_ms_powerpoint: bool,
    pub allow_ms_publisher: bool,
    pub allow_open_office: bool,
}

impl AllowedFileTypes {
    /// Accept every supported file type.
    #[must_use]
    pub fn all() -> Self {
        Self {
            allow_pdf: true,
            allow_jpg: true,
            allow_gif: true,
            allow_png: true,
            allow_csv: true,
            allow_rtf: true,
            allow_txt: true,
            allow_xps: true,
            allow_ms_word: true,
            allow_ms_excel: true,
            allow_ms_powerpoint: true,
            allow_ms_publisher: true,
            allow_open_office: true,
        }
    }
}

/// `fileupload` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadQuestion {
    pub stimulus: String,
    pub validation: Validation,
    #[serde(flatten)]
    pub allowed: AllowedFileTypes,
}

/// `sharedpassage` feature payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPassage {
    pub heading: String,
    pub content: String,
}

/// Payload of a widget, keyed by its type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionPayload {
    #[serde(rename = "mcq")]
    MultipleChoice(ChoiceQuestion),
    #[serde(rename = "shorttext")]
    ShortText(ShortTextQuestion),
    #[serde(rename = "clozetext")]
    ClozeText(ClozeTextQuestion),
    #[serde(rename = "clozedropdown")]
    ClozeDropdown(ClozeDropdownQuestion),
    #[serde(rename = "clozeformula")]
    ClozeFormula(FormulaQuestion),
    #[serde(rename = "formulaV2")]
    Formula(FormulaQuestion),
    #[serde(rename = "association")]
    Association(AssociationQuestion),
    #[serde(rename = "longtextV2")]
    LongText(LongTextQuestion),
    #[serde(rename = "fileupload")]
    FileUpload(FileUploadQuestion),
    #[serde(rename = "sharedpassage")]
    SharedPassage(SharedPassage),
}

impl QuestionPayload {
    /// Type tag written to the `type` field.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::MultipleChoice(_) => "mcq",
            Self::ShortText(_) => "shorttext",
            Self::ClozeText(_) => "clozetext",
            Self::ClozeDropdown(_) => "clozedropdown",
            Self::ClozeFormula(_) => "clozeformula",
            Self::Formula(_) => "formulaV2",
            Self::Association(_) => "association",
            Self::LongText(_) => "longtextV2",
            Self::FileUpload(_) => "fileupload",
            Self::SharedPassage(_) => "sharedpassage",
        }
    }

    /// Scoring rules, if the payload is scored.
    #[must_use]
    pub fn validation(&self) -> Option<&Validation> {
        match self {
            Self::MultipleChoice(q) => Some(&q.validation),
            Self::ShortText(q) => Some(&q.validation),
            Self::ClozeText(q) => Some(&q.validation),
            Self::ClozeDropdown(q) => Some(&q.validation),
            Self::ClozeFormula(q) | Self::Formula(q) => Some(&q.validation),
            Self::Association(q) => Some(&q.validation),
            Self::LongText(q) => Some(&q.validation),
            Self::FileUpload(q) => Some(&q.validation),
            Self::SharedPassage(_) => None,
        }
    }

    /// Rich text fields that may reference embedded files, with their JSON paths.
    pub fn rich_text_mut(&mut self) -> Vec<(String, &mut String)> {
        match self {
            Self::MultipleChoice(q) => {
                let mut fields = vec![("stimulus".to_string(), &mut q.stimulus)];
                for (index, option) in q.options.iter_mut().enumerate() {
                    fields.push((format!("options.{index}.label"), &mut option.label));
                }
                fields
            }
            Self::ClozeText(q) => vec![("template".to_string(), &mut q.template)],
            Self::ClozeDropdown(q) => vec![
                ("stimulus".to_string(), &mut q.stimulus),
                ("template".to_string(), &mut q.template),
            ],
            Self::Association(q) => {
                let mut fields = vec![("stimulus".to_string(), &mut q.stimulus)];
                for (index, row) in q.stimulus_list.iter_mut().enumerate() {
                    fields.push((format!("stimulus_list.{index}"), row));
                }
                fields
            }
            Self::ShortText(q) => vec![("stimulus".to_string(), &mut q.stimulus)],
            Self::ClozeFormula(q) | Self::Formula(q) => {
                vec![("stimulus".to_string(), &mut q.stimulus)]
            }
            Self::LongText(q) => vec![("stimulus".to_string(), &mut q.stimulus)],
            Self::FileUpload(q) => vec![("stimulus".to_string(), &mut q.stimulus)],
            Self::SharedPassage(p) => vec![("content".to_string(), &mut p.content)],
        }
    }

    /// Rich text fields that may reference embedded files, as `(json_path, text)`.
    #[must_use]
    pub fn asset_bearing_text(&self) -> Vec<(String, String)> {
        let mut copy = self.clone();
        copy.rich_text_mut()
            .into_iter()
            .map(|(path, text)| (path, text.clone()))
            .collect()
    }
}

/// Context passed to question converters.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionContext {
    /// Identifier of the source item, if it has one.
    pub ident: Option<String>,

    /// Declared source question type.
    pub question_type: String,

    /// Points the question is worth.
    pub points: f64,
}

impl QuestionContext {
    /// Create a context for a question worth `points`.
    #[must_use]
    pub fn new(question_type: impl Into<String>, points: f64) -> Self {
        Self {
            ident: None,
            question_type: question_type.into(),
            points,
        }
    }

    /// Set the source item identifier.
    #[must_use]
    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }
}

/// One row of a dynamic content table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRow {
    pub values: Vec<String>,
    pub index: usize,
}

/// Variable table for formula questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicContent {
    pub cols: Vec<String>,
    pub rows: IndexMap<Uuid, DynamicRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice() -> QuestionPayload {
        QuestionPayload::MultipleChoice(ChoiceQuestion {
            stimulus: "<p>Pick</p>".to_string(),
            options: vec![
                ChoiceOption {
                    value: "1".to_string(),
                    label: "One".to_string(),
                },
                ChoiceOption {
                    value: "2".to_string(),
                    label: "Two".to_string(),
                },
            ],
            multiple_responses: false,
            response_id: "response1".to_string(),
            validation: Validation::exact_match(ResponseSpec::scored(
                ResponseValue::Labels(vec!["1".to_string()]),
                1.0,
            )),
        })
    }

    #[test]
    fn test_payload_is_tagged_by_type() {
        let json = serde_json::to_value(choice()).unwrap();

        assert_eq!(json["type"], "mcq");
        assert_eq!(json["validation"]["scoring_type"], "exactMatch");
        assert_eq!(json["validation"]["valid_response"]["value"][0], "1");
        assert!(json["validation"].get("alt_responses").is_none());
    }

    #[test]
    fn test_asset_bearing_text_paths() {
        let paths: Vec<_> = choice()
            .asset_bearing_text()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["stimulus", "options.0.label", "options.1.label"]);
    }

    #[test]
    fn test_file_upload_flags_are_flattened() {
        let payload = QuestionPayload::FileUpload(FileUploadQuestion {
            stimulus: String::new(),
            validation: Validation::max_score(2.0),
            allowed: AllowedFileTypes::all(),
        });
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["type"], "fileupload");
        assert_eq!(json["allow_pdf"], true);
        assert_eq!(json["validation"]["max_score"], 2.0);
        assert!(json["validation"].get("scoring_type").is_none());
    }

    #[test]
    fn test_rounding_serialization() {
        let validation = Validation::partial_match_v2(ResponseSpec::scored(
            ResponseValue::Labels(Vec::new()),
            1.0,
        ));
        let json = serde_json::to_value(&validation).unwrap();
        assert_eq!(json["rounding"], "none");
        assert_eq!(json["scoring_type"], "partialMatchV2");
    }

    #[test]
    fn test_shared_passage_has_no_validation() {
        let payload = QuestionPayload::SharedPassage(SharedPassage {
            heading: String::new(),
            content: "Read this".to_string(),
        });
        assert!(payload.validation().is_none());
        assert_eq!(payload.type_tag(), "sharedpassage");
    }
}
