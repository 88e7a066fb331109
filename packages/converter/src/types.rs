//! Core data types for the converted object graph.
//!
//! Widgets, items and activities mirror the JSON documents written to the
//! export archive; the serde attributes define that layout.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::questions::{DynamicContent, QuestionPayload};

/// Classification of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    /// Scoreable question.
    Question,
    /// Non-scored content such as a shared passage.
    Feature,
}

impl WidgetKind {
    /// Get the string value used in export paths.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Feature => "feature",
        }
    }

    /// Directory the widget documents are written to.
    #[must_use]
    pub fn to_dir_name(&self) -> &'static str {
        match self {
            Self::Question => "questions",
            Self::Feature => "features",
        }
    }
}

/// Lookup metadata carried by a widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetMetadata {
    /// Identifier of the source fragment, used only for lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_item_ref: Option<String>,
}

/// One question or feature in the target format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    /// Stable identifier of this widget.
    pub reference: Uuid,

    /// Question or feature.
    #[serde(rename = "type")]
    pub kind: WidgetKind,

    /// Type-specific payload.
    pub data: QuestionPayload,

    /// Variable table for formula questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_content_data: Option<DynamicContent>,

    /// Back-reference to the source fragment.
    pub metadata: WidgetMetadata,
}

impl Widget {
    /// Type tag of the payload (e.g. `mcq`).
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        self.data.type_tag()
    }

    /// Identifier of the source fragment, if any.
    #[must_use]
    pub fn origin_ref(&self) -> Option<&str> {
        self.metadata.original_item_ref.as_deref()
    }

    /// Reference to this widget for use in item definitions.
    #[must_use]
    pub fn to_ref(&self) -> WidgetRef {
        WidgetRef::new(self.reference)
    }

    /// Deep copy with a new reference and origin.
    #[must_use]
    pub fn clone_with(&self, reference: Uuid, origin_ref: Option<String>) -> Self {
        let mut widget = self.clone();
        widget.reference = reference;
        if origin_ref.is_some() {
            widget.metadata.original_item_ref = origin_ref;
        }
        widget
    }
}

/// Reference to a widget inside an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetRef {
    pub reference: Uuid,
}

impl WidgetRef {
    #[must_use]
    pub fn new(reference: Uuid) -> Self {
        Self { reference }
    }
}

/// Column region in a two-column item layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub widgets: Vec<WidgetRef>,
    pub width: u8,
    #[serde(rename = "type")]
    pub region_type: String,
}

impl Region {
    /// Create a column region.
    #[must_use]
    pub fn column(widgets: Vec<WidgetRef>, width: u8) -> Self {
        Self {
            widgets,
            width,
            region_type: "column".to_string(),
        }
    }
}

/// Scroll settings of a region layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scroll {
    pub enabled: bool,
}

/// Layout of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Definition {
    /// Stimulus and child questions side by side.
    Regions {
        regions: Vec<Region>,
        scroll: Scroll,
        #[serde(rename = "type")]
        layout_type: String,
    },
    /// Flat list of widgets.
    Widgets { widgets: Vec<WidgetRef> },
}

impl Definition {
    /// Create a two-column layout: stimulus on the left, children on the right.
    #[must_use]
    pub fn two_columns(stimulus: Vec<WidgetRef>, children: Vec<WidgetRef>) -> Self {
        Self::Regions {
            regions: vec![Region::column(stimulus, 50), Region::column(children, 50)],
            scroll: Scroll { enabled: false },
            layout_type: "root".to_string(),
        }
    }

    /// Create a flat widget list.
    #[must_use]
    pub fn widgets(widgets: Vec<WidgetRef>) -> Self {
        Self::Widgets { widgets }
    }

    /// Whether this is a region layout.
    #[must_use]
    pub fn has_regions(&self) -> bool {
        matches!(self, Self::Regions { .. })
    }

    /// Whether any region is still waiting for widgets.
    ///
    /// Bank stimuli are converted without their assessment-specific children
    /// and keep one empty region.
    #[must_use]
    pub fn has_empty_region(&self) -> bool {
        match self {
            Self::Regions { regions, .. } => regions.iter().any(|r| r.widgets.is_empty()),
            Self::Widgets { .. } => false,
        }
    }

    /// All widget references in layout order.
    #[must_use]
    pub fn widget_refs(&self) -> Vec<WidgetRef> {
        match self {
            Self::Regions { regions, .. } => {
                regions.iter().flat_map(|r| r.widgets.iter().copied()).collect()
            }
            Self::Widgets { widgets } => widgets.clone(),
        }
    }
}

/// Lookup metadata carried by an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Identifier of the source item (or of the bank item a clone came from).
    pub original_item_ref: String,

    /// Identifier of the item bank the item was converted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_item_bank_ref: Option<String>,
}

/// A composed unit of one or more widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub reference: Uuid,
    pub title: String,
    pub status: String,
    pub metadata: ItemMetadata,
    pub definition: Definition,
    pub questions: Vec<WidgetRef>,
    pub features: Vec<WidgetRef>,
    pub tags: BTreeMap<String, Vec<String>>,
    /// Type tag of the primary widget.
    pub type_tag: String,
}

impl Item {
    /// Add a tag value under a key.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.entry(key.into()).or_default().push(value.into());
    }
}

/// Named collection of item references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBank {
    pub title: String,
    pub ident: String,
    pub item_refs: Vec<Uuid>,
}

/// Activity data block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityData {
    pub items: Vec<Uuid>,
}

/// A converted assessment, written as an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub reference: Uuid,
    pub title: String,
    pub status: String,
    pub data: ActivityData,
    #[serde(skip)]
    pub ident: String,
}

impl Assessment {
    /// Item references in presentation order.
    #[must_use]
    pub fn item_refs(&self) -> &[Uuid] {
        &self.data.items
    }
}

/// One logged per-item conversion problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Position of the node in the document's main pass.
    pub index: usize,
    pub error_kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
}

/// Errors keyed by source item identifier, in the order they were logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: IndexMap<String, Vec<ErrorEntry>>,
}

impl ErrorLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for a source item.
    pub fn push(&mut self, ident: impl Into<String>, entry: ErrorEntry) {
        self.entries.entry(ident.into()).or_default().push(entry);
    }

    /// Entries logged for a source item.
    #[must_use]
    pub fn get(&self, ident: &str) -> Option<&[ErrorEntry]> {
        self.entries.get(ident).map(Vec::as_slice)
    }

    /// Number of source items with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of logged entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<ErrorEntry>)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_kind_strings() {
        assert_eq!(WidgetKind::Question.as_str(), "question");
        assert_eq!(WidgetKind::Feature.to_dir_name(), "features");
        assert_eq!(
            serde_json::to_string(&WidgetKind::Feature).unwrap(),
            "\"feature\""
        );
    }

    #[test]
    fn test_two_column_definition_serialization() {
        let stimulus = WidgetRef::new(Uuid::nil());
        let definition = Definition::two_columns(vec![stimulus], Vec::new());

        let json = serde_json::to_value(&definition).unwrap();
        assert_eq!(json["type"], "root");
        assert_eq!(json["scroll"]["enabled"], false);
        assert_eq!(json["regions"][0]["width"], 50);
        assert_eq!(json["regions"][1]["type"], "column");
        assert!(definition.has_regions());
        assert!(definition.has_empty_region());
    }

    #[test]
    fn test_flat_definition() {
        let refs = vec![WidgetRef::new(Uuid::nil())];
        let definition = Definition::widgets(refs.clone());

        assert!(!definition.has_regions());
        assert!(!definition.has_empty_region());
        assert_eq!(definition.widget_refs(), refs);
    }

    #[test]
    fn test_error_log_preserves_order() {
        let mut log = ErrorLog::new();
        let entry = |index| ErrorEntry {
            index,
            error_kind: "unsupported_question".to_string(),
            message: "nope".to_string(),
            question_type: None,
        };
        log.push("b", entry(0));
        log.push("a", entry(1));
        log.push("b", entry(2));

        let keys: Vec<_> = log.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(log.get("b").map(<[ErrorEntry]>::len), Some(2));
        assert_eq!(log.entry_count(), 3);
    }

    #[test]
    fn test_item_add_tag() {
        let mut item = Item {
            reference: Uuid::nil(),
            title: String::new(),
            status: "published".to_string(),
            metadata: ItemMetadata::default(),
            definition: Definition::widgets(Vec::new()),
            questions: Vec::new(),
            features: Vec::new(),
            tags: BTreeMap::new(),
            type_tag: "mcq".to_string(),
        };
        item.add_tag("Item Bank", "Unit 1");

        assert_eq!(item.tags.get("Item Bank"), Some(&vec!["Unit 1".to_string()]));
    }
}
