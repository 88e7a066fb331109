//! Accumulated state of one conversion.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::assets::AssetManifest;
use crate::types::{Assessment, ErrorEntry, ErrorLog, Item, ItemBank, Widget};

/// Everything produced while converting one archive.
///
/// A run owns its namespace seed: references derived from source identifiers
/// are stable inside the run and differ between runs. Items and widgets are
/// pushed at most once per reference.
#[derive(Debug, Clone)]
pub struct ConversionRun {
    namespace: Uuid,
    items: Vec<Item>,
    item_index: HashMap<Uuid, usize>,
    widgets: Vec<Widget>,
    widget_index: HashMap<Uuid, usize>,
    widget_origins: HashMap<String, usize>,
    item_banks: IndexMap<String, ItemBank>,
    assessments: Vec<Assessment>,
    assets: AssetManifest,
    errors: IndexMap<String, ErrorLog>,
    /// Bank item identifiers whose conversion failed.
    failed_bank_items: HashSet<String>,
}

impl ConversionRun {
    /// Create a run with a fresh random namespace seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_namespace(Uuid::new_v4())
    }

    /// Create a run with an explicit namespace seed.
    #[must_use]
    pub fn with_namespace(namespace: Uuid) -> Self {
        Self {
            namespace,
            items: Vec::new(),
            item_index: HashMap::new(),
            widgets: Vec::new(),
            widget_index: HashMap::new(),
            widget_origins: HashMap::new(),
            item_banks: IndexMap::new(),
            assessments: Vec::new(),
            assets: AssetManifest::new(),
            errors: IndexMap::new(),
            failed_bank_items: HashSet::new(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Uuid {
        self.namespace
    }

    /// Build a reference.
    ///
    /// Named references are UUID v5 under the run's namespace; unnamed ones are
    /// random.
    ///
    /// # Examples
    /// ```
    /// use qti_converter::graph::ConversionRun;
    ///
    /// let run = ConversionRun::new();
    /// assert_eq!(run.build_reference(Some("i1")), run.build_reference(Some("i1")));
    /// assert_ne!(run.build_reference(None), run.build_reference(None));
    ///
    /// let other = ConversionRun::new();
    /// assert_ne!(run.build_reference(Some("i1")), other.build_reference(Some("i1")));
    /// ```
    #[must_use]
    pub fn build_reference(&self, name: Option<&str>) -> Uuid {
        match name {
            Some(name) => Uuid::new_v5(&self.namespace, name.as_bytes()),
            None => Uuid::new_v4(),
        }
    }

    /// Add an item. Returns `false` if an item with the same reference exists.
    pub fn push_item(&mut self, item: Item) -> bool {
        if self.item_index.contains_key(&item.reference) {
            return false;
        }
        self.item_index.insert(item.reference, self.items.len());
        self.items.push(item);
        true
    }

    /// Add a widget. Returns `false` if a widget with the same reference exists.
    ///
    /// The first widget pushed for an origin is the one found by
    /// [`ConversionRun::widget_by_origin`].
    pub fn push_widget(&mut self, widget: Widget) -> bool {
        if self.widget_index.contains_key(&widget.reference) {
            return false;
        }
        let position = self.widgets.len();
        if let Some(origin) = widget.origin_ref() {
            self.widget_origins
                .entry(origin.to_string())
                .or_insert(position);
        }
        self.widget_index.insert(widget.reference, position);
        self.widgets.push(widget);
        true
    }

    #[must_use]
    pub fn item(&self, reference: &Uuid) -> Option<&Item> {
        self.item_index.get(reference).map(|&i| &self.items[i])
    }

    #[must_use]
    pub fn widget(&self, reference: &Uuid) -> Option<&Widget> {
        self.widget_index.get(reference).map(|&i| &self.widgets[i])
    }

    /// First widget converted from a source identifier.
    #[must_use]
    pub fn widget_by_origin(&self, origin_ref: &str) -> Option<&Widget> {
        self.widget_origins.get(origin_ref).map(|&i| &self.widgets[i])
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Widgets in insertion order.
    #[must_use]
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Record a converted item bank, replacing one with the same identifier.
    pub fn push_item_bank(&mut self, bank: ItemBank) {
        self.item_banks.insert(bank.ident.clone(), bank);
    }

    #[must_use]
    pub fn item_bank(&self, ident: &str) -> Option<&ItemBank> {
        self.item_banks.get(ident)
    }

    pub fn item_banks(&self) -> impl Iterator<Item = &ItemBank> {
        self.item_banks.values()
    }

    pub fn push_assessment(&mut self, assessment: Assessment) {
        self.assessments.push(assessment);
    }

    #[must_use]
    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    #[must_use]
    pub fn assets(&self) -> &AssetManifest {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetManifest {
        &mut self.assets
    }

    /// Log a per-item error under a document.
    pub fn log_error(&mut self, document: &str, ident: impl Into<String>, entry: ErrorEntry) {
        self.errors
            .entry(document.to_string())
            .or_default()
            .push(ident, entry);
    }

    /// Remember a bank item that could not be converted.
    pub fn mark_failed_bank_item(&mut self, ident: impl Into<String>) {
        self.failed_bank_items.insert(ident.into());
    }

    #[must_use]
    pub fn is_failed_bank_item(&self, ident: &str) -> bool {
        self.failed_bank_items.contains(ident)
    }

    /// Errors of one document.
    #[must_use]
    pub fn document_errors(&self, document: &str) -> Option<&ErrorLog> {
        self.errors.get(document)
    }

    /// Errors keyed by document identifier.
    #[must_use]
    pub fn errors(&self) -> &IndexMap<String, ErrorLog> {
        &self.errors
    }

    /// Take the errors out of the run.
    pub fn take_errors(&mut self) -> IndexMap<String, ErrorLog> {
        std::mem::take(&mut self.errors)
    }
}

impl Default for ConversionRun {
    fn default() -> Self {
        Self::new()
    }
}
