//! Builds items, item banks and assessments from QTI documents.
//!
//! A document is walked in two passes. The first indexes every item-like node
//! (`item`, `bankentry_item`, `section`) by the stimulus it is attached to.
//! The second converts the remaining top-level nodes in document order;
//! attached nodes are only converted together with their stimulus.

use std::collections::HashMap;

use indexmap::IndexSet;
use roxmltree::Node;
use uuid::Uuid;

use super::run::ConversionRun;
use crate::config::{
    sanitize_title, ConvertOptions, ITEM_BANK_TAG, PUBLISHED_STATUS, ROOT_SECTION_IDENT,
};
use crate::error::{ConverterError, Result};
use crate::questions::{declared_type, ConversionEngine};
use crate::types::{
    ActivityData, Assessment, Definition, ErrorEntry, Item, ItemBank, ItemMetadata, Widget,
    WidgetKind, WidgetMetadata, WidgetRef,
};
use crate::xml::{
    document_metadata_field, find_all_by_path, find_descendants, get_attribute, get_tag_name,
    get_text, item_metadata_field,
};

/// Tags of nodes that produce or reference items.
const ITEM_NODE_TAGS: [&str; 3] = ["item", "bankentry_item", "section"];

/// Error kind logged when a stimulus has more children than allowed.
const TOO_MANY_QUESTIONS: &str = "too_many_questions";

/// Bank a document belongs to.
#[derive(Debug, Clone)]
struct BankInfo {
    ident: String,
    title: String,
}

/// Per-document state of the second pass.
struct DocumentScope<'a, 'input> {
    /// Identifier the document's errors are logged under.
    ident: String,
    base_dir: String,
    bank: Option<BankInfo>,
    children: HashMap<String, Vec<Node<'a, 'input>>>,
}

impl<'a, 'input> DocumentScope<'a, 'input> {
    fn new(
        ident: &str,
        base_dir: &str,
        bank: Option<BankInfo>,
        nodes: &[Node<'a, 'input>],
    ) -> Self {
        let mut children: HashMap<String, Vec<Node<'a, 'input>>> = HashMap::new();
        for node in nodes {
            if let Some(parent) = parent_stimulus_ident(*node) {
                children.entry(parent).or_default().push(*node);
            }
        }

        Self {
            ident: ident.to_string(),
            base_dir: base_dir.to_string(),
            bank,
            children,
        }
    }

    fn children_of(&self, parent_ident: &str) -> &[Node<'a, 'input>] {
        self.children
            .get(parent_ident)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Item-like nodes below a document root, in document order.
fn collect_nodes<'a, 'input>(root: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    root.descendants()
        .skip(1)
        .filter(|n| n.is_element() && ITEM_NODE_TAGS.contains(&get_tag_name(*n)))
        .collect()
}

/// Identifier of the stimulus a node is attached to.
fn parent_stimulus_ident(node: Node<'_, '_>) -> Option<String> {
    let parent = match get_tag_name(node) {
        "bankentry_item" | "section" => {
            get_attribute(node, "parent_stimulus_item_ident").map(str::to_string)
        }
        _ => item_metadata_field(node, "parent_stimulus_item_ident"),
    };
    parent.filter(|p| !p.is_empty())
}

/// Key a node's errors are logged under.
fn error_key(node: Node<'_, '_>, index: usize) -> String {
    get_attribute(node, "ident")
        .or_else(|| get_attribute(node, "item_ref"))
        .map_or_else(|| format!("node_{index}"), str::to_string)
}

fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    get_attribute(node, name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ConverterError::missing(format!("{name} attribute"), get_tag_name(node))
        })
}

fn widget_refs(widgets: &[Widget], kind: Option<WidgetKind>) -> Vec<WidgetRef> {
    widgets
        .iter()
        .filter(|w| kind.is_none_or(|k| w.kind == k))
        .map(Widget::to_ref)
        .collect()
}

fn dedupe(refs: Vec<Uuid>) -> Vec<Uuid> {
    refs.into_iter().collect::<IndexSet<_>>().into_iter().collect()
}

/// Builder for the item/widget reference graph.
pub struct GraphBuilder {
    engine: ConversionEngine,
    max_questions_per_item: usize,
}

impl GraphBuilder {
    /// Create a builder with the standard question type table.
    #[must_use]
    pub fn new(options: &ConvertOptions) -> Self {
        Self::with_engine(
            ConversionEngine::from_options(options),
            options.max_questions_per_item,
        )
    }

    /// Create a builder around an existing engine.
    #[must_use]
    pub fn with_engine(engine: ConversionEngine, max_questions_per_item: usize) -> Self {
        Self {
            engine,
            max_questions_per_item,
        }
    }

    /// Convert an `<objectbank>` into an item bank.
    ///
    /// Every item is tagged with the bank title and linked back to the bank
    /// identifier.
    ///
    /// # Errors
    /// Returns an error if the bank has no identifier or a lookup fails.
    /// Failures of single items are logged in the run instead.
    pub fn build_item_bank(
        &self,
        run: &mut ConversionRun,
        objectbank: Node<'_, '_>,
        base_dir: &str,
    ) -> Result<ItemBank> {
        let ident = required_attribute(objectbank, "ident")?;
        let title = document_metadata_field(objectbank, "bank_title")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| ident.to_string());

        let nodes = collect_nodes(objectbank);
        let bank = BankInfo {
            ident: ident.to_string(),
            title: title.clone(),
        };
        let scope = DocumentScope::new(ident, base_dir, Some(bank), &nodes);
        let item_refs = dedupe(self.build_document(run, &nodes, &scope)?);

        tracing::debug!(bank = %ident, items = item_refs.len(), "Built item bank");

        let bank = ItemBank {
            title,
            ident: ident.to_string(),
            item_refs,
        };
        run.push_item_bank(bank.clone());
        Ok(bank)
    }

    /// Convert an `<assessment>` into an activity.
    ///
    /// # Errors
    /// Returns an error if the assessment has no identifier or a lookup fails.
    /// Failures of single items are logged in the run instead.
    pub fn build_assessment(
        &self,
        run: &mut ConversionRun,
        assessment: Node<'_, '_>,
        base_dir: &str,
    ) -> Result<Assessment> {
        let ident = required_attribute(assessment, "ident")?;
        let title = sanitize_title(get_attribute(assessment, "title").unwrap_or_default());

        let nodes = collect_nodes(assessment);
        let scope = DocumentScope::new(ident, base_dir, None, &nodes);
        let items = dedupe(self.build_document(run, &nodes, &scope)?);

        tracing::debug!(assessment = %ident, items = items.len(), "Built assessment");

        let assessment = Assessment {
            reference: run.build_reference(Some(ident)),
            title,
            status: PUBLISHED_STATUS.to_string(),
            data: ActivityData { items },
            ident: ident.to_string(),
        };
        run.push_assessment(assessment.clone());
        Ok(assessment)
    }

    /// Second pass over a document: convert top-level nodes in order.
    fn build_document(
        &self,
        run: &mut ConversionRun,
        nodes: &[Node<'_, '_>],
        scope: &DocumentScope<'_, '_>,
    ) -> Result<Vec<Uuid>> {
        let mut refs = Vec::new();

        for (index, node) in nodes.iter().enumerate() {
            if parent_stimulus_ident(*node).is_some() {
                continue;
            }
            if get_tag_name(*node) == "section"
                && get_attribute(*node, "ident") == Some(ROOT_SECTION_IDENT)
            {
                continue;
            }

            match self.build_node(run, *node, index, scope) {
                Ok(node_refs) => refs.extend(node_refs),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => log_node_error(run, scope, *node, index, &err),
            }
        }

        Ok(refs)
    }

    fn build_node(
        &self,
        run: &mut ConversionRun,
        node: Node<'_, '_>,
        index: usize,
        scope: &DocumentScope<'_, '_>,
    ) -> Result<Vec<Uuid>> {
        match get_tag_name(node) {
            "section" => Ok(section_item_refs(run, node)),
            "bankentry_item" => {
                let item_ref = required_attribute(node, "item_ref")?;
                let children = scope.children_of(item_ref);

                if children.is_empty() {
                    let reference = run.build_reference(Some(item_ref));
                    if run.item(&reference).is_none() {
                        return Err(lookup_failure(run, "item", item_ref));
                    }
                    Ok(vec![reference])
                } else {
                    self.clone_bank_item(run, item_ref, children, index, scope)
                        .map(|reference| vec![reference])
                }
            }
            _ => self.build_item(run, node, index, scope).map(|r| vec![r]),
        }
    }

    /// Convert an ordinary item and, for stimuli, its attached questions.
    fn build_item(
        &self,
        run: &mut ConversionRun,
        node: Node<'_, '_>,
        index: usize,
        scope: &DocumentScope<'_, '_>,
    ) -> Result<Uuid> {
        let ident = required_attribute(node, "ident")?;
        let converted = self.engine.convert(node, &scope.base_dir, run.assets_mut())?;

        let primary = Widget {
            reference: run.build_reference(Some(&format!("{ident}_widget"))),
            kind: converted.kind,
            data: converted.payload,
            dynamic_content_data: converted.dynamic_content,
            metadata: WidgetMetadata {
                original_item_ref: Some(ident.to_string()),
            },
        };

        // A material orientation marks a stimulus with attached questions
        let orientations: Vec<&str> = find_all_by_path(node, "presentation/material")
            .into_iter()
            .filter_map(|material| get_attribute(material, "orientation"))
            .collect();

        let children = if orientations.is_empty() {
            Vec::new()
        } else {
            let children =
                self.convert_children(run, scope.children_of(ident), ident, index, scope, false)?;
            self.limit_children(run, scope, children, ident, index)
        };

        let definition = if orientations.contains(&"left") {
            Definition::two_columns(vec![primary.to_ref()], widget_refs(&children, None))
        } else {
            let mut all = vec![primary.to_ref()];
            all.extend(widget_refs(&children, None));
            Definition::widgets(all)
        };

        let type_tag = primary.type_tag().to_string();
        let mut widgets = vec![primary];
        widgets.extend(children);

        let reference = run.build_reference(Some(ident));
        let mut item = Item {
            reference,
            title: get_attribute(node, "title").unwrap_or_default().to_string(),
            status: PUBLISHED_STATUS.to_string(),
            metadata: ItemMetadata {
                original_item_ref: ident.to_string(),
                original_item_bank_ref: scope.bank.as_ref().map(|b| b.ident.clone()),
            },
            definition,
            questions: widget_refs(&widgets, Some(WidgetKind::Question)),
            features: widget_refs(&widgets, Some(WidgetKind::Feature)),
            tags: Default::default(),
            type_tag,
        };
        if let Some(bank) = &scope.bank {
            item.add_tag(ITEM_BANK_TAG, bank.title.clone());
        }

        for widget in widgets {
            run.push_widget(widget);
        }
        run.push_item(item);

        Ok(reference)
    }

    /// Copy a bank stimulus into a new item and attach assessment-specific questions.
    ///
    /// The bank item and its widgets are never modified; the copy gets fresh
    /// references throughout.
    fn clone_bank_item(
        &self,
        run: &mut ConversionRun,
        item_ref: &str,
        children: &[Node<'_, '_>],
        index: usize,
        scope: &DocumentScope<'_, '_>,
    ) -> Result<Uuid> {
        let bank_item = run
            .item(&run.build_reference(Some(item_ref)))
            .cloned()
            .ok_or_else(|| lookup_failure(run, "item", item_ref))?;

        let Definition::Regions {
            mut regions,
            scroll,
            layout_type,
        } = bank_item.definition.clone()
        else {
            return Err(ConverterError::InvalidStimulus(item_ref.to_string()));
        };

        let empty_region = regions
            .iter()
            .position(|r| r.widgets.is_empty())
            .ok_or_else(|| ConverterError::InvalidStimulus(item_ref.to_string()))?;
        let stimulus_region = regions.iter().position(|r| !r.widgets.is_empty());

        let stimulus = run
            .widget_by_origin(item_ref)
            .map(|w| w.clone_with(run.build_reference(None), None))
            .ok_or_else(|| lookup_failure(run, "widget", item_ref))?;

        let child_widgets = self.convert_children(run, children, item_ref, index, scope, true)?;
        let child_widgets = self.limit_children(run, scope, child_widgets, item_ref, index);

        regions[empty_region].widgets = widget_refs(&child_widgets, None);
        if let Some(position) = stimulus_region {
            regions[position].widgets = vec![stimulus.to_ref()];
        }

        let mut item = bank_item.clone();
        item.reference = run.build_reference(None);
        // Point at the bank item so lookups by source identifier still find the original
        item.metadata.original_item_ref = bank_item.reference.to_string();
        item.definition = Definition::Regions {
            regions,
            scroll,
            layout_type,
        };
        item.questions = widget_refs(&child_widgets, Some(WidgetKind::Question));
        item.features = vec![stimulus.to_ref()];

        let reference = item.reference;
        run.push_widget(stimulus);
        for widget in child_widgets {
            run.push_widget(widget);
        }
        run.push_item(item);

        Ok(reference)
    }

    /// Convert the nodes attached to a stimulus into widgets.
    ///
    /// A failing child is logged and skipped; the stimulus is still built.
    fn convert_children(
        &self,
        run: &mut ConversionRun,
        children: &[Node<'_, '_>],
        parent_ident: &str,
        index: usize,
        scope: &DocumentScope<'_, '_>,
        new_references: bool,
    ) -> Result<Vec<Widget>> {
        let mut widgets = Vec::new();

        for child in children {
            match self.convert_child(run, *child, parent_ident, scope, new_references) {
                Ok(converted) => widgets.extend(converted),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => log_node_error(run, scope, *child, index, &err),
            }
        }

        Ok(widgets)
    }

    fn convert_child(
        &self,
        run: &mut ConversionRun,
        child: Node<'_, '_>,
        parent_ident: &str,
        scope: &DocumentScope<'_, '_>,
        new_references: bool,
    ) -> Result<Vec<Widget>> {
        match get_tag_name(child) {
            "section" => section_item_refs(run, child)
                .iter()
                .map(|reference| {
                    let origin = run
                        .item(reference)
                        .map(|item| item.metadata.original_item_ref.clone())
                        .unwrap_or_default();
                    run.widget_by_origin(&origin)
                        .map(|w| w.clone_with(run.build_reference(None), None))
                        .ok_or_else(|| lookup_failure(run, "widget", &origin))
                })
                .collect(),
            "bankentry_item" => {
                let item_ref = required_attribute(child, "item_ref")?;
                let name = format!("{parent_ident}_{item_ref}");
                let reference = run.build_reference((!new_references).then_some(name.as_str()));

                let widget = run
                    .widget_by_origin(item_ref)
                    .map(|w| w.clone_with(reference, Some(name.clone())))
                    .ok_or_else(|| lookup_failure(run, "widget", item_ref))?;
                Ok(vec![widget])
            }
            _ => {
                let child_ident = required_attribute(child, "ident")?;
                let converted = self.engine.convert(child, &scope.base_dir, run.assets_mut())?;
                let name = format!("{parent_ident}_{child_ident}");

                Ok(vec![Widget {
                    reference: run.build_reference((!new_references).then_some(name.as_str())),
                    kind: converted.kind,
                    data: converted.payload,
                    dynamic_content_data: converted.dynamic_content,
                    metadata: WidgetMetadata {
                        original_item_ref: Some(child_ident.to_string()),
                    },
                }])
            }
        }
    }

    /// Keep at most `max_questions_per_item` children, logging when some are dropped.
    fn limit_children(
        &self,
        run: &mut ConversionRun,
        scope: &DocumentScope<'_, '_>,
        mut children: Vec<Widget>,
        parent_ident: &str,
        index: usize,
    ) -> Vec<Widget> {
        let max = self.max_questions_per_item;
        if children.len() > max {
            tracing::warn!(
                ident = %parent_ident,
                count = children.len(),
                max,
                "Too many questions for item, dropping the rest"
            );
            children.truncate(max);
            run.log_error(
                &scope.ident,
                parent_ident,
                ErrorEntry {
                    index,
                    error_kind: TOO_MANY_QUESTIONS.to_string(),
                    message: format!(
                        "Too many questions for item, only the first {max} will be included"
                    ),
                    question_type: None,
                },
            );
        }
        children
    }
}

/// Items of the banks a section draws from.
///
/// Bank stimuli still waiting for their questions are left out.
fn section_item_refs(run: &ConversionRun, section: Node<'_, '_>) -> Vec<Uuid> {
    find_descendants(section, "sourcebank_ref")
        .map(get_text)
        .flat_map(|bank_ident| match run.item_bank(&bank_ident) {
            Some(bank) => bank
                .item_refs
                .iter()
                .filter(|r| run.item(r).is_some_and(|i| !i.definition.has_empty_region()))
                .copied()
                .collect(),
            None => {
                tracing::warn!(bank = %bank_ident, "Section references an unknown item bank");
                Vec::new()
            }
        })
        .collect()
}

/// Error for a bank reference that resolved to nothing.
///
/// Items that failed inside their bank were already logged there; only a
/// reference no bank ever produced is a lookup failure.
fn lookup_failure(run: &ConversionRun, kind: &'static str, item_ref: &str) -> ConverterError {
    if run.is_failed_bank_item(item_ref) {
        ConverterError::BankItemUnavailable(item_ref.to_string())
    } else {
        ConverterError::BankLookupFailure {
            kind,
            item_ref: item_ref.to_string(),
        }
    }
}

fn log_node_error(
    run: &mut ConversionRun,
    scope: &DocumentScope<'_, '_>,
    node: Node<'_, '_>,
    index: usize,
    err: &ConverterError,
) {
    let key = error_key(node, index);
    tracing::warn!(
        document = %scope.ident,
        ident = %key,
        error = %err,
        "Skipping item that failed to convert"
    );

    if scope.bank.is_some() {
        run.mark_failed_bank_item(key.clone());
    }

    let question_type = (get_tag_name(node) == "item")
        .then(|| declared_type(node))
        .flatten();

    run.log_error(
        &scope.ident,
        key,
        ErrorEntry {
            index,
            error_kind: err.kind().to_string(),
            message: err.to_string(),
            question_type,
        },
    );
}
