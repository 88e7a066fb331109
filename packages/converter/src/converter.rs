//! Main converter service that ties all components together.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use indexmap::IndexMap;
use roxmltree::Document;
use serde::Serialize;

use crate::archive::SourceArchive;
use crate::config::{validate_max_questions, ConvertOptions, MANIFEST_PATH};
use crate::error::{ConverterError, Result};
use crate::export::ExportWriter;
use crate::graph::{ConversionRun, GraphBuilder};
use crate::manifest::{document_dir, Manifest, Resource};
use crate::types::{Assessment, ErrorEntry, ErrorLog, ItemBank};
use crate::xml::has_tag;

/// Summary of one archive conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionReport {
    pub assessments: usize,
    pub item_banks: usize,
    pub items: usize,
    pub widgets: usize,
    /// Asset files copied into the export.
    pub assets: usize,
    /// Source paths of referenced files missing from the archive.
    pub missing_assets: Vec<String>,
    /// Per-item errors keyed by document identifier.
    pub errors: IndexMap<String, ErrorLog>,
}

impl ConversionReport {
    fn from_run(run: &mut ConversionRun, missing_assets: Vec<String>) -> Self {
        Self {
            assessments: run.assessments().len(),
            item_banks: run.item_banks().count(),
            items: run.items().len(),
            widgets: run.widgets().len(),
            assets: run.assets().len() - missing_assets.len(),
            missing_assets,
            errors: run.take_errors(),
        }
    }

    /// Total number of logged error entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.values().map(ErrorLog::entry_count).sum()
    }
}

/// Convert an export archive on disk into a target export archive.
///
/// # Arguments
/// * `input` - Path of the source zip archive
/// * `output` - Path the export archive is written to
/// * `options` - Conversion options
///
/// # Returns
/// A `ConversionReport` with counts and the per-item errors encountered
///
/// # Errors
/// Returns an error if the options are invalid, the archive cannot be read,
/// has no manifest, or the export cannot be written.
pub fn convert_archive(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport> {
    validate_max_questions(options.max_questions_per_item)?;

    let mut source = SourceArchive::open(input)?;
    let writer = BufWriter::new(File::create(output)?);

    let (writer, report) = convert_to_writer(&mut source, writer, options)?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    Ok(report)
}

/// Convert a source archive and write the export to `writer`.
///
/// # Errors
/// Returns an error if the archive has no manifest or reading/writing fails.
pub fn convert_to_writer<R: Read + Seek, W: Write + Seek>(
    source: &mut SourceArchive<R>,
    writer: W,
    options: &ConvertOptions,
) -> Result<(W, ConversionReport)> {
    let mut run = convert_source(source, options)?;

    let mut export = ExportWriter::new(writer);
    let missing_assets = export.write_run(&run, source)?;
    let writer = export.finish()?;

    Ok((writer, ConversionReport::from_run(&mut run, missing_assets)))
}

/// Convert every item bank and assessment listed in the archive manifest.
///
/// Item banks are converted first so assessments can reference their items.
/// A resource that fails to convert is logged and skipped; a bank lookup
/// failure aborts the run.
///
/// # Errors
/// Returns an error if the manifest is missing or the archive cannot be read.
pub fn convert_source<R: Read + Seek>(
    source: &mut SourceArchive<R>,
    options: &ConvertOptions,
) -> Result<ConversionRun> {
    let manifest_xml = source
        .read_string(MANIFEST_PATH)?
        .ok_or_else(|| ConverterError::ArchiveStructure(format!("missing {MANIFEST_PATH}")))?;
    let manifest = Manifest::parse(&manifest_xml)?;

    let builder = GraphBuilder::new(options);
    let mut run = ConversionRun::new();

    // Item banks first
    for resource in manifest.bank_candidates() {
        let Some(path) = resource.document_path() else {
            continue;
        };
        let result = read_document(source, path).and_then(|xml| {
            convert_item_bank_xml(&builder, &mut run, &xml, document_dir(path))
        });
        match result {
            Ok(Some(bank)) => {
                tracing::info!(
                    bank = %bank.ident,
                    items = bank.item_refs.len(),
                    "Converted item bank"
                );
            }
            Ok(None) => {}
            Err(err) => skip_resource(&mut run, resource, err)?,
        }
    }

    // Then assessments
    for resource in manifest.assessments() {
        let Some(path) = manifest.assessment_document(resource) else {
            tracing::warn!(resource = %resource.ident, "Assessment resource has no document");
            continue;
        };
        let result = read_document(source, path).and_then(|xml| {
            convert_assessment_xml(&builder, &mut run, &xml, document_dir(path))
        });
        match result {
            Ok(assessment) => {
                tracing::info!(
                    assessment = %assessment.ident,
                    items = assessment.item_refs().len(),
                    "Converted assessment"
                );
            }
            Err(err) => skip_resource(&mut run, resource, err)?,
        }
    }

    Ok(run)
}

/// Convert an item bank document.
///
/// # Returns
/// `None` if the document does not contain an `<objectbank>`
///
/// # Errors
/// Returns an error if the XML is malformed or the bank cannot be built.
pub fn convert_item_bank_xml(
    builder: &GraphBuilder,
    run: &mut ConversionRun,
    xml: &str,
    base_dir: &str,
) -> Result<Option<ItemBank>> {
    let doc = Document::parse(xml)?;
    let Some(objectbank) = doc.descendants().find(|n| has_tag(*n, "objectbank")) else {
        return Ok(None);
    };

    builder.build_item_bank(run, objectbank, base_dir).map(Some)
}

/// Convert an assessment document.
///
/// # Errors
/// Returns an error if the XML is malformed, has no `<assessment>` or the
/// assessment cannot be built.
pub fn convert_assessment_xml(
    builder: &GraphBuilder,
    run: &mut ConversionRun,
    xml: &str,
    base_dir: &str,
) -> Result<Assessment> {
    let doc = Document::parse(xml)?;
    let assessment = doc
        .descendants()
        .find(|n| has_tag(*n, "assessment"))
        .ok_or_else(|| ConverterError::ArchiveStructure("document has no <assessment>".into()))?;

    builder.build_assessment(run, assessment, base_dir)
}

fn read_document<R: Read + Seek>(source: &mut SourceArchive<R>, path: &str) -> Result<String> {
    source
        .read_string(path)?
        .ok_or_else(|| ConverterError::ArchiveStructure(format!("missing document {path}")))
}

/// Log a resource that could not be converted.
///
/// Fatal errors are returned instead.
fn skip_resource(run: &mut ConversionRun, resource: &Resource, err: ConverterError) -> Result<()> {
    if err.is_fatal() {
        return Err(err);
    }

    tracing::warn!(
        resource = %resource.ident,
        error = %err,
        "Skipping resource that failed to convert"
    );
    run.log_error(
        &resource.ident,
        &resource.ident,
        ErrorEntry {
            index: 0,
            error_kind: err.kind().to_string(),
            message: err.to_string(),
            question_type: None,
        },
    );
    Ok(())
}
