//! Export archive layout and writing.
//!
//! ```text
//! export.json                  {"version": 2.0}
//! activities/<reference>.json
//! items/<reference>.json
//! questions/<reference>.json
//! features/<reference>.json
//! assets/<destination>
//! ```

use std::io::{Read, Seek, Write};

use serde::Serialize;
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::SourceArchive;
use crate::assets::join_path;
use crate::config::{EXPORT_FORMAT_VERSION, WEB_RESOURCES_DIR};
use crate::error::Result;
use crate::graph::ConversionRun;

/// Name of the export marker document.
pub const EXPORT_MARKER: &str = "export.json";

/// Writer for the export archive.
pub struct ExportWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ExportWriter<W> {
    /// Start a new archive.
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Write a value as a JSON document.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write_json<T: Serialize>(&mut self, path: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_bytes(path, &bytes)
    }

    /// Write raw bytes.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_bytes(&mut self, path: &str, content: &[u8]) -> Result<()> {
        self.zip.start_file(path, self.options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    /// Write everything a run produced.
    ///
    /// Asset files are copied from the source archive. A file that cannot be
    /// found is skipped with a warning.
    ///
    /// # Returns
    /// Source paths of the assets that could not be found
    ///
    /// # Errors
    /// Returns an error if reading the source or writing the export fails.
    pub fn write_run<R: Read + Seek>(
        &mut self,
        run: &ConversionRun,
        source: &mut SourceArchive<R>,
    ) -> Result<Vec<String>> {
        self.write_json(EXPORT_MARKER, &json!({ "version": EXPORT_FORMAT_VERSION }))?;

        for assessment in run.assessments() {
            self.write_json(&format!("activities/{}.json", assessment.reference), assessment)?;
        }
        for item in run.items() {
            self.write_json(&format!("items/{}.json", item.reference), item)?;
        }
        for widget in run.widgets() {
            let path = format!("{}/{}.json", widget.kind.to_dir_name(), widget.reference);
            self.write_json(&path, widget)?;
        }

        let mut missing = Vec::new();
        for (source_path, entry) in run.assets().iter() {
            let fallback = join_path(WEB_RESOURCES_DIR, &entry.relative_path);
            let content = match source.read_bytes(source_path)? {
                Some(content) => Some(content),
                None => source.read_bytes(&fallback)?,
            };

            match content {
                Some(content) => {
                    self.write_bytes(&format!("assets/{}", entry.destination), &content)?;
                }
                None => {
                    tracing::warn!(
                        source = %source_path,
                        fallback = %fallback,
                        "Missing asset, not copied to export"
                    );
                    missing.push(source_path.clone());
                }
            }
        }

        tracing::debug!(
            activities = run.assessments().len(),
            items = run.items().len(),
            widgets = run.widgets().len(),
            assets = run.assets().len() - missing.len(),
            "Wrote export"
        );

        Ok(missing)
    }

    /// Finish the archive and return the underlying writer.
    ///
    /// # Errors
    /// Returns an error if the central directory cannot be written.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::{QuestionPayload, SharedPassage};
    use crate::types::{Widget, WidgetKind, WidgetMetadata};
    use std::io::Cursor;
    use zip::ZipArchive;

    fn source(entries: &[(&str, &[u8])]) -> SourceArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        SourceArchive::new(writer.finish().unwrap()).unwrap()
    }

    fn names(bytes: Vec<u8>) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_run_layout() {
        let mut run = ConversionRun::new();
        let reference = run.build_reference(Some("f1"));
        run.push_widget(Widget {
            reference,
            kind: WidgetKind::Feature,
            data: QuestionPayload::SharedPassage(SharedPassage {
                heading: String::new(),
                content: "Intro".to_string(),
            }),
            dynamic_content_data: None,
            metadata: WidgetMetadata::default(),
        });
        let found = run.assets_mut().register("quiz/img/a.png", "img/a.png");
        let fallback = run.assets_mut().register("quiz/img/b.png", "img/b.png");
        run.assets_mut().register("quiz/img/gone.png", "img/gone.png");

        let mut source = source(&[
            ("quiz/img/a.png", &b"a"[..]),
            ("web_resources/img/b.png", &b"b"[..]),
        ]);
        let mut writer = ExportWriter::new(Cursor::new(Vec::new()));
        let missing = writer.write_run(&run, &mut source).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(missing, vec!["quiz/img/gone.png".to_string()]);
        let mut expected = vec![
            "export.json".to_string(),
            format!("features/{reference}.json"),
            format!("assets/{found}"),
            format!("assets/{fallback}"),
        ];
        expected.sort();
        assert_eq!(names(bytes), expected);
    }

    #[test]
    fn test_export_marker() {
        let run = ConversionRun::new();
        let mut source = source(&[]);
        let mut writer = ExportWriter::new(Cursor::new(Vec::new()));
        writer.write_run(&run, &mut source).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut marker = String::new();
        archive
            .by_name(EXPORT_MARKER)
            .unwrap()
            .read_to_string(&mut marker)
            .unwrap();
        assert_eq!(marker, r#"{"version":2.0}"#);
    }
}
