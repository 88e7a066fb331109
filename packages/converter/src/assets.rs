//! Embedded file references in rich text.
//!
//! Question text refers to course files through a file-base placeholder
//! (`$IMS-CC-FILEBASE$/…`, or `$IMS_CC_FILEBASE$/…` in older exports). Each
//! referenced file gets a generated flat name in the export's `assets/`
//! directory, and the reference is rewritten to point there.

use std::borrow::Cow;
use std::path::Path;

use indexmap::IndexMap;
use regex::Captures;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{
    sanitize_extension, ASSET_ATTRIBUTE_PATTERN, EXPORT_ASSET_PREFIX, FILEBASE_PATTERN,
};

/// Where a source file goes in the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEntry {
    /// Generated file name inside `assets/`.
    pub destination: String,

    /// Path relative to the file base, as written in the reference.
    pub relative_path: String,
}

/// Append-only mapping from source path to export file name.
///
/// Shared by the whole run; an asset referenced by several widgets is copied
/// once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AssetManifest {
    entries: IndexMap<String, AssetEntry>,
}

impl AssetManifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source file and return its destination name.
    ///
    /// The destination is allocated on first sight and reused afterwards.
    pub fn register(&mut self, source_path: &str, relative_path: &str) -> String {
        self.entries
            .entry(source_path.to_string())
            .or_insert_with(|| {
                let extension = Path::new(source_path)
                    .extension()
                    .map(|ext| sanitize_extension(&format!(".{}", ext.to_string_lossy())))
                    .unwrap_or_default();
                let destination = format!("{}{extension}", Uuid::new_v4());
                tracing::debug!(
                    source = %source_path,
                    destination = %destination,
                    "Registered asset"
                );
                AssetEntry {
                    destination,
                    relative_path: relative_path.to_string(),
                }
            })
            .destination
            .clone()
    }

    /// Destination recorded for a source path.
    #[must_use]
    pub fn get(&self, source_path: &str) -> Option<&AssetEntry> {
        self.entries.get(source_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AssetEntry)> {
        self.entries.iter()
    }
}

/// Rewrite file-base references in `text` to export asset paths.
///
/// # Arguments
/// * `text` - Rich text (HTML) of a question field
/// * `base_dir` - Directory of the resource document inside the archive
/// * `manifest` - Run-wide asset manifest
///
/// # Returns
/// The text with every matching `src`/`href` attribute rewritten
///
/// # Examples
/// ```
/// use qti_converter::assets::{rewrite_asset_references, AssetManifest};
///
/// let mut manifest = AssetManifest::new();
/// let html = r#"<img src="$IMS-CC-FILEBASE$/Uploaded%20Media/cat.png?canvas_download=1">"#;
///
/// let rewritten = rewrite_asset_references(html, "quiz1", &mut manifest);
/// let entry = manifest.get("quiz1/Uploaded Media/cat.png").unwrap();
/// assert_eq!(rewritten, format!(r#"<img src="___EXPORT_ROOT___/assets/{}">"#, entry.destination));
/// ```
pub fn rewrite_asset_references(
    text: &str,
    base_dir: &str,
    manifest: &mut AssetManifest,
) -> String {
    ASSET_ATTRIBUTE_PATTERN
        .replace_all(text, |caps: &Captures<'_>| {
            let (value, quote) = attribute_value(caps);
            match resolve_reference(value, base_dir) {
                Some((source, relative)) => {
                    let destination = manifest.register(&source, &relative);
                    format!("{}={quote}{EXPORT_ASSET_PREFIX}{destination}{quote}", &caps[1])
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Extract the attribute value and its quote character.
fn attribute_value<'t>(caps: &Captures<'t>) -> (&'t str, char) {
    if let Some(double) = caps.get(3) {
        (double.as_str(), '"')
    } else {
        (caps.get(4).map(|m| m.as_str()).unwrap_or_default(), '\'')
    }
}

/// Turn a reference into `(source_path, relative_path)` if it points at the file base.
fn resolve_reference(value: &str, base_dir: &str) -> Option<(String, String)> {
    let decoded = urlencoding::decode(value).unwrap_or(Cow::Borrowed(value));
    let caps = FILEBASE_PATTERN.captures(&decoded)?;

    let relative = caps[1]
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string();

    if relative.is_empty() {
        return None;
    }

    Some((join_path(base_dir, &relative), relative))
}

/// Join archive paths, resolving `.` and `..` segments.
///
/// # Examples
/// ```
/// use qti_converter::assets::join_path;
///
/// assert_eq!(join_path("quiz1", "img/a.png"), "quiz1/img/a.png");
/// assert_eq!(join_path("quiz1", "../shared/a.png"), "shared/a.png");
/// assert_eq!(join_path("", "a.png"), "a.png");
/// ```
pub fn join_path(base_dir: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for segment in base_dir.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_reuses_destination() {
        let mut manifest = AssetManifest::new();
        let html = r#"<img src="$IMS-CC-FILEBASE$/a.png"><img src='$IMS_CC_FILEBASE$/a.png'>"#;

        let rewritten = rewrite_asset_references(html, "dir", &mut manifest);

        assert_eq!(manifest.len(), 1);
        let destination = &manifest.get("dir/a.png").unwrap().destination;
        assert!(destination.ends_with(".png"));
        assert_eq!(
            rewritten,
            format!(
                r#"<img src="___EXPORT_ROOT___/assets/{destination}"><img src='___EXPORT_ROOT___/assets/{destination}'>"#
            )
        );
    }

    #[test]
    fn test_rewrite_leaves_other_references() {
        let mut manifest = AssetManifest::new();
        let html = r#"<a href="https://example.com/a.pdf">link</a><img src="/local/b.png">"#;

        assert_eq!(rewrite_asset_references(html, "dir", &mut manifest), html);
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_rewrite_encoded_placeholder() {
        let mut manifest = AssetManifest::new();
        let html = r#"<a href="%24IMS-CC-FILEBASE%24/docs/notes.pdf">notes</a>"#;

        let rewritten = rewrite_asset_references(html, "", &mut manifest);
        let entry = manifest.get("docs/notes.pdf").unwrap();

        assert_eq!(entry.relative_path, "docs/notes.pdf");
        assert!(rewritten.contains(&format!("href=\"___EXPORT_ROOT___/assets/{}\"", entry.destination)));
    }

    #[test]
    fn test_extension_is_sanitized() {
        let mut manifest = AssetManifest::new();
        let destination = manifest.register("dir/file.p$ng", "file.p$ng");
        assert!(destination.ends_with(".png"));

        let no_extension = manifest.register("dir/README", "README");
        assert!(!no_extension.contains('.'));
    }

    #[test]
    fn test_join_path_strips_leading_slashes() {
        assert_eq!(join_path("a/b", "/c.png"), "a/b/c.png");
        assert_eq!(join_path("a/b", "../../../c.png"), "c.png");
    }
}
