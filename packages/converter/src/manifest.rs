//! Course package manifest (`imsmanifest.xml`) parsing.
//!
//! The manifest lists every resource of the export:
//! - assessments (`imsqti_xmlv1p2/...`)
//! - learning application resources, some of which are item banks
//! - course files referenced from question text

use indexmap::IndexMap;
use roxmltree::Document;

use crate::config::{LEARNING_APPLICATION_RESOURCE, NON_CC_ASSESSMENTS_PREFIX, QTI_RESOURCE_PREFIX};
use crate::error::Result;
use crate::xml::{find_children, find_descendants, get_attribute};

/// One `<resource>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub ident: String,
    pub resource_type: String,
    pub href: Option<String>,
    /// `href` of every `<file>` child, in document order.
    pub files: Vec<String>,
    /// Identifiers of the resources this one depends on.
    pub dependencies: Vec<String>,
}

impl Resource {
    /// Whether this resource is a QTI assessment.
    #[must_use]
    pub fn is_assessment(&self) -> bool {
        self.resource_type.starts_with(QTI_RESOURCE_PREFIX)
    }

    /// Whether this resource may hold an item bank.
    ///
    /// Only the document itself tells whether it is one (`<objectbank>` root).
    #[must_use]
    pub fn is_learning_application(&self) -> bool {
        self.resource_type == LEARNING_APPLICATION_RESOURCE
    }

    /// Path of the resource's own document.
    #[must_use]
    pub fn document_path(&self) -> Option<&str> {
        self.href
            .as_deref()
            .or_else(|| self.files.first().map(String::as_str))
    }
}

/// Parsed manifest, resources keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    resources: IndexMap<String, Resource>,
}

impl Manifest {
    /// Parse manifest XML.
    ///
    /// # Errors
    /// Returns an error if the XML is not well-formed.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        Ok(Self::from_document(&doc))
    }

    /// Extract resources from a parsed manifest.
    ///
    /// Resources without an identifier are ignored.
    pub fn from_document(doc: &Document<'_>) -> Self {
        let mut resources = IndexMap::new();

        for node in find_descendants(doc.root_element(), "resource") {
            let Some(ident) = get_attribute(node, "identifier").filter(|i| !i.is_empty()) else {
                tracing::debug!("Skipping manifest resource without identifier");
                continue;
            };

            let resource = Resource {
                ident: ident.to_string(),
                resource_type: get_attribute(node, "type").unwrap_or_default().to_string(),
                href: get_attribute(node, "href").map(str::to_string),
                files: find_children(node, "file")
                    .filter_map(|f| get_attribute(f, "href"))
                    .map(str::to_string)
                    .collect(),
                dependencies: find_children(node, "dependency")
                    .filter_map(|d| get_attribute(d, "identifierref"))
                    .map(str::to_string)
                    .collect(),
            };
            resources.insert(resource.ident.clone(), resource);
        }

        Self { resources }
    }

    #[must_use]
    pub fn resource(&self, ident: &str) -> Option<&Resource> {
        self.resources.get(ident)
    }

    /// All resources in manifest order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Assessment resources in manifest order.
    pub fn assessments(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(|r| r.is_assessment())
    }

    /// Learning application resources, the candidates for item banks.
    pub fn bank_candidates(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(|r| r.is_learning_application())
    }

    /// Document to convert for an assessment resource.
    ///
    /// A dependency file under `non_cc_assessments/` wins over the resource's
    /// own document.
    #[must_use]
    pub fn assessment_document<'a>(&'a self, resource: &'a Resource) -> Option<&'a str> {
        resource
            .dependencies
            .iter()
            .filter_map(|dep| self.resource(dep))
            .flat_map(|dep| dep.href.iter().chain(dep.files.iter()))
            .find(|path| path.starts_with(NON_CC_ASSESSMENTS_PREFIX))
            .map(String::as_str)
            .or_else(|| resource.document_path())
    }
}

/// Directory part of an archive path, without trailing slash.
///
/// # Examples
/// ```
/// use qti_converter::manifest::document_dir;
///
/// assert_eq!(document_dir("g1/assessment_qti.xml"), "g1");
/// assert_eq!(document_dir("non_cc_assessments/g1.xml.qti"), "non_cc_assessments");
/// assert_eq!(document_dir("top.xml"), "");
/// ```
#[must_use]
pub fn document_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest identifier="m1" xmlns="http://www.imsglobal.org/xsd/imsccv1p1/imscp_v1p1">
  <resources>
    <resource identifier="quiz1" type="imsqti_xmlv1p2/imscc_xmlv1p1/assessment">
      <file href="quiz1/assessment_qti.xml"/>
      <dependency identifierref="quiz1_meta"/>
    </resource>
    <resource identifier="quiz1_meta" type="associatedcontent/imscc_xmlv1p1/learning-application-resource" href="quiz1/assessment_meta.xml">
      <file href="quiz1/assessment_meta.xml"/>
      <file href="non_cc_assessments/quiz1.xml.qti"/>
    </resource>
    <resource identifier="bank1" type="associatedcontent/imscc_xmlv1p1/learning-application-resource" href="bank1/assessment_qti.xml">
      <file href="bank1/assessment_qti.xml"/>
    </resource>
    <resource identifier="file1" type="webcontent" href="web_resources/dog.jpg"/>
    <resource type="webcontent" href="orphan.txt"/>
  </resources>
</manifest>"#;

    #[test]
    fn test_parse_resources() {
        let manifest = Manifest::parse(MANIFEST).unwrap();

        let idents: Vec<_> = manifest.resources().map(|r| r.ident.as_str()).collect();
        assert_eq!(idents, vec!["quiz1", "quiz1_meta", "bank1", "file1"]);

        let quiz = manifest.resource("quiz1").unwrap();
        assert_eq!(quiz.files, vec!["quiz1/assessment_qti.xml"]);
        assert_eq!(quiz.dependencies, vec!["quiz1_meta"]);
        assert_eq!(quiz.href, None);
    }

    #[test]
    fn test_classify_resources() {
        let manifest = Manifest::parse(MANIFEST).unwrap();

        let assessments: Vec<_> = manifest.assessments().map(|r| r.ident.as_str()).collect();
        assert_eq!(assessments, vec!["quiz1"]);

        let banks: Vec<_> = manifest.bank_candidates().map(|r| r.ident.as_str()).collect();
        assert_eq!(banks, vec!["quiz1_meta", "bank1"]);
    }

    #[test]
    fn test_non_cc_document_takes_precedence() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let quiz = manifest.resource("quiz1").unwrap();

        assert_eq!(
            manifest.assessment_document(quiz),
            Some("non_cc_assessments/quiz1.xml.qti")
        );
    }

    #[test]
    fn test_assessment_document_falls_back_to_own_file() {
        let xml = r#"<manifest><resources>
            <resource identifier="q" type="imsqti_xmlv1p2/imscc_xmlv1p1/assessment">
              <file href="q/assessment_qti.xml"/>
            </resource>
        </resources></manifest>"#;
        let manifest = Manifest::parse(xml).unwrap();
        let quiz = manifest.resource("q").unwrap();

        assert_eq!(manifest.assessment_document(quiz), Some("q/assessment_qti.xml"));
    }
}
