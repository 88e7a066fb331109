//! XML utility functions for navigating and extracting data from QTI trees.

use roxmltree::Node;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use qti_converter::xml::get_tag_name;
///
/// let xml = r#"<questestinterop xmlns="http://www.imsglobal.org/xsd/ims_qtiasiv1p2"><item/></questestinterop>"#;
/// let doc = Document::parse(xml).unwrap();
/// let item = doc.root_element().first_element_child().unwrap();
/// assert_eq!(get_tag_name(item), "item");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check if a node is an element with a specific tag name.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && get_tag_name(node) == tag
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use qti_converter::xml::find_child;
///
/// let xml = r#"<item><presentation/><resprocessing/></item>"#;
/// let doc = Document::parse(xml).unwrap();
/// let root = doc.root_element();
///
/// assert!(find_child(root, "presentation").is_some());
/// assert!(find_child(root, "itemmetadata").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| has_tag(*child, tag))
}

/// Find all child elements with the given tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| has_tag(*child, tag))
}

/// Find all descendant elements (excluding `node` itself) with the given tag name.
pub fn find_descendants<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .filter(move |child| has_tag(*child, tag))
}

/// Find the first descendant element matching a path of tag names.
///
/// Each path segment matches a direct child of the previous segment. Unlike a
/// plain first-child walk, every branch is explored, so `presentation/material`
/// finds the material of the first `presentation` that has one.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use qti_converter::xml::find_by_path;
///
/// let xml = r#"<item><presentation><material><mattext>Q</mattext></material></presentation></item>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let mattext = find_by_path(doc.root_element(), "presentation/material/mattext");
/// assert_eq!(mattext.unwrap().text(), Some("Q"));
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    find_all_by_path(node, path).into_iter().next()
}

/// Find all descendant elements matching a path of tag names, in document order.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use qti_converter::xml::find_all_by_path;
///
/// let xml = r#"<item><presentation>
///     <response_lid ident="a"><render_choice><response_label ident="1"/><response_label ident="2"/></render_choice></response_lid>
///     <response_lid ident="b"><render_choice><response_label ident="3"/></render_choice></response_lid>
/// </presentation></item>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// let labels = find_all_by_path(doc.root_element(), "presentation/response_lid/render_choice/response_label");
/// assert_eq!(labels.len(), 3);
/// ```
pub fn find_all_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Vec<Node<'a, 'input>> {
    let mut current = vec![node];

    for part in path.split('/').filter(|p| !p.is_empty()) {
        current = current
            .into_iter()
            .flat_map(|n| n.children().filter(|c| has_tag(*c, part)))
            .collect();
        if current.is_empty() {
            break;
        }
    }

    current
}

/// Get the text content of a node, trimmed.
pub fn get_text(node: Node<'_, '_>) -> String {
    text_content(node).trim().to_string()
}

/// Concatenate all descendant text of a node, untrimmed.
///
/// QTI stores HTML in `mattext` as escaped text or CDATA, so the text content
/// is the markup itself.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Get an attribute value from a node.
pub fn get_attribute<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

/// Look up a `qtimetadatafield` entry inside a `qtimetadata` container.
///
/// # Arguments
/// * `qtimetadata` - The `<qtimetadata>` element
/// * `label` - Field label to match exactly
///
/// # Returns
/// Trimmed `fieldentry` text of the first matching field
pub fn metadata_field(qtimetadata: Node<'_, '_>, label: &str) -> Option<String> {
    find_children(qtimetadata, "qtimetadatafield")
        .find(|field| find_child(*field, "fieldlabel").is_some_and(|l| get_text(l) == label))
        .and_then(|field| find_child(field, "fieldentry"))
        .map(get_text)
}

/// Look up a metadata field of an `<item>`.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use qti_converter::xml::item_metadata_field;
///
/// let xml = r#"<item><itemmetadata><qtimetadata>
///   <qtimetadatafield><fieldlabel>question_type</fieldlabel><fieldentry>essay_question</fieldentry></qtimetadatafield>
/// </qtimetadata></itemmetadata></item>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// assert_eq!(item_metadata_field(doc.root_element(), "question_type").as_deref(), Some("essay_question"));
/// assert_eq!(item_metadata_field(doc.root_element(), "points_possible"), None);
/// ```
pub fn item_metadata_field(item: Node<'_, '_>, label: &str) -> Option<String> {
    find_all_by_path(item, "itemmetadata/qtimetadata")
        .into_iter()
        .find_map(|qtimetadata| metadata_field(qtimetadata, label))
}

/// Look up a metadata field directly under a document element such as
/// `<assessment>` or `<objectbank>`.
pub fn document_metadata_field(element: Node<'_, '_>, label: &str) -> Option<String> {
    find_children(element, "qtimetadata").find_map(|qtimetadata| metadata_field(qtimetadata, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_tag_name_with_namespace() {
        let xml = r#"<ns:root xmlns:ns="http://example.com"><ns:child/></ns:root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "root");
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<root><item>1</item><other/><item>2</item></root>"#;
        let doc = Document::parse(xml).unwrap();

        let items: Vec<_> = find_children(doc.root_element(), "item").collect();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_find_descendants_skips_self() {
        let xml = r#"<section><section ident="inner"/><item><section/></item></section>"#;
        let doc = Document::parse(xml).unwrap();

        let sections: Vec<_> = find_descendants(doc.root_element(), "section").collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].attribute("ident"), Some("inner"));
    }

    #[test]
    fn test_find_by_path_explores_all_branches() {
        let xml = r#"<root><a/><a><b>found</b></a></root>"#;
        let doc = Document::parse(xml).unwrap();

        let b = find_by_path(doc.root_element(), "a/b");
        assert_eq!(b.map(get_text), Some("found".to_string()));
        assert!(find_by_path(doc.root_element(), "a/c").is_none());
    }

    #[test]
    fn test_text_content_keeps_markup_and_cdata() {
        let xml = r#"<mattext>&lt;p&gt;Hi&lt;/p&gt;<![CDATA[ <b>there</b>]]></mattext>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(text_content(doc.root_element()), "<p>Hi</p> <b>there</b>");
    }

    #[test]
    fn test_get_text_trims() {
        let xml = r#"<fieldentry>  1.5 </fieldentry>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_text(doc.root_element()), "1.5");
    }

    #[test]
    fn test_document_metadata_field() {
        let xml = r#"<objectbank ident="b1"><qtimetadata>
            <qtimetadatafield><fieldlabel>bank_title</fieldlabel><fieldentry>Unit 1</fieldentry></qtimetadatafield>
        </qtimetadata></objectbank>"#;
        let doc = Document::parse(xml).unwrap();

        assert_eq!(
            document_metadata_field(doc.root_element(), "bank_title"),
            Some("Unit 1".to_string())
        );
    }

    #[test]
    fn test_get_attribute() {
        let xml = r#"<item ident="q1"/>"#;
        let doc = Document::parse(xml).unwrap();

        assert_eq!(get_attribute(doc.root_element(), "ident"), Some("q1"));
        assert_eq!(get_attribute(doc.root_element(), "missing"), None);
    }
}
