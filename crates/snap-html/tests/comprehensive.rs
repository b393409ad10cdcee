//! Parsing tests for snap-html
//!
//! Covers document structure, attribute handling and text preservation.

use snap_dom::{text, whole_text, Document, NodeData, NodeId};
use snap_html::{parse, HtmlParser};

fn body(doc: &Document) -> NodeId {
    let tree = doc.tree();
    tree.elements_by_tag(tree.root(), "body")[0]
}

// ============================================================================
// STRUCTURE
// ============================================================================

#[test]
fn test_parse_minimal_html() {
    let doc = parse("").unwrap();
    assert!(doc.tree().len() >= 1, "Even empty HTML should have root");
    assert!(body(&doc).is_valid());
}

#[test]
fn test_parse_text_only() {
    let doc = parse("Hello World").unwrap();
    assert_eq!(text(doc.tree(), body(&doc)), "Hello World");
}

#[test]
fn test_parse_nested_structure() {
    let html = r#"
        <html>
            <head><title>Test Page</title></head>
            <body>
                <div id="container">
                    <ul>
                        <li>Item 1</li>
                        <li>Item 2</li>
                        <li>Item 3</li>
                    </ul>
                </div>
            </body>
        </html>
    "#;

    let doc = parse(html).unwrap();
    let tree = doc.tree();
    let container = doc.get_element_by_id("container").unwrap();
    assert_eq!(tree.elements_by_tag(container, "li").len(), 3);
    assert_eq!(doc.title(), "Test Page");
}

#[test]
fn test_parse_malformed_html() {
    let html = "<div><p>Unclosed paragraph<span>Unclosed span</div>";
    let doc = parse(html).unwrap();
    let tree = doc.tree();
    assert_eq!(tree.elements_by_tag(tree.root(), "span").len(), 1);
}

#[test]
fn test_doctype_and_comments_preserved() {
    let doc = parse("<!DOCTYPE html><html><body><!-- note --></body></html>").unwrap();
    let tree = doc.tree();
    let first = tree.children(tree.root()).next().map(|(_, n)| n.data.clone());
    assert!(matches!(first, Some(NodeData::Doctype { .. })));
    let has_comment = tree
        .descendants(body(&doc))
        .any(|id| matches!(tree.get(id).map(|n| &n.data), Some(NodeData::Comment(c)) if c == " note "));
    assert!(has_comment);
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

#[test]
fn test_attribute_names_lowercased() {
    let doc = parse(r#"<input TYPE="Checkbox" Checked>"#).unwrap();
    let tree = doc.tree();
    let input = tree.elements_by_tag(tree.root(), "input")[0];
    let el = tree.element(input).unwrap();
    assert_eq!(el.attrs[0].name, "type");
    assert_eq!(el.get_attr("type"), Some("Checkbox"));
    assert_eq!(el.get_attr("checked"), Some(""));
}

#[test]
fn test_textarea_content_is_text() {
    let doc = parse("<textarea name=t>line one\nline two</textarea>").unwrap();
    let tree = doc.tree();
    let area = tree.elements_by_tag(tree.root(), "textarea")[0];
    assert_eq!(whole_text(tree, area), "line one\nline two");
}

#[test]
fn test_base_href_applied() {
    let doc = HtmlParser::new()
        .parse_with_url(
            r#"<head><base href="/sub/"></head><body><a id=l href="page.html">x</a></body>"#,
            "http://localhost:8080/index.html",
        )
        .unwrap();
    let link = doc.get_element_by_id("l").unwrap();
    assert_eq!(doc.abs_url(link, "href"), "http://localhost:8080/sub/page.html");
}

#[test]
fn test_template_contents_attached() {
    let doc = parse("<template id=t><p>inside</p></template>").unwrap();
    let tpl = doc.get_element_by_id("t").unwrap();
    assert_eq!(doc.tree().elements_by_tag(tpl, "p").len(), 1);
}
