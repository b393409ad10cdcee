//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it to the arena DOM.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use snap_dom::{Attribute, Document, DomTree, NodeId};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with the URL it was loaded from
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut tree = DomTree::new();
        self.convert(&dom.document, &mut tree);
        let document = Document::from_tree(tree, url);

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Convert an RcDom tree into the arena, depth-first with an explicit stack
    fn convert(&self, document: &Handle, tree: &mut DomTree) {
        let mut stack: Vec<(Handle, NodeId)> = document
            .children
            .borrow()
            .iter()
            .rev()
            .map(|child| (child.clone(), NodeId::ROOT))
            .collect();

        while let Some((handle, parent)) = stack.pop() {
            let id = match &handle.data {
                RcNodeData::Document => None,
                RcNodeData::Doctype { name, public_id, system_id } => {
                    Some(tree.create_doctype(name, public_id, system_id))
                }
                RcNodeData::Text { contents } => Some(tree.create_text(&contents.borrow())),
                RcNodeData::Comment { contents } => Some(tree.create_comment(contents)),
                RcNodeData::Element { name, attrs, template_contents, .. } => {
                    let attrs = attrs
                        .borrow()
                        .iter()
                        .map(|a| Attribute::new(a.name.local.to_string(), a.value.to_string()))
                        .collect();
                    let id = tree.create_element_with_attrs(&name.local, attrs);
                    tree.append_child(parent, id);

                    // Template contents live in a separate fragment
                    if let Some(content) = template_contents.borrow().as_ref() {
                        for child in content.children.borrow().iter().rev() {
                            stack.push((child.clone(), id));
                        }
                    }
                    for child in handle.children.borrow().iter().rev() {
                        stack.push((child.clone(), id));
                    }
                    continue;
                }
                RcNodeData::ProcessingInstruction { .. } => None,
            };
            if let Some(id) = id {
                tree.append_child(parent, id);
            }
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}
