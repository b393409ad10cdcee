//! Text extraction
//!
//! Two flavours: [`text`] collapses whitespace and separates block-level
//! elements with a single space, [`whole_text`] keeps source whitespace and
//! turns `<br>` into a newline.

use crate::{DomTree, NodeData, NodeId};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "canvas", "caption", "center", "col",
    "colgroup", "dd", "details", "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure",
    "footer", "form", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup",
    "hr", "html", "legend", "li", "main", "menu", "nav", "ol", "optgroup", "option", "p", "pre",
    "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "ul",
];

/// Check whether a tag is rendered as a block for text purposes
pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.iter().any(|b| b.eq_ignore_ascii_case(tag))
}

/// Collapse runs of ASCII whitespace to one space and trim the ends
pub fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_ascii_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Normalized text of a node and its descendants
pub fn text(tree: &DomTree, id: NodeId) -> String {
    let mut raw = String::new();
    collect_text(tree, id, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(tree: &DomTree, id: NodeId, out: &mut String) {
    let Some(node) = tree.get(id) else { return };
    match &node.data {
        NodeData::Text(t) => out.push_str(t),
        NodeData::Element(el) => {
            let block = is_block_tag(&el.name);
            if block || el.is("br") {
                out.push(' ');
            }
            for (child, _) in tree.children(id) {
                collect_text(tree, child, out);
            }
            if block {
                out.push(' ');
            }
        }
        NodeData::Document => {
            for (child, _) in tree.children(id) {
                collect_text(tree, child, out);
            }
        }
        NodeData::Doctype { .. } | NodeData::Comment(_) => {}
    }
}

/// Raw text of a node and its descendants, with `<br>` as `\n`
pub fn whole_text(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    if let Some(t) = tree.get(id).and_then(|n| n.as_text()) {
        out.push_str(t);
        return out;
    }
    for d in tree.descendants(id) {
        match tree.get(d).map(|n| &n.data) {
            Some(NodeData::Text(t)) => out.push_str(t),
            Some(NodeData::Element(el)) if el.is("br") => out.push('\n'),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace("   "), "");
        // nbsp is not ASCII whitespace
        assert_eq!(normalize_whitespace("a\u{a0}b"), "a\u{a0}b");
    }

    #[test]
    fn test_text_separates_blocks() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let p1 = tree.create_element("p");
        let p2 = tree.create_element("p");
        let span = tree.create_element("span");
        tree.append_child(div, p1);
        tree.append_child(div, p2);
        tree.append_text(p1, "one");
        tree.append_child(p2, span);
        tree.append_text(span, "two");
        tree.append_text(p2, "three");
        assert_eq!(text(&tree, div), "one twothree");
    }

    #[test]
    fn test_whole_text_keeps_whitespace_and_br() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        tree.append_text(p, "  a ");
        let br = tree.create_element("br");
        tree.append_child(p, br);
        tree.append_text(p, "b");
        assert_eq!(whole_text(&tree, p), "  a \nb");
        assert_eq!(text(&tree, p), "a b");
    }
}
