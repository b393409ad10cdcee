//! Attribute and property reads
//!
//! Three views of an element's data:
//!
//! - [`dom_property`]: the live, computed value (edited input values,
//!   resolved URLs, derived indices, boolean flags as `"true"`/`"false"`)
//! - [`dom_attribute`]: the authored markup value, reconstructed from the
//!   original-value marker once an input has been edited
//! - [`attribute`]: the merged legacy view that picks one of the two per name

use snap_dom::{Document, DomTree, NodeId};

use crate::editing::{live_value, ORIGINAL_VALUE_ATTR};

/// Attribute names reported as booleans
pub const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "async", "autofocus", "autoplay", "checked", "compact", "complete", "controls", "declare",
    "defaultchecked", "defaultselected", "defer", "disabled", "draggable", "ended", "formnovalidate",
    "hidden", "indeterminate", "iscontenteditable", "ismap", "itemscope", "loop", "multiple", "muted",
    "nohref", "noresize", "noshade", "novalidate", "nowrap", "open", "paused", "pubdate", "readonly",
    "required", "reversed", "scoped", "seamless", "seeking", "selected", "truespeed", "willvalidate",
];

fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES.contains(&name)
}

/// Text as a user would read it off the page
pub(crate) fn rendered_text(tree: &DomTree, node: NodeId) -> String {
    let whole = snap_dom::whole_text(tree, node);
    if tree.is_element_named(node, "pre") {
        return whole;
    }
    whole
        .trim_matches(|c: char| c <= ' ')
        .replace('\u{a0}', " ")
        .replace('\u{200e}', "")
}

/// Live DOM property
pub fn dom_property(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    let tree = doc.tree();
    let el = tree.element(node)?;
    let attr_or_empty = |key: &str| Some(el.attr_or_empty(key).to_string());

    match name {
        "class" | "colspan" => None,
        "className" => attr_or_empty("class"),
        "classList" => Some(format!("[{}]", el.class_names().collect::<Vec<_>>().join(", "))),
        "colSpan" => attr_or_empty("colspan"),
        "index" => {
            if !el.is("option") {
                return attr_or_empty(name);
            }
            let select = tree.closest(node, "select")?;
            let position = tree
                .elements_by_tag(select, "option")
                .iter()
                .position(|o| *o == node)?;
            Some(position.to_string())
        }
        "innerHTML" => Some(snap_dom::inner_html(tree, node)),
        "innerText" | "textContent" => Some(snap_dom::text(tree, node)),
        "href" => Some(doc.abs_url(node, "href")),
        "selectedIndex" => {
            if !el.is("select") {
                return attr_or_empty(name);
            }
            let index = tree
                .elements_by_tag(node, "option")
                .iter()
                .position(|o| tree.element(*o).is_some_and(|e| e.has_attr("selected")))
                .map_or(-1, |i| i as i64);
            Some(index.to_string())
        }
        "src" => el.has_attr("src").then(|| doc.abs_url(node, "src")),
        "value" => {
            if el.is("textarea") || el.is("option") {
                match el.get_attr("value") {
                    Some(value) => Some(value.to_string()),
                    None => Some(rendered_text(tree, node)),
                }
            } else if el.is("input") {
                Some(live_value(tree, node))
            } else {
                attr_or_empty(name)
            }
        }
        _ if is_boolean_attribute(&name.to_ascii_lowercase()) => {
            Some(el.has_attr(&name.to_ascii_lowercase()).to_string())
        }
        _ => el.get_attr(name).map(str::to_string),
    }
}

/// Authored attribute value
pub fn dom_attribute(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    let tree = doc.tree();
    let el = tree.element(node)?;

    if name == "value" && el.is("input") {
        if let Some(original) = el.get_attr(ORIGINAL_VALUE_ATTR) {
            return (original != ORIGINAL_VALUE_ATTR).then(|| original.to_string());
        }
        let value = live_value(tree, node);
        return (!value.is_empty()).then_some(value);
    }
    if name == "selected" && el.is("input") {
        return el.has_attr("checked").then(|| "true".to_string());
    }
    let lower = name.to_ascii_lowercase();
    if is_boolean_attribute(&lower) {
        return el.has_attr(&lower).then(|| "true".to_string());
    }

    el.get_attr(name).map(str::to_string)
}

/// Merged attribute view
pub fn attribute(doc: &Document, node: NodeId, name: &str) -> Option<String> {
    if matches!(name, "href" | "src" | "value") {
        return dom_property(doc, node, name);
    }
    if is_boolean_attribute(&name.to_ascii_lowercase()) {
        return dom_attribute(doc, node, name);
    }
    dom_attribute(doc, node, name).or_else(|| dom_property(doc, node, name))
}
