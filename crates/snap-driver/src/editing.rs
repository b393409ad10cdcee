//! Text entry and clearing
//!
//! Edits write the live value into the `value` attribute. The first edit of
//! an input or textarea also records the authored value under
//! [`ORIGINAL_VALUE_ATTR`] so attribute reads can still report it.

use snap_dom::{Document, DomTree, NodeId};

use crate::attributes::rendered_text;
use crate::DriverError;

/// Marker attribute holding the pre-edit value; equal to its own name when
/// the element had no `value` attribute
pub const ORIGINAL_VALUE_ATTR: &str = "__snapdriver_original_value";

/// Special key sequences understood by `send_keys`
pub struct Keys;

impl Keys {
    pub const ENTER: &'static str = "\u{e007}";
    pub const RETURN: &'static str = "\u{e006}";
}

/// What a `send_keys` call asks the caller to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Done,
    /// Enter was pressed inside this form
    Submit(NodeId),
}

/// Current value of a form control
pub(crate) fn live_value(tree: &DomTree, node: NodeId) -> String {
    let Some(el) = tree.element(node) else {
        return String::new();
    };
    match el.get_attr("value") {
        Some(value) => value.to_string(),
        None if el.is("textarea") => rendered_text(tree, node),
        None => String::new(),
    }
}

fn is_lone_enter(keys: &str) -> bool {
    keys == "\n" || keys == Keys::ENTER
}

pub(crate) fn is_content_editable(tree: &DomTree, node: NodeId) -> bool {
    tree.element(node)
        .and_then(|e| e.get_attr("contenteditable"))
        .is_some_and(|v| v == "true")
}

/// Type `keys` into an element
pub fn send_keys(doc: &mut Document, node: NodeId, keys: &str) -> Result<EditOutcome, DriverError> {
    if keys.is_empty() {
        return Ok(EditOutcome::Done);
    }
    let tree = doc.tree_mut();
    let Some(el) = tree.element(node) else {
        return Ok(EditOutcome::Done);
    };
    if el.has_attr("disabled") {
        return Err(DriverError::InvalidState("Element is disabled.".into()));
    }

    if is_lone_enter(keys) {
        if let Some(form) = tree.closest(node, "form") {
            return Ok(EditOutcome::Submit(form));
        }
    }

    if el.is("textarea") || el.is("input") {
        let current = live_value(tree, node);
        let original = el.get_attr("value").unwrap_or(ORIGINAL_VALUE_ATTR).to_string();
        if let Some(el) = tree.element_mut(node) {
            if !el.has_attr(ORIGINAL_VALUE_ATTR) {
                el.set_attr(ORIGINAL_VALUE_ATTR, original);
            }
            el.set_attr("value", current + keys);
        }
    } else if is_content_editable(tree, node) {
        tree.append_text(node, keys);
    }

    Ok(EditOutcome::Done)
}

/// Reset an element's value
pub fn clear(doc: &mut Document, node: NodeId) -> Result<(), DriverError> {
    let tree = doc.tree_mut();
    let Some(el) = tree.element(node) else {
        return Ok(());
    };
    if el.has_attr("disabled") {
        return Err(DriverError::InvalidState("Element is disabled.".into()));
    }
    if el.has_attr("readonly") {
        return Err(DriverError::InvalidState("Element is read only.".into()));
    }

    if el.is("textarea") {
        let has_value = el.has_attr("value");
        tree.set_text(node, "");
        if has_value {
            set_value(tree, node, String::new());
        }
    } else if el.is("input") {
        let value = match el.attr_or_empty("type").to_ascii_lowercase().as_str() {
            "color" => "#000000".to_string(),
            "range" => range_midpoint(el.get_attr("min"), el.get_attr("max")),
            _ => String::new(),
        };
        set_value(tree, node, value);
    } else if is_content_editable(tree, node) {
        tree.set_text(node, "");
    } else {
        set_value(tree, node, String::new());
    }
    Ok(())
}

fn set_value(tree: &mut DomTree, node: NodeId, value: String) {
    if let Some(el) = tree.element_mut(node) {
        el.set_attr("value", value);
    }
}

/// Cleared value of a range input.
///
/// A missing `max` means 100 but an unparsable one means 0.
fn range_midpoint(min: Option<&str>, max: Option<&str>) -> String {
    let min = min.and_then(|m| m.trim().parse::<f64>().ok()).unwrap_or(0.0);
    let max = match max {
        None => 100.0,
        Some(m) => m.trim().parse::<f64>().unwrap_or(0.0),
    };
    let value = (max + min) / 2.0 + min;
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
