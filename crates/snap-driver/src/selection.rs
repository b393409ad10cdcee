//! Selection state for options, radios and checkboxes

use snap_dom::{DomTree, NodeId};

use crate::DriverError;

fn has_attr(tree: &DomTree, node: NodeId, name: &str) -> bool {
    tree.element(node).is_some_and(|e| e.has_attr(name))
}

fn set_flag(tree: &mut DomTree, node: NodeId, name: &str, on: bool) {
    if let Some(el) = tree.element_mut(node) {
        if on {
            el.set_attr(name, "");
        } else {
            el.remove_attr(name);
        }
    }
}

/// Selection state of an input or option.
///
/// An option with no selected sibling counts as selected when it is the
/// first option of its select.
pub fn is_selected(tree: &DomTree, node: NodeId) -> Result<bool, DriverError> {
    let Some(el) = tree.element(node) else {
        return Err(DriverError::UnsupportedOperation("Unsupported node type".into()));
    };

    if el.is("input") {
        return Ok(el.has_attr("checked"));
    }
    if el.is("option") {
        if el.has_attr("selected") {
            return Ok(true);
        }
        let Some(select) = tree.closest(node, "select") else {
            return Ok(false);
        };
        let options = tree.elements_by_tag(select, "option");
        if options.first() != Some(&node) {
            return Ok(false);
        }
        return Ok(!options.iter().any(|o| has_attr(tree, *o, "selected")));
    }

    Err(DriverError::UnsupportedOperation(format!("Unsupported element type: {}", el.name)))
}

/// Click on an option: toggle in a multi-select, otherwise select exclusively
pub fn click_option(tree: &mut DomTree, node: NodeId) {
    let Some(select) = tree.closest(node, "select") else {
        return;
    };

    if has_attr(tree, select, "multiple") {
        let selected = has_attr(tree, node, "selected");
        set_flag(tree, node, "selected", !selected);
        return;
    }

    for option in tree.elements_by_tag(select, "option") {
        set_flag(tree, option, "selected", false);
    }
    set_flag(tree, node, "selected", true);
}

/// Check a radio and uncheck every other radio in its form
pub fn check_radio(tree: &mut DomTree, node: NodeId) {
    if let Some(form) = tree.closest(node, "form") {
        let radios: Vec<NodeId> = tree
            .elements_by_tag(form, "input")
            .into_iter()
            .filter(|i| {
                tree.element(*i)
                    .is_some_and(|e| e.attr_or_empty("type").eq_ignore_ascii_case("radio"))
            })
            .collect();
        for radio in radios {
            set_flag(tree, radio, "checked", false);
        }
    }
    set_flag(tree, node, "checked", true);
}

pub fn toggle_checkbox(tree: &mut DomTree, node: NodeId) {
    let checked = has_attr(tree, node, "checked");
    set_flag(tree, node, "checked", !checked);
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap_dom::Document;

    fn doc(html: &str) -> Document {
        snap_html::parse(html).unwrap()
    }

    fn id(doc: &Document, id: &str) -> NodeId {
        doc.get_element_by_id(id).unwrap()
    }

    #[test]
    fn test_first_option_selected_by_default() {
        let d = doc(r#"<select><option id="a">a</option><option id="b">b</option><option id="c">c</option></select>"#);
        let tree = d.tree();
        assert!(is_selected(tree, id(&d, "a")).unwrap());
        assert!(!is_selected(tree, id(&d, "b")).unwrap());
        assert!(!is_selected(tree, id(&d, "c")).unwrap());
    }

    #[test]
    fn test_single_select_exclusive() {
        let mut d = doc(r#"<select><option id="a">a</option><option id="b" selected>b</option><option id="c">c</option></select>"#);
        let ids = [id(&d, "a"), id(&d, "b"), id(&d, "c")];
        for target in [ids[2], ids[0], ids[2], ids[1]] {
            click_option(d.tree_mut(), target);
            let selected = ids
                .iter()
                .filter(|o| is_selected(d.tree(), **o).unwrap())
                .count();
            assert_eq!(selected, 1);
            assert!(is_selected(d.tree(), target).unwrap());
        }
    }

    #[test]
    fn test_multi_select_toggles() {
        let mut d = doc(r#"<select multiple><option id="a">a</option><option id="b">b</option></select>"#);
        let (a, b) = (id(&d, "a"), id(&d, "b"));
        click_option(d.tree_mut(), a);
        click_option(d.tree_mut(), b);
        assert!(is_selected(d.tree(), a).unwrap());
        assert!(is_selected(d.tree(), b).unwrap());
        click_option(d.tree_mut(), a);
        assert!(!has_attr(d.tree(), a, "selected"));
    }

    #[test]
    fn test_radio_exclusive_within_form() {
        let mut d = doc(r#"<form><input type="radio" id="r1" name="x" checked><input type="radio" id="r2" name="x"></form>"#);
        let (r1, r2) = (id(&d, "r1"), id(&d, "r2"));
        check_radio(d.tree_mut(), r2);
        assert!(!is_selected(d.tree(), r1).unwrap());
        assert!(is_selected(d.tree(), r2).unwrap());
    }

    #[test]
    fn test_radio_group_is_whole_form() {
        // radios with different names in one form still exclude each other
        let mut d = doc(r#"<form><input type="radio" id="a" name="x" checked><input type="radio" id="b" name="y"></form>"#);
        let (a, b) = (id(&d, "a"), id(&d, "b"));
        check_radio(d.tree_mut(), b);
        assert!(!is_selected(d.tree(), a).unwrap());
    }

    #[test]
    fn test_radio_outside_form_clears_nothing() {
        let mut d = doc(r#"<input type="radio" id="a" checked><input type="radio" id="b">"#);
        let (a, b) = (id(&d, "a"), id(&d, "b"));
        check_radio(d.tree_mut(), b);
        assert!(is_selected(d.tree(), a).unwrap());
        assert!(is_selected(d.tree(), b).unwrap());
    }

    #[test]
    fn test_checkbox_toggle_and_unsupported() {
        let mut d = doc(r#"<input type="checkbox" id="c"><div id="d"></div>"#);
        let c = id(&d, "c");
        toggle_checkbox(d.tree_mut(), c);
        assert!(is_selected(d.tree(), c).unwrap());
        toggle_checkbox(d.tree_mut(), c);
        assert!(!is_selected(d.tree(), c).unwrap());
        assert!(matches!(
            is_selected(d.tree(), id(&d, "d")),
            Err(DriverError::UnsupportedOperation(_))
        ));
    }
}
