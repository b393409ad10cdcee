//! Click dispatch
//!
//! A click is resolved once, without bubbling. Selection changes are applied
//! to the tree here; anything that leaves the page (submission, navigation)
//! or re-targets the click is returned to the caller as a [`ClickOutcome`].

use snap_dom::{Document, NodeId};

use crate::selection;

/// Result of dispatching a click on one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing more to do
    Done,
    /// Click this element instead
    Delegate(NodeId),
    /// Submit this form
    Submit(NodeId),
    /// Load this absolute URL
    Navigate(String),
}

/// Dispatch a click on `node`
pub fn dispatch(doc: &mut Document, node: NodeId) -> ClickOutcome {
    let outcome = resolve(doc, node);
    tracing::trace!("click {} -> {:?}", node, outcome);
    outcome
}

fn resolve(doc: &mut Document, node: NodeId) -> ClickOutcome {
    let tree = doc.tree();
    let Some(el) = tree.element(node) else {
        return ClickOutcome::Done;
    };
    if el.has_attr("disabled") {
        return ClickOutcome::Done;
    }

    let tag = el.name.to_ascii_lowercase();
    match tag.as_str() {
        "label" => {
            let target = el
                .get_attr("for")
                .filter(|id| !id.is_empty())
                .and_then(|id| doc.get_element_by_id(id));
            if let Some(target) = target {
                return ClickOutcome::Delegate(target);
            }
        }
        "input" => {
            let kind = el.attr_or_empty("type").to_ascii_lowercase();
            match kind.as_str() {
                "radio" => selection::check_radio(doc.tree_mut(), node),
                "checkbox" => selection::toggle_checkbox(doc.tree_mut(), node),
                "image" | "submit" => {
                    return tree.closest(node, "form").map_or(ClickOutcome::Done, ClickOutcome::Submit);
                }
                _ => {}
            }
            return ClickOutcome::Done;
        }
        "button" => {
            let form = match el.get_attr("form").filter(|f| !f.is_empty()) {
                Some(form_id) => doc
                    .get_element_by_id(form_id)
                    .filter(|f| tree.is_element_named(*f, "form")),
                None => tree.closest(node, "form"),
            };
            return form.map_or(ClickOutcome::Done, ClickOutcome::Submit);
        }
        "option" => {
            selection::click_option(doc.tree_mut(), node);
            return ClickOutcome::Done;
        }
        _ => {}
    }

    if let Some(button) = tree.closest(node, "button") {
        return ClickOutcome::Delegate(button);
    }

    let href = doc.abs_url(node, "href");
    if !href.is_empty() {
        return ClickOutcome::Navigate(href);
    }

    match tree.closest(node, "a").map(|a| doc.abs_url(a, "href")) {
        Some(href) if !href.is_empty() => ClickOutcome::Navigate(href),
        _ => ClickOutcome::Done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        snap_html::HtmlParser::new()
            .parse_with_url(html, "http://localhost/start.html")
            .unwrap()
    }

    fn id(doc: &Document, id: &str) -> NodeId {
        doc.get_element_by_id(id).unwrap()
    }

    fn has(doc: &Document, node: NodeId, attr: &str) -> bool {
        doc.tree().element(node).unwrap().has_attr(attr)
    }

    #[test]
    fn test_label_delegates_to_target() {
        let mut d = doc(r#"<label id="l" for="c">x</label><input type="checkbox" id="c">"#);
        let (l, c) = (id(&d, "l"), id(&d, "c"));
        assert_eq!(dispatch(&mut d, l), ClickOutcome::Delegate(c));
    }

    #[test]
    fn test_label_missing_target_falls_through() {
        let mut d = doc(r#"<a href="/next"><label id="l" for="nope">x</label></a><label id="e" for="">y</label>"#);
        let (l, e) = (id(&d, "l"), id(&d, "e"));
        assert_eq!(dispatch(&mut d, l), ClickOutcome::Navigate("http://localhost/next".into()));
        assert_eq!(dispatch(&mut d, e), ClickOutcome::Done);
    }

    #[test]
    fn test_checkbox_and_radio() {
        let mut d = doc(r#"<form><input type="checkbox" id="c"><input type="radio" id="r1" checked><input type="radio" id="r2"></form>"#);
        let (c, r1, r2) = (id(&d, "c"), id(&d, "r1"), id(&d, "r2"));
        assert_eq!(dispatch(&mut d, c), ClickOutcome::Done);
        assert!(has(&d, c, "checked"));
        dispatch(&mut d, r2);
        assert!(!has(&d, r1, "checked"));
        assert!(has(&d, r2, "checked"));
    }

    #[test]
    fn test_submit_inputs() {
        let mut d = doc(r#"<form id="f"><input type="submit" id="s"><input type="IMAGE" id="i"><input type="text" id="t"></form>
            <input type="submit" id="lonely">"#);
        let f = id(&d, "f");
        for name in ["s", "i"] {
            let node = id(&d, name);
            assert_eq!(dispatch(&mut d, node), ClickOutcome::Submit(f));
        }
        let (t, lonely) = (id(&d, "t"), id(&d, "lonely"));
        assert_eq!(dispatch(&mut d, t), ClickOutcome::Done);
        assert_eq!(dispatch(&mut d, lonely), ClickOutcome::Done);
    }

    #[test]
    fn test_button_form_attribute() {
        let mut d = doc(r#"<form id="f"></form><form id="g"><button id="inner">in</button></form>
            <button id="b" form="f">go</button><button id="bad" form="x">no</button>
            <button id="notform" form="b">no</button><button id="free">free</button>"#);
        let (f, g) = (id(&d, "f"), id(&d, "g"));
        let b = id(&d, "b");
        assert_eq!(dispatch(&mut d, b), ClickOutcome::Submit(f));
        let inner = id(&d, "inner");
        assert_eq!(dispatch(&mut d, inner), ClickOutcome::Submit(g));
        for name in ["bad", "notform", "free"] {
            let node = id(&d, name);
            assert_eq!(dispatch(&mut d, node), ClickOutcome::Done);
        }
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut d = doc(r#"<input type="checkbox" id="c" disabled><a id="a" href="/x" disabled>x</a>"#);
        let (c, a) = (id(&d, "c"), id(&d, "a"));
        assert_eq!(dispatch(&mut d, c), ClickOutcome::Done);
        assert!(!has(&d, c, "checked"));
        assert_eq!(dispatch(&mut d, a), ClickOutcome::Done);
    }

    #[test]
    fn test_generic_fallback() {
        let mut d = doc(r#"<form id="f"><button id="b"><span id="in">go</span></button></form>
            <a id="a" href="page2.html"><b id="bold">link</b></a><a id="empty">none</a><p id="p">p</p>"#);
        let (b, inner, bold) = (id(&d, "b"), id(&d, "in"), id(&d, "bold"));
        assert_eq!(dispatch(&mut d, inner), ClickOutcome::Delegate(b));
        let expected = ClickOutcome::Navigate("http://localhost/page2.html".into());
        assert_eq!(dispatch(&mut d, bold), expected);
        let a = id(&d, "a");
        assert_eq!(dispatch(&mut d, a), expected);
        let (empty, p) = (id(&d, "empty"), id(&d, "p"));
        assert_eq!(dispatch(&mut d, empty), ClickOutcome::Done);
        assert_eq!(dispatch(&mut d, p), ClickOutcome::Done);
    }

    #[test]
    fn test_option_click() {
        let mut d = doc(r#"<select><option id="a" selected>a</option><option id="b">b</option></select><option id="loose">x</option>"#);
        let (a, b) = (id(&d, "a"), id(&d, "b"));
        dispatch(&mut d, b);
        assert!(!has(&d, a, "selected"));
        assert!(has(&d, b, "selected"));
    }
}
