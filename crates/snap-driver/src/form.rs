//! Form collection
//!
//! Gathers the successful controls of a form and turns them into the
//! request a browser would send.

use snap_dom::{Document, DomTree, NodeId};
use snap_net::{FormData, FormEnctype, Method, NetError, Request, Url};

use crate::attributes::rendered_text;
use crate::editing::live_value;
use crate::DriverError;

/// Nearest enclosing form, the element itself included
pub fn nearest_form(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    tree.closest(node, "form")
}

/// Build the submission request for `form`
pub fn build_request(doc: &Document, form: NodeId) -> Result<Request, DriverError> {
    let tree = doc.tree();
    let Some(el) = tree.element(form) else {
        return Err(DriverError::UnsupportedOperation("Can only submit forms.".into()));
    };

    let method = if el.attr_or_empty("method").eq_ignore_ascii_case("post") {
        Method::Post
    } else {
        Method::Get
    };
    let mut action = doc.abs_url(form, "action");
    if action.is_empty() {
        action = doc.url().to_string();
    }
    let action = Url::parse(&action).map_err(|e| NetError::InvalidUrl(format!("{action}: {e}")))?;

    let mut data = FormData::new(action, method);
    data.enctype = FormEnctype::from_attr(el.attr_or_empty("enctype"));
    collect_fields(tree, form, &mut data);

    tracing::debug!("Submitting form: {} {} ({} fields)", method.as_str(), data.action, data.fields.len());
    Ok(data.into_request())
}

fn collect_fields(tree: &DomTree, form: NodeId, data: &mut FormData) {
    for node in tree.descendant_elements(form) {
        let Some(el) = tree.element(node) else { continue };
        if !(el.is("input") || el.is("select") || el.is("textarea")) {
            continue;
        }
        let name = el.attr_or_empty("name");
        if name.is_empty() || el.has_attr("disabled") {
            continue;
        }
        let kind = el.attr_or_empty("type").to_ascii_lowercase();
        if kind == "button" || kind == "image" {
            continue;
        }

        if el.is("select") {
            let options = tree.elements_by_tag(node, "option");
            let selected: Vec<NodeId> = options
                .iter()
                .copied()
                .filter(|o| tree.element(*o).is_some_and(|e| e.has_attr("selected")))
                .collect();
            let chosen: Vec<NodeId> = if selected.is_empty() {
                options.first().copied().into_iter().collect()
            } else {
                selected
            };
            for option in chosen {
                data.push(name, &option_value(tree, option));
            }
        } else if kind == "checkbox" || kind == "radio" {
            if el.has_attr("checked") {
                let value = el.attr_or_empty("value");
                data.push(name, if value.is_empty() { "on" } else { value });
            }
        } else {
            data.push(name, &live_value(tree, node));
        }
    }
}

fn option_value(tree: &DomTree, option: NodeId) -> String {
    match tree.element(option).and_then(|e| e.get_attr("value")) {
        Some(value) => value.to_string(),
        None => rendered_text(tree, option),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Document {
        snap_html::HtmlParser::new()
            .parse_with_url(html, "http://localhost/app/form.html")
            .unwrap()
    }

    fn form(doc: &Document) -> NodeId {
        doc.tree().elements_by_tag(doc.tree().root(), "form")[0]
    }

    #[test]
    fn test_get_collects_controls_in_order() {
        let d = doc(r#"<form action="search">
            <input name="q" value="rust">
            <input type="checkbox" name="c1" checked>
            <input type="checkbox" name="c2" value="x">
            <input type="radio" name="r" value="a">
            <input type="radio" name="r" value="b" checked>
            <select name="s"><option>one</option><option value="2">two</option></select>
            <select name="m" multiple><option selected>x</option><option selected value="y">Y</option></select>
            <textarea name="t">body</textarea>
            <input name="off" disabled value="no">
            <input value="unnamed">
            <input type="button" name="btn" value="b">
            <input type="submit" name="go" value="Go">
        </form>"#);
        let req = build_request(&d, form(&d)).unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(
            req.url.as_str(),
            "http://localhost/app/search?q=rust&c1=on&r=b&s=one&m=x&m=y&t=body&go=Go"
        );
    }

    #[test]
    fn test_post_defaults_to_document_url() {
        let d = doc(r#"<form method="POST"><input name="a" value="1 2"></form>"#);
        let req = build_request(&d, form(&d)).unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url.as_str(), "http://localhost/app/form.html");
        assert_eq!(req.header("Content-Type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(req.body.as_deref(), Some(&b"a=1+2"[..]));
    }

    #[test]
    fn test_enctype_respected() {
        let d = doc(r#"<form method="post" enctype="text/plain"><input name="a" value="b"></form>"#);
        let req = build_request(&d, form(&d)).unwrap();
        assert_eq!(req.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_nearest_form() {
        let d = doc(r#"<form id="f"><div><input id="i"></div></form><input id="o">"#);
        let tree = d.tree();
        let f = d.get_element_by_id("f").unwrap();
        assert_eq!(nearest_form(tree, d.get_element_by_id("i").unwrap()), Some(f));
        assert_eq!(nearest_form(tree, f), Some(f));
        assert_eq!(nearest_form(tree, d.get_element_by_id("o").unwrap()), None);
    }
}
