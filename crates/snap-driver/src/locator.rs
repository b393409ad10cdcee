//! Locator strategies

use std::fmt;

use snap_dom::{Document, NodeId};
use snap_select::{select, Evaluator, SelectorError, XPath};

use crate::DriverError;

/// How to find elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum By {
    Id(String),
    TagName(String),
    ClassName(String),
    Name(String),
    CssSelector(String),
    XPath(String),
    LinkText(String),
    PartialLinkText(String),
}

impl By {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn tag_name(tag: impl Into<String>) -> Self {
        Self::TagName(tag.into())
    }

    pub fn class_name(class: impl Into<String>) -> Self {
        Self::ClassName(class.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::CssSelector(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::PartialLinkText(text.into())
    }

    /// The raw selector string
    pub fn value(&self) -> &str {
        match self {
            By::Id(v)
            | By::TagName(v)
            | By::ClassName(v)
            | By::Name(v)
            | By::CssSelector(v)
            | By::XPath(v)
            | By::LinkText(v)
            | By::PartialLinkText(v) => v,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            By::Id(_) => "id",
            By::TagName(_) => "tagName",
            By::ClassName(_) => "className",
            By::Name(_) => "name",
            By::CssSelector(_) => "cssSelector",
            By::XPath(_) => "xpath",
            By::LinkText(_) => "linkText",
            By::PartialLinkText(_) => "partialLinkText",
        }
    }

    fn evaluator(&self) -> Result<Evaluator, DriverError> {
        let value = self.value();
        if value.is_empty() {
            return Err(DriverError::InvalidSelector(format!("Invalid selector: {self}")));
        }
        Ok(match self {
            By::Id(v) => Evaluator::Id(v.clone()),
            By::TagName(v) => Evaluator::Tag(v.clone()),
            By::ClassName(v) => Evaluator::Class(v.clone()),
            By::Name(v) => Evaluator::AttributeWithValue {
                key: "name".into(),
                value: v.clone(),
            },
            By::CssSelector(v) => Evaluator::css(v)
                .map_err(|e| DriverError::InvalidSelector(format!("Invalid css selector: {v} ({e})")))?,
            By::LinkText(v) => Evaluator::LinkText(v.clone()),
            By::PartialLinkText(v) => Evaluator::PartialLinkText(v.clone()),
            By::XPath(_) => {
                return Err(DriverError::UnsupportedOperation(format!("Not an evaluator: {self}")));
            }
        })
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By.{}: {}", self.kind(), self.value())
    }
}

/// Every element under `scope` matched by `by`, in document order.
///
/// Only strict descendants of `scope` match. XPath is evaluated with `scope`
/// as context node, and absolute paths are cut back to its subtree.
pub fn find_all(doc: &Document, scope: NodeId, by: &By) -> Result<Vec<NodeId>, DriverError> {
    let tree = doc.tree();
    match by {
        By::XPath(expression) => {
            let invalid = |e: SelectorError| DriverError::InvalidSelector(format!("Invalid selector: {by} ({e})"));
            if expression.is_empty() {
                return Err(DriverError::InvalidSelector(format!("Invalid selector: {by}")));
            }
            let mut found = XPath::parse(expression)
                .map_err(invalid)?
                .select(tree, scope)
                .map_err(invalid)?;
            found.retain(|node| tree.is_descendant_of(*node, scope));
            Ok(found)
        }
        By::Name(name) if name.is_empty() => Ok(Vec::new()),
        _ => Ok(select(tree, scope, &by.evaluator()?)),
    }
}

/// First element under `scope` matched by `by`
pub fn find_first(doc: &Document, scope: NodeId, by: &By) -> Result<NodeId, DriverError> {
    find_all(doc, scope, by)?
        .first()
        .copied()
        .ok_or_else(|| DriverError::NoSuchElement(format!("No element with selector: {by}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        snap_html::parse(
            r#"<div id="main"><p class="x" name="n">one</p><p>two</p><a href="/a">Read more</a></div>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(By::id("main").to_string(), "By.id: main");
        assert_eq!(By::css("p > a").to_string(), "By.cssSelector: p > a");
    }

    #[test]
    fn test_each_strategy() {
        let d = doc();
        let root = d.tree().root();
        assert_eq!(find_all(&d, root, &By::id("main")).unwrap().len(), 1);
        assert_eq!(find_all(&d, root, &By::tag_name("p")).unwrap().len(), 2);
        assert_eq!(find_all(&d, root, &By::class_name("x")).unwrap().len(), 1);
        assert_eq!(find_all(&d, root, &By::name("n")).unwrap().len(), 1);
        assert_eq!(find_all(&d, root, &By::css("div > p")).unwrap().len(), 2);
        assert_eq!(find_all(&d, root, &By::xpath("//p[2]")).unwrap().len(), 1);
        assert_eq!(find_all(&d, root, &By::link_text("Read more")).unwrap().len(), 1);
        assert_eq!(find_all(&d, root, &By::partial_link_text("more")).unwrap().len(), 1);
    }

    #[test]
    fn test_scope_excludes_itself() {
        let d = doc();
        let main = d.get_element_by_id("main").unwrap();
        assert!(find_all(&d, main, &By::tag_name("div")).unwrap().is_empty());
        assert!(find_all(&d, main, &By::xpath(".")).unwrap().is_empty());
        assert_eq!(find_all(&d, main, &By::xpath("./p")).unwrap().len(), 2);
    }

    #[test]
    fn test_absolute_xpath_stays_in_scope() {
        let d = snap_html::parse(r#"<p id="outside">o</p><div id="main"><p id="in">i</p></div>"#).unwrap();
        let main = d.get_element_by_id("main").unwrap();
        let inside = d.get_element_by_id("in").unwrap();
        assert_eq!(find_all(&d, main, &By::xpath("//p")).unwrap(), vec![inside]);
        assert!(find_all(&d, main, &By::xpath("/html")).unwrap().is_empty());
        assert_eq!(find_all(&d, d.tree().root(), &By::xpath("//p")).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_selectors() {
        let d = doc();
        let root = d.tree().root();
        assert!(find_all(&d, root, &By::name("")).unwrap().is_empty());
        assert!(matches!(find_first(&d, root, &By::name("")), Err(DriverError::NoSuchElement(_))));
        for by in [By::id(""), By::css(""), By::xpath(""), By::link_text("")] {
            assert!(matches!(find_all(&d, root, &by), Err(DriverError::InvalidSelector(_))));
        }
    }

    #[test]
    fn test_invalid_syntax() {
        let d = doc();
        let root = d.tree().root();
        assert!(matches!(find_all(&d, root, &By::css("p[")), Err(DriverError::InvalidSelector(_))));
        assert!(matches!(find_all(&d, root, &By::xpath("//p[")), Err(DriverError::InvalidSelector(_))));
        assert!(matches!(find_first(&d, root, &By::id("nope")), Err(DriverError::NoSuchElement(_))));
    }
}
