//! Element handles

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use snap_dom::{Document, NodeId};

use crate::click::{self, ClickOutcome};
use crate::editing::{self, EditOutcome};
use crate::options::{Dimension, Point, Rect};
use crate::page::{Page, PageId};
use crate::{attributes, form, selection, By, DriverError};

/// Handle to one element of one loaded page.
///
/// Two handles are equal when they refer to the same node of the same page.
/// Once that page has been replaced, operations fail with
/// [`DriverError::StaleElement`].
#[derive(Debug, Clone)]
pub struct Element {
    node: NodeId,
    page_id: PageId,
    page: Weak<Page>,
}

impl Element {
    pub(crate) fn new(node: NodeId, page_id: PageId, page: Weak<Page>) -> Self {
        Self { node, page_id, page }
    }

    /// Underlying tree node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Id of the page this handle belongs to
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    fn page(&self) -> Result<Rc<Page>, DriverError> {
        self.page.upgrade().ok_or(DriverError::StaleElement)
    }

    fn read<T>(&self, f: impl FnOnce(&Document, NodeId) -> T) -> Result<T, DriverError> {
        let page = self.page()?;
        let doc = page.document();
        Ok(f(&doc, self.node))
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Click the element
    pub fn click(&self) -> Result<(), DriverError> {
        let page = self.page()?;
        let mut target = self.node;
        let mut visited = HashSet::new();

        // delegation chains (label -> control -> button) end at the first repeat
        while visited.insert(target) {
            let outcome = click::dispatch(&mut *page.document_mut()?, target);
            match outcome {
                ClickOutcome::Done => return Ok(()),
                ClickOutcome::Delegate(next) => target = next,
                ClickOutcome::Submit(form_node) => return page.submit_form(form_node),
                ClickOutcome::Navigate(url) => return page.session()?.navigate(&url),
            }
        }
        Ok(())
    }

    /// Submit the enclosing form
    pub fn submit(&self) -> Result<(), DriverError> {
        let page = self.page()?;
        let form_node = form::nearest_form(page.document().tree(), self.node)
            .ok_or_else(|| DriverError::UnsupportedOperation("Can only submit forms.".into()))?;
        page.submit_form(form_node)
    }

    /// Type text into the element; a lone Enter inside a form submits it
    pub fn send_keys(&self, keys: &str) -> Result<(), DriverError> {
        let page = self.page()?;
        let outcome = editing::send_keys(&mut *page.document_mut()?, self.node, keys)?;
        match outcome {
            EditOutcome::Done => Ok(()),
            EditOutcome::Submit(form_node) => page.submit_form(form_node),
        }
    }

    pub fn clear(&self) -> Result<(), DriverError> {
        let page = self.page()?;
        editing::clear(&mut *page.document_mut()?, self.node)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Merged attribute/property value
    pub fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.read(|doc, node| attributes::attribute(doc, node, name))
    }

    /// Attribute value as authored in the markup
    pub fn dom_attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.read(|doc, node| attributes::dom_attribute(doc, node, name))
    }

    /// Live property value
    pub fn dom_property(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.read(|doc, node| attributes::dom_property(doc, node, name))
    }

    pub fn is_selected(&self) -> Result<bool, DriverError> {
        self.read(|doc, node| selection::is_selected(doc.tree(), node))?
    }

    pub fn is_enabled(&self) -> Result<bool, DriverError> {
        self.read(|doc, node| !has_attr(doc, node, "disabled"))
    }

    pub fn is_read_only(&self) -> Result<bool, DriverError> {
        self.read(|doc, node| has_attr(doc, node, "readonly"))
    }

    pub fn is_content_editable(&self) -> Result<bool, DriverError> {
        self.read(|doc, node| editing::is_content_editable(doc.tree(), node))
    }

    /// Rendered text
    pub fn text(&self) -> Result<String, DriverError> {
        self.read(|doc, node| attributes::rendered_text(doc.tree(), node))
    }

    pub fn tag_name(&self) -> Result<String, DriverError> {
        self.read(|doc, node| doc.tree().tag_name(node).unwrap_or_default().to_string())
    }

    /// Descendants matching `by`; the element itself is never included
    pub fn find_elements(&self, by: &By) -> Result<Vec<Element>, DriverError> {
        self.page()?.find_elements(self.node, by)
    }

    pub fn find_element(&self, by: &By) -> Result<Element, DriverError> {
        self.page()?.find_element(self.node, by)
    }

    // ========================================================================
    // Geometry (no layout)
    // ========================================================================

    pub fn is_displayed(&self) -> bool {
        false
    }

    pub fn location(&self) -> Point {
        Point::default()
    }

    pub fn size(&self) -> Dimension {
        Dimension::default()
    }

    pub fn rect(&self) -> Rect {
        Rect::default()
    }

    pub fn css_value(&self, _property: &str) -> String {
        String::new()
    }
}

fn has_attr(doc: &Document, node: NodeId, name: &str) -> bool {
    doc.tree().element(node).is_some_and(|e| e.has_attr(name))
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id && self.node == other.node
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.page_id.hash(state);
        self.node.hash(state);
    }
}
