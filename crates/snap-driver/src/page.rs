//! Loaded pages
//!
//! A [`Page`] owns one parsed document and the registry that hands out
//! [`Element`] handles for its nodes. Handles hold only a weak reference back
//! to the page, so replacing the current page drops the old document and
//! turns its handles stale.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use snap_dom::{Document, NodeId};
use snap_net::Request;

use crate::driver::Session;
use crate::{form, locator, By, DriverError, Element};

static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id of a loaded page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    fn next() -> Self {
        Self(NEXT_PAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One loaded document snapshot
#[derive(Debug)]
pub struct Page {
    id: PageId,
    document: RefCell<Document>,
    /// Request that produced this page; None for the blank page
    origin: Option<Request>,
    registry: RefCell<HashMap<NodeId, Element>>,
    this: Weak<Page>,
    session: Weak<Session>,
}

impl Page {
    pub(crate) fn new(document: Document, origin: Option<Request>, session: Weak<Session>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            id: PageId::next(),
            document: RefCell::new(document),
            origin,
            registry: RefCell::new(HashMap::new()),
            this: this.clone(),
            session,
        })
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// Document URL (final URL after redirects)
    pub fn url(&self) -> String {
        self.document.borrow().url().to_string()
    }

    pub fn title(&self) -> String {
        self.document.borrow().title()
    }

    /// Serialized markup of the current tree, edits included
    pub fn source(&self) -> String {
        self.document.borrow().html()
    }

    pub fn origin(&self) -> Option<&Request> {
        self.origin.as_ref()
    }

    /// Run `f` against the current tree, edits included
    pub fn with_document<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        f(&self.document())
    }

    pub(crate) fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    /// Tree for editing; fails while a [`Page::with_document`] closure is reading it
    pub(crate) fn document_mut(&self) -> Result<RefMut<'_, Document>, DriverError> {
        self.document
            .try_borrow_mut()
            .map_err(|_| DriverError::InvalidState("Page is being read; edit it after the read returns.".into()))
    }

    /// Handle for `node`, created on first request
    pub fn wrap(&self, node: NodeId) -> Element {
        self.registry
            .borrow_mut()
            .entry(node)
            .or_insert_with(|| Element::new(node, self.id, self.this.clone()))
            .clone()
    }

    /// Handles for `nodes`, in the same order
    pub fn wrap_all(&self, nodes: &[NodeId]) -> Vec<Element> {
        nodes.iter().map(|n| self.wrap(*n)).collect()
    }

    /// Number of handles issued so far
    pub fn registry_len(&self) -> usize {
        self.registry.borrow().len()
    }

    pub(crate) fn session(&self) -> Result<Rc<Session>, DriverError> {
        self.session.upgrade().ok_or(DriverError::StaleElement)
    }

    pub(crate) fn find_elements(&self, scope: NodeId, by: &By) -> Result<Vec<Element>, DriverError> {
        let nodes = locator::find_all(&self.document(), scope, by)?;
        Ok(self.wrap_all(&nodes))
    }

    pub(crate) fn find_element(&self, scope: NodeId, by: &By) -> Result<Element, DriverError> {
        let node = locator::find_first(&self.document(), scope, by)?;
        Ok(self.wrap(node))
    }

    /// Submit `form_node` and make the response the current page
    pub(crate) fn submit_form(&self, form_node: NodeId) -> Result<(), DriverError> {
        let request = form::build_request(&self.document(), form_node)?;
        self.session()?.open(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Rc<Page> {
        Page::new(snap_html::parse(html).unwrap(), None, Weak::new())
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let page = page(r#"<p id="a">a</p><p id="b">b</p>"#);
        let a = page.document().get_element_by_id("a").unwrap();
        let first = page.wrap(a);
        let second = page.wrap(a);
        assert_eq!(first, second);
        assert_eq!(page.registry_len(), 1);
    }

    #[test]
    fn test_wrap_all_keeps_order() {
        let page = page(r#"<p id="a">a</p><p id="b">b</p>"#);
        let (a, b) = {
            let doc = page.document();
            (doc.get_element_by_id("a").unwrap(), doc.get_element_by_id("b").unwrap())
        };
        let wrapped = page.wrap_all(&[b, a, b]);
        assert_eq!(wrapped.iter().map(Element::node).collect::<Vec<_>>(), vec![b, a, b]);
        assert_eq!(wrapped[0], wrapped[2]);
        assert_eq!(page.registry_len(), 2);
    }

    #[test]
    fn test_pages_get_distinct_ids() {
        let one = page("<p>x</p>");
        let two = page("<p>x</p>");
        assert_ne!(one.id(), two.id());
        let p1 = one.document().tree().elements_by_tag(NodeId::ROOT, "p")[0];
        let p2 = two.document().tree().elements_by_tag(NodeId::ROOT, "p")[0];
        assert_eq!(p1, p2);
        assert_ne!(one.wrap(p1), two.wrap(p2));
    }

    #[test]
    fn test_edit_during_read_is_an_error() {
        let page = page(r#"<input id="i">"#);
        let input = page.wrap(page.document().get_element_by_id("i").unwrap());
        let typed = page.with_document(|_| input.send_keys("x"));
        assert!(matches!(typed, Err(DriverError::InvalidState(_))));
        input.send_keys("x").unwrap();
        assert!(page.with_document(|d| d.html().contains(r#"value="x""#)));
    }

    #[test]
    fn test_detached_session_is_stale() {
        let page = page(r#"<form><input type="submit"></form>"#);
        let form = page.document().tree().elements_by_tag(NodeId::ROOT, "form")[0];
        assert!(matches!(page.submit_form(form), Err(DriverError::StaleElement)));
    }
}
