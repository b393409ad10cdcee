//! Parsed document
//!
//! Wraps the arena tree together with the URL it was loaded from.

use url::Url;

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Document URL
    url: String,
    /// Base for resolving relative links (`<base href>` or the document URL)
    base: Option<Url>,
}

impl Document {
    /// Document with no nodes besides the root, as shown for `about:blank`
    pub fn empty(url: &str) -> Self {
        Self::from_tree(DomTree::new(), url)
    }

    /// Wrap a built tree, resolving the base URL once
    pub fn from_tree(tree: DomTree, url: &str) -> Self {
        let base = resolve_base(&tree, url);
        tracing::trace!(url, base = ?base.as_ref().map(Url::as_str), "document ready");
        Self {
            tree,
            url: url.to_string(),
            base,
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get document title (normalized text of the first `<title>`)
    pub fn title(&self) -> String {
        self.tree
            .elements_by_tag(self.tree.root(), "title")
            .first()
            .map(|id| crate::text(&self.tree, *id))
            .unwrap_or_default()
    }

    /// First element in document order whose id equals `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .find(|n| self.tree.element(*n).and_then(|e| e.id()) == Some(id))
    }

    /// Resolve an attribute of `node` as an absolute URL.
    ///
    /// Returns the empty string when the attribute is missing or cannot be
    /// resolved.
    pub fn abs_url(&self, node: NodeId, attr: &str) -> String {
        let Some(value) = self.tree.element(node).and_then(|e| e.get_attr(attr)) else {
            return String::new();
        };
        let value = value.trim();
        let resolved = match &self.base {
            Some(base) => base.join(value),
            None => Url::parse(value),
        };
        resolved.map(String::from).unwrap_or_default()
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Mutable tree; edits go through here
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Serialized markup of the whole document
    pub fn html(&self) -> String {
        crate::outer_html(&self.tree, self.tree.root())
    }
}

/// `<base href>` joined onto the document URL, else the document URL
fn resolve_base(tree: &DomTree, url: &str) -> Option<Url> {
    let doc_url = Url::parse(url).ok();
    let base_href = tree
        .elements_by_tag(tree.root(), "base")
        .into_iter()
        .find_map(|id| tree.element(id).and_then(|e| e.get_attr("href")).map(str::to_string));
    match (base_href, doc_url) {
        (Some(href), Some(doc_url)) => doc_url.join(href.trim()).ok().or(Some(doc_url)),
        (Some(href), None) => Url::parse(href.trim()).ok(),
        (None, doc_url) => doc_url,
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty("about:blank")
    }
}
