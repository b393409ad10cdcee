//! DOM Tree (arena-based allocation)

use crate::{Attribute, ElementData, Node, NodeId};

/// Arena-based DOM tree
///
/// Slot 0 always holds the document node. Detached nodes stay in the arena
/// so outstanding [`NodeId`]s never dangle.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree holds nothing besides the document node
    pub fn is_empty(&self) -> bool {
        self.get(NodeId::ROOT)
            .map(|root| !root.first_child.is_valid())
            .unwrap_or(true)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(ElementData::new(name)))
    }

    /// Create a detached element with attributes
    pub fn create_element_with_attrs(&mut self, name: &str, attrs: Vec<Attribute>) -> NodeId {
        self.push(Node::element(ElementData::with_attrs(name, attrs)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    /// Create a detached doctype
    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.push(Node::doctype(name, public_id, system_id))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.get(parent).is_none() || self.get(child).is_none() {
            return;
        }
        self.detach(child);

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
    }

    /// Unlink a node from its parent and siblings
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else if parent.is_valid() {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else if parent.is_valid() {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Detach every child of `parent`
    pub fn remove_children(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = self.children(parent).map(|(id, _)| id).collect();
        for child in children {
            self.detach(child);
        }
    }

    /// Replace all children with a single text node (none if `text` is empty)
    pub fn set_text(&mut self, parent: NodeId, text: &str) {
        self.remove_children(parent);
        if !text.is_empty() {
            self.append_text(parent, text);
        }
    }

    /// Append a new text node to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    /// Iterate direct children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE),
        }
    }

    /// Direct children that are elements
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(|(_, n)| n.is_element()).map(|(id, _)| id)
    }

    /// Pre-order traversal of everything below `id` (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE),
        }
    }

    /// Descendant elements of `id` (excluding `id`)
    pub fn descendant_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(id).filter(|d| self.element(*d).is_some())
    }

    /// Walk up from the parent of `id` to the document node
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> NodeId {
        self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE)
    }

    /// Check whether `id` is below `ancestor`
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Element data for a node, if it is an element
    #[inline]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data
    #[inline]
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Tag name of an element node
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Check an element's tag name
    pub fn is_element_named(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).is_some_and(|e| e.is(tag))
    }

    /// Nearest element named `tag`, starting with `id` itself
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        if self.is_element_named(id, tag) {
            return Some(id);
        }
        self.ancestors(id).find(|a| self.is_element_named(*a, tag))
    }

    /// Descendant elements named `tag`, in document order
    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|d| self.is_element_named(*d, tag))
            .collect()
    }

    /// Previous sibling that is an element
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.get(id)?.prev_sibling;
        while cur.is_valid() {
            if self.element(cur).is_some() {
                return Some(cur);
            }
            cur = self.get(cur)?.prev_sibling;
        }
        None
    }

    /// Next sibling that is an element
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.get(id)?.next_sibling;
        while cur.is_valid() {
            if self.element(cur).is_some() {
                return Some(cur);
            }
            cur = self.get(cur)?.next_sibling;
        }
        None
    }

    fn next_in_preorder(&self, id: NodeId, root: NodeId) -> NodeId {
        let Some(node) = self.get(id) else { return NodeId::NONE };
        if node.first_child.is_valid() {
            return node.first_child;
        }
        let mut cur = id;
        while cur.is_valid() && cur != root {
            let Some(node) = self.get(cur) else { break };
            if node.next_sibling.is_valid() {
                return node.next_sibling;
            }
            cur = node.parent;
        }
        NodeId::NONE
    }
}

/// Iterator over direct children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Pre-order iterator over descendants
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next;
        if !id.is_valid() {
            return None;
        }
        self.next = self.tree.next_in_preorder(id, self.root);
        Some(id)
    }
}

/// Iterator over ancestors, nearest first
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next;
        if !id.is_valid() {
            return None;
        }
        self.next = self.tree.parent(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        let p = tree.create_element("p");
        tree.append_child(tree.root(), html);
        tree.append_child(html, body);
        tree.append_child(body, p);
        tree.append_text(p, "hi");
        (tree, html, body, p)
    }

    #[test]
    fn test_append_links_siblings() {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        tree.append_child(ul, a);
        tree.append_child(ul, b);

        let ids: Vec<_> = tree.children(ul).map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(tree.get(b).unwrap().prev_sibling, a);
        assert_eq!(tree.next_element_sibling(a), Some(b));
        assert_eq!(tree.prev_element_sibling(a), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let (tree, html, body, p) = sample();
        let all: Vec<_> = tree.descendants(tree.root()).collect();
        assert_eq!(&all[..3], &[html, body, p]);
        assert_eq!(all.len(), 4);
        assert_eq!(tree.descendants(p).count(), 1);
    }

    #[test]
    fn test_descendants_stay_inside_scope() {
        let (mut tree, _, body, p) = sample();
        let after = tree.create_element("div");
        tree.append_child(body, after);
        let inside: Vec<_> = tree.descendants(p).collect();
        assert!(!inside.contains(&after));
    }

    #[test]
    fn test_closest_includes_self() {
        let (tree, html, body, p) = sample();
        assert_eq!(tree.closest(p, "p"), Some(p));
        assert_eq!(tree.closest(p, "BODY"), Some(body));
        assert_eq!(tree.closest(p, "html"), Some(html));
        assert_eq!(tree.closest(p, "form"), None);
    }

    #[test]
    fn test_detach_and_set_text() {
        let (mut tree, _, _, p) = sample();
        tree.set_text(p, "");
        assert_eq!(tree.children(p).count(), 0);
        tree.set_text(p, "new");
        let texts: Vec<_> = tree.children(p).filter_map(|(_, n)| n.as_text()).collect();
        assert_eq!(texts, vec!["new"]);
    }

    #[test]
    fn test_empty_tree() {
        let tree = DomTree::new();
        assert!(tree.is_empty());
        let (tree, ..) = sample();
        assert!(!tree.is_empty());
    }
}
