//! snapdriver DOM - Document Object Model
//!
//! Arena-backed DOM tree. Nodes live in a single vector owned by [`DomTree`]
//! and are addressed by [`NodeId`], so handles are `Copy` and never keep the
//! document alive on their own.

mod node;
mod tree;
mod document;
mod text;
mod serialize;

pub use node::{Attribute, ElementData, Node, NodeData};
pub use tree::{Ancestors, Children, Descendants, DomTree};
pub use document::Document;
pub use text::{is_block_tag, normalize_whitespace, text, whole_text};
pub use serialize::{inner_html, outer_html};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID (the document node)
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this id points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
