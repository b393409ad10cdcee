//! Locator evaluators
//!
//! Each [`Evaluator`] is a per-element predicate. [`select`] walks the
//! descendants of a scope node in document order and keeps the matches.

use snap_dom::{DomTree, NodeId};

use crate::{Selector, SelectorError};

/// Element predicate used by locator strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluator {
    /// `id` attribute equals the value exactly
    Id(String),
    /// Tag name, compared exactly (parsed HTML names are lowercase)
    Tag(String),
    /// Class list contains the name, ignoring ASCII case
    Class(String),
    /// Attribute `key` (ignoring case) whose trimmed value equals `value` ignoring case
    AttributeWithValue { key: String, value: String },
    /// CSS selector group
    Css(Selector),
    /// `<a>` whose normalized text equals the value
    LinkText(String),
    /// `<a>` whose normalized text contains the value
    PartialLinkText(String),
}

impl Evaluator {
    /// Build a CSS evaluator
    pub fn css(selector: &str) -> Result<Self, SelectorError> {
        Selector::parse(selector).map(Self::Css)
    }

    /// Check a single node
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(element) = tree.element(node) else {
            return false;
        };
        match self {
            Self::Id(id) => element.id() == Some(id.as_str()),
            Self::Tag(tag) => element.name == *tag,
            Self::Class(class) => element.has_class(class),
            Self::AttributeWithValue { key, value } => element
                .get_attr(key)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value.trim())),
            Self::Css(selector) => selector.matches(tree, node),
            Self::LinkText(text) => element.is("a") && snap_dom::text(tree, node) == *text,
            Self::PartialLinkText(text) => {
                element.is("a") && snap_dom::text(tree, node).contains(text.as_str())
            }
        }
    }
}

/// All descendants of `scope` (excluding `scope`) matching `eval`, in document order
pub fn select(tree: &DomTree, scope: NodeId, eval: &Evaluator) -> Vec<NodeId> {
    let found: Vec<NodeId> = tree
        .descendants(scope)
        .filter(|node| eval.matches(tree, *node))
        .collect();
    tracing::trace!(?eval, %scope, count = found.len(), "select");
    found
}
