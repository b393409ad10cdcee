//! snapdriver element selection
//!
//! Three ways to pick elements out of a [`snap_dom::DomTree`]:
//!
//! - [`Selector`]: CSS selector groups
//! - [`XPath`]: an XPath 1.0 subset
//! - [`Evaluator`]: the simple locator predicates (id, tag, class,
//!   attribute value, link text) plus a wrapped CSS selector
//!
//! Scoped selection through [`select`] never returns the scoping node itself.

mod css;
mod evaluator;
mod xpath;

pub use css::Selector;
pub use evaluator::{select, Evaluator};
pub use xpath::XPath;

/// Selector parse and evaluation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("invalid CSS selector '{selector}': {reason}")]
    InvalidCss { selector: String, reason: String },

    #[error("invalid XPath expression '{expression}': {reason}")]
    InvalidXPath { expression: String, reason: String },
}
