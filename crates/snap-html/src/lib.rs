//! snapdriver HTML Parser
//!
//! HTML5 parser built on html5ever. Produces a [`snap_dom::Document`]
//! whose tree keeps every text node, whitespace included, so that
//! whole-text extraction sees the source formatting.

mod parser;

pub use parser::HtmlParser;
pub use snap_dom::Document;

/// Parse an HTML string into a Document at `about:blank`
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read HTML input: {0}")]
    Read(#[from] std::io::Error),
}
