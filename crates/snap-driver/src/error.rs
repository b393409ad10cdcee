//! Driver errors

use snap_html::ParseError;
use snap_net::NetError;

/// Error returned by driver and element operations
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Action attempted on a disabled or read-only element
    #[error("invalid element state: {0}")]
    InvalidState(String),

    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The page this handle came from has been replaced
    #[error("stale element reference")]
    StaleElement,

    #[error(transparent)]
    Transport(#[from] NetError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
