//! snapdriver Networking
//!
//! Blocking HTTP transport, cookie jar and form encoding.

mod client;
mod cookies;
mod form;
mod request;

pub use client::{ClientConfig, HttpClient, HttpClientBuilder, Transport};
pub use cookies::{parse_set_cookie, Cookie, CookieJar, SameSite, SharedCookieJar};
pub use form::{FormData, FormEnctype};
pub use request::{Method, Request, Response};
pub use url::Url;

/// Network error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("HTTP error {status} fetching {url}")]
    HttpError { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read response body: {0}")]
    Decode(String),
}
