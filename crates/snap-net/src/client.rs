//! HTTP Client
//!
//! Blocking HTTP client on top of reqwest. Redirects and cookies are handled
//! by reqwest; the cookie store is the shared jar so the driver and the
//! client see the same cookies.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};

use crate::cookies::SharedCookieJar;
use crate::{Method, NetError, Request, Response};

/// Anything that can turn a [`Request`] into a [`Response`]
pub trait Transport {
    fn execute(&self, request: &Request) -> Result<Response, NetError>;
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User agent string
    pub user_agent: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max redirects to follow (0 = disable)
    pub max_redirects: u32,
    /// Enable cookies
    pub cookies_enabled: bool,
    /// Default headers
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("snapdriver/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            max_redirects: 10,
            cookies_enabled: true,
            default_headers: Vec::new(),
        }
    }
}

/// HTTP client builder
#[derive(Default)]
pub struct HttpClientBuilder {
    config: ClientConfig,
    jar: Option<Arc<SharedCookieJar>>,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_agent(mut self, ua: &str) -> Self {
        self.config.user_agent = ua.to_string();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.config.cookies_enabled = enabled;
        self
    }

    /// Use `jar` as the cookie store instead of a fresh one
    pub fn cookie_jar(mut self, jar: Arc<SharedCookieJar>) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        self.config.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Result<HttpClient, NetError> {
        let config = self.config;
        let jar = self.jar.unwrap_or_default();

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| NetError::Network(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| NetError::Network(format!("invalid header value for {name}: {e}")))?;
            headers.append(name, value);
        }

        let redirects = match config.max_redirects {
            0 => Policy::none(),
            n => Policy::limited(n as usize),
        };

        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .redirect(redirects)
            .default_headers(headers);
        if config.cookies_enabled {
            builder = builder.cookie_provider(Arc::clone(&jar));
        }

        let inner = builder.build().map_err(|e| NetError::Network(e.to_string()))?;
        tracing::debug!("HTTP client ready ({})", config.user_agent);

        Ok(HttpClient { inner, config, jar })
    }
}

/// HTTP client
#[derive(Debug)]
pub struct HttpClient {
    inner: reqwest::blocking::Client,
    config: ClientConfig,
    jar: Arc<SharedCookieJar>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    /// Create a client builder
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Create with custom config
    pub fn with_config(config: ClientConfig) -> Result<Self, NetError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The jar backing this client's cookie store
    pub fn cookie_jar(&self) -> Arc<SharedCookieJar> {
        Arc::clone(&self.jar)
    }
}

impl Transport for HttpClient {
    fn execute(&self, request: &Request) -> Result<Response, NetError> {
        tracing::info!("{} {}", request.method.as_str(), request.url);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self.inner.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().map_err(|e| NetError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let url = resp.url().clone();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = resp.bytes().map_err(|e| NetError::Decode(e.to_string()))?.to_vec();

        if status >= 400 && !request.ignore_http_errors {
            tracing::debug!("{} returned {}", url, status);
            return Err(NetError::HttpError {
                status,
                url: url.to_string(),
            });
        }

        Ok(Response {
            status,
            url,
            headers,
            body,
        })
    }
}
