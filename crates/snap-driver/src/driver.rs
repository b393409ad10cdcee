//! Driver and browsing session

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use snap_dom::Document;
use snap_html::HtmlParser;
use snap_net::{HttpClient, NetError, Request, SharedCookieJar, Transport, Url};

use crate::config::BLANK_URL;
use crate::options::Options;
use crate::{By, DriverConfig, DriverError, Element, Page};

/// State shared by the driver, its pages and their element handles
pub(crate) struct Session {
    config: DriverConfig,
    transport: Box<dyn Transport>,
    cookies: Arc<SharedCookieJar>,
    current: RefCell<Rc<Page>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("current", &self.current.borrow().url())
            .finish_non_exhaustive()
    }
}

impl Session {
    fn new(config: DriverConfig, transport: Box<dyn Transport>, cookies: Arc<SharedCookieJar>) -> Rc<Self> {
        Rc::new_cyclic(|session| {
            let blank = Page::new(Document::empty(&config.blank_url), None, session.clone());
            Self {
                config,
                transport,
                cookies,
                current: RefCell::new(blank),
            }
        })
    }

    pub(crate) fn current(&self) -> Rc<Page> {
        Rc::clone(&self.current.borrow())
    }

    pub(crate) fn cookies(&self) -> &SharedCookieJar {
        &self.cookies
    }

    /// Make `page` current; the previous page is dropped unless a caller still holds it
    fn install(&self, page: Rc<Page>) {
        tracing::debug!("Page {:?} is now current: {}", page.id(), page.url());
        *self.current.borrow_mut() = page;
    }

    fn show_blank(self: &Rc<Self>) {
        let blank = Document::empty(&self.config.blank_url);
        self.install(Page::new(blank, None, Rc::downgrade(self)));
    }

    /// Execute `request` and swap in the parsed response.
    ///
    /// The current page is untouched unless both fetch and parse succeed.
    pub(crate) fn open(self: &Rc<Self>, request: Request) -> Result<(), DriverError> {
        let response = self.transport.execute(&request)?;
        let document = HtmlParser::new().parse_with_url(&response.text(), response.url.as_str())?;
        self.install(Page::new(document, Some(request), Rc::downgrade(self)));
        Ok(())
    }

    pub(crate) fn navigate(self: &Rc<Self>, url: &str) -> Result<(), DriverError> {
        if url == BLANK_URL {
            self.show_blank();
            return Ok(());
        }
        let target = Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{url}: {e}")))?;
        self.open(Request::get(target).ignore_http_errors(true))
    }

    fn refresh(self: &Rc<Self>) -> Result<(), DriverError> {
        let origin = self.current().origin().cloned();
        match origin {
            Some(request) => self.open(request),
            None => {
                self.show_blank();
                Ok(())
            }
        }
    }
}

/// Headless driver over static HTML.
///
/// Single-threaded: the driver, its pages and its element handles share
/// state through `Rc`.
#[derive(Debug)]
pub struct Driver {
    session: Rc<Session>,
}

impl Driver {
    /// Driver with a default HTTP client
    pub fn new() -> Result<Self, DriverError> {
        Self::with_config(DriverConfig::default())
    }

    pub fn with_config(config: DriverConfig) -> Result<Self, DriverError> {
        let cookies = Arc::new(SharedCookieJar::new());
        let client = HttpClient::builder()
            .config(config.client.clone())
            .cookie_jar(Arc::clone(&cookies))
            .build()?;
        Ok(Self {
            session: Session::new(config, Box::new(client), cookies),
        })
    }

    /// Driver over a custom transport; `cookies` is the jar the transport stores into
    pub fn with_transport(transport: impl Transport + 'static, cookies: Arc<SharedCookieJar>) -> Self {
        Self {
            session: Session::new(DriverConfig::default(), Box::new(transport), cookies),
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Load `url`; `about:blank` shows an empty page without a request
    pub fn get(&self, url: &str) -> Result<(), DriverError> {
        self.session.navigate(url)
    }

    pub fn navigate_to(&self, url: &str) -> Result<(), DriverError> {
        self.get(url)
    }

    /// Repeat the request that produced the current page
    pub fn refresh(&self) -> Result<(), DriverError> {
        self.session.refresh()
    }

    pub fn back(&self) -> Result<(), DriverError> {
        Err(DriverError::UnsupportedOperation("no navigation history".into()))
    }

    pub fn forward(&self) -> Result<(), DriverError> {
        Err(DriverError::UnsupportedOperation("no navigation history".into()))
    }

    // ========================================================================
    // Page state
    // ========================================================================

    pub fn current_page(&self) -> Rc<Page> {
        self.session.current()
    }

    pub fn current_url(&self) -> String {
        self.session.current().url()
    }

    pub fn title(&self) -> String {
        self.session.current().title()
    }

    pub fn page_source(&self) -> String {
        self.session.current().source()
    }

    pub fn find_elements(&self, by: &By) -> Result<Vec<Element>, DriverError> {
        let page = self.session.current();
        let root = page.document().tree().root();
        page.find_elements(root, by)
    }

    pub fn find_element(&self, by: &By) -> Result<Element, DriverError> {
        let page = self.session.current();
        let root = page.document().tree().root();
        page.find_element(root, by)
    }

    /// Cookies, timeouts, window and logs
    pub fn manage(&self) -> Options {
        Options::new(Rc::clone(&self.session))
    }

    /// Jar shared with the HTTP transport
    pub fn cookie_jar(&self) -> Arc<SharedCookieJar> {
        Arc::clone(&self.session.cookies)
    }

    // ========================================================================
    // Windows
    // ========================================================================

    pub fn window_handle(&self) -> String {
        String::new()
    }

    pub fn window_handles(&self) -> HashSet<String> {
        HashSet::new()
    }

    pub fn close(&self) {}

    pub fn quit(&self) {}

    pub fn switch_to(&self) -> Result<(), DriverError> {
        Err(DriverError::UnsupportedOperation("windows and frames are not supported".into()))
    }
}
