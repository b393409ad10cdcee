//! In-memory site used by the driver integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use snap_driver::{Driver, NetError, Request, Response, SharedCookieJar, Transport};
use url::Url;

pub const BASE: &str = "http://site.test";

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

/// Canned response for one path
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: String,
    pub set_cookies: Vec<String>,
    pub redirect: Option<String>,
}

impl Route {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            set_cookies: Vec::new(),
            redirect: None,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn set_cookie(mut self, header: &str) -> Self {
        self.set_cookies.push(header.to_string());
        self
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            status: 302,
            body: String::new(),
            set_cookies: Vec::new(),
            redirect: Some(to.to_string()),
        }
    }
}

/// Static site keyed by URL path. `/echo` reflects the request back as HTML.
pub struct StaticSite {
    routes: HashMap<String, Route>,
    requests: Rc<RefCell<Vec<Request>>>,
    jar: Arc<SharedCookieJar>,
}

impl StaticSite {
    fn route(&self, url: &Url, request: &Request) -> Route {
        if url.path() == "/echo" {
            let body = String::from_utf8_lossy(request.body.as_deref().unwrap_or_default()).into_owned();
            let cookies = self.jar.read().cookie_header(url).unwrap_or_default();
            return Route::html(&format!(
                "<html><head><title>Echo</title></head><body>\
                 <p id=\"method\">{}</p><p id=\"query\">{}</p><p id=\"body\">{}</p>\
                 <p id=\"type\">{}</p><p id=\"cookies\">{}</p></body></html>",
                request.method.as_str(),
                escape(url.query().unwrap_or_default()),
                escape(&body),
                escape(request.header("Content-Type").unwrap_or_default()),
                escape(&cookies),
            ));
        }
        self.routes.get(url.path()).cloned().unwrap_or_else(|| {
            Route::html("<html><head><title>Not Found</title></head><body><h1>Not Found</h1></body></html>")
                .status(404)
        })
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

impl Transport for StaticSite {
    fn execute(&self, request: &Request) -> Result<Response, NetError> {
        self.requests.borrow_mut().push(request.clone());

        let mut url = request.url.clone();
        for _ in 0..10 {
            let route = self.route(&url, request);
            {
                let mut jar = self.jar.write();
                for header in &route.set_cookies {
                    jar.add_from_header(header, &url);
                }
            }
            if let Some(target) = &route.redirect {
                url = url.join(target).map_err(|e| NetError::InvalidUrl(e.to_string()))?;
                continue;
            }
            if route.status >= 400 && !request.ignore_http_errors {
                return Err(NetError::HttpError {
                    status: route.status,
                    url: url.to_string(),
                });
            }
            return Ok(Response {
                status: route.status,
                url,
                headers: vec![("Content-Type".into(), "text/html".into())],
                body: route.body.into_bytes(),
            });
        }
        Err(NetError::Network("too many redirects".into()))
    }
}

/// Handle for inspecting what the driver sent
#[derive(Clone)]
pub struct Recorder(Rc<RefCell<Vec<Request>>>);

impl Recorder {
    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn last(&self) -> Request {
        self.0.borrow().last().cloned().expect("no request recorded")
    }
}

pub fn driver_for(routes: Vec<(&str, Route)>) -> (Driver, Recorder) {
    let jar = Arc::new(SharedCookieJar::new());
    let requests = Rc::new(RefCell::new(Vec::new()));
    let site = StaticSite {
        routes: routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect(),
        requests: Rc::clone(&requests),
        jar: Arc::clone(&jar),
    };
    (Driver::with_transport(site, jar), Recorder(requests))
}

/// Driver over a single page served at `/page.html`, already loaded
pub fn driver_with_page(html: &str) -> Driver {
    let (driver, _) = driver_for(vec![("/page.html", Route::html(html))]);
    driver.get(&url("/page.html")).expect("load page");
    driver
}
