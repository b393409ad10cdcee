//! Cookie Handling
//!
//! Cookie jar with domain/path matching. [`SharedCookieJar`] wraps a jar in a
//! lock and plugs into reqwest as its cookie store, so cookies set by any
//! response in a redirect chain land in the same jar the driver reads.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

/// Cookie attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain; a leading `.` also matches subdomains, empty means unset
    pub domain: String,
    /// Path prefix; empty means unset
    pub path: String,
    /// Expiry as seconds since the Unix epoch (None = session cookie)
    pub expires: Option<u64>,
    /// Secure flag (HTTPS only)
    pub secure: bool,
    /// HttpOnly flag
    pub http_only: bool,
    /// SameSite attribute
    pub same_site: SameSite,
}

/// SameSite attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Cookie sent with all requests
    None,
    /// Cookie not sent with cross-origin requests
    #[default]
    Lax,
    /// Cookie only sent with same-site requests
    Strict,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl Cookie {
    /// Session cookie with no domain or path yet
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: String::new(),
            path: String::new(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Check if cookie has expired
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|expires| expires <= now_secs())
    }

    /// Check if cookie matches the given host
    pub fn matches_domain(&self, host: &str) -> bool {
        if self.domain.eq_ignore_ascii_case(host) {
            return true;
        }

        // Domain matching: .example.com matches foo.example.com and example.com
        match self.domain.strip_prefix('.') {
            Some(bare) => {
                let host = host.to_ascii_lowercase();
                let bare = bare.to_ascii_lowercase();
                host == bare || host.ends_with(&format!(".{bare}"))
            }
            None => false,
        }
    }

    /// Check if cookie matches the given path
    pub fn matches_path(&self, path: &str) -> bool {
        self.path.is_empty() || self.path == "/" || path.starts_with(&self.path)
    }

    /// Check if cookie should be sent for a request to `url`
    pub fn matches_url(&self, url: &Url) -> bool {
        if self.is_expired() {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.matches_domain(host) && self.matches_path(url.path())
    }

    /// `name=value` as sent in a `Cookie` header
    pub fn to_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Directory part of a request path, used when `Path` is absent
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Parse a Set-Cookie header received for `request_url`
pub fn parse_set_cookie(header: &str, request_url: &Url) -> Option<Cookie> {
    let host = request_url.host_str()?;
    let mut parts = header.split(';');

    // First part is name=value
    let name_value = parts.next()?.trim();
    let eq_pos = name_value.find('=')?;
    let name = name_value[..eq_pos].trim();
    if name.is_empty() {
        return None;
    }
    let mut cookie = Cookie::new(name, name_value[eq_pos + 1..].trim().trim_matches('"'))
        .with_domain(host)
        .with_path(&default_path(request_url));

    let mut max_age_seen = false;
    for part in parts {
        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
            None => (part.trim().to_ascii_lowercase(), ""),
        };
        match key.as_str() {
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "domain" => {
                let domain = value.trim_start_matches('.').to_ascii_lowercase();
                if domain.is_empty() {
                    continue;
                }
                let host = host.to_ascii_lowercase();
                if host != domain && !host.ends_with(&format!(".{domain}")) {
                    tracing::warn!("Rejecting cookie {} for domain {} from host {}", cookie.name, domain, host);
                    return None;
                }
                cookie.domain = format!(".{domain}");
            }
            "path" if value.starts_with('/') => cookie.path = value.to_string(),
            "max-age" => {
                if let Ok(seconds) = value.parse::<i64>() {
                    max_age_seen = true;
                    cookie.expires = Some(if seconds <= 0 {
                        0
                    } else {
                        now_secs().saturating_add(seconds as u64)
                    });
                }
            }
            "expires" if !max_age_seen => {
                if let Some(at) = parse_http_date(value) {
                    cookie.expires = Some(at);
                }
            }
            "samesite" => {
                cookie.same_site = match value.to_ascii_lowercase().as_str() {
                    "strict" => SameSite::Strict,
                    "none" => SameSite::None,
                    _ => SameSite::Lax,
                };
            }
            _ => {}
        }
    }

    Some(cookie)
}

/// Parse an HTTP date (`Thu, 01 Jan 1970 00:00:00 GMT` and the older
/// `Thursday, 01-Jan-70 00:00:00 GMT` form) into Unix seconds
fn parse_http_date(value: &str) -> Option<u64> {
    const MONTHS: [&str; 12] = ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"];

    let (mut day, mut month, mut year, mut time) = (None, None, None, None);
    for token in value.split(|c: char| c.is_whitespace() || c == ',' || c == '-') {
        if token.is_empty() {
            continue;
        }
        if token.contains(':') {
            let mut hms = token.split(':').map(|p| p.parse::<u64>().ok());
            time = Some((hms.next()??, hms.next()??, hms.next().flatten().unwrap_or(0)));
        } else if token.chars().all(|c| c.is_ascii_digit()) {
            let n: u64 = token.parse().ok()?;
            if day.is_none() && token.len() <= 2 {
                day = Some(n);
            } else {
                year = Some(match (token.len(), n) {
                    (2, 70..=99) => 1900 + n,
                    (2, _) => 2000 + n,
                    _ => n,
                });
            }
        } else if month.is_none() {
            let lower = token.to_ascii_lowercase();
            month = MONTHS.iter().position(|m| lower.starts_with(m)).map(|m| m as u64 + 1);
        }
    }

    let (day, month, year) = (day?, month?, year?);
    let (h, m, s) = time.unwrap_or((0, 0, 0));
    if !(1..=31).contains(&day) || year < 1970 || h > 23 || m > 59 || s > 60 {
        return None;
    }
    Some(days_from_civil(year, month, day) * 86_400 + h * 3600 + m * 60 + s)
}

/// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: u64, month: u64, day: u64) -> u64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146_097 + doe).saturating_sub(719_468)
}

/// Cookie jar for storing cookies
#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    /// Cookies in insertion order
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie, replacing one with the same name, domain and path.
    ///
    /// An already-expired cookie only removes its predecessor.
    pub fn add(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| {
            !(c.name == cookie.name && c.domain.eq_ignore_ascii_case(&cookie.domain) && c.path == cookie.path)
        });

        if cookie.is_expired() {
            tracing::debug!("Dropping expired cookie {}", cookie.name);
        } else {
            self.cookies.push(cookie);
        }
    }

    /// Add from Set-Cookie header
    pub fn add_from_header(&mut self, header: &str, request_url: &Url) {
        if let Some(cookie) = parse_set_cookie(header, request_url) {
            self.add(cookie);
        }
    }

    /// Cookies to send with a request to `url`
    pub fn matching(&self, url: &Url) -> Vec<&Cookie> {
        self.cookies.iter().filter(|c| c.matches_url(url)).collect()
    }

    /// Get Cookie header value for request
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.matching(url);

        if cookies.is_empty() {
            None
        } else {
            Some(cookies.iter().map(|c| c.to_pair()).collect::<Vec<_>>().join("; "))
        }
    }

    /// First cookie called `name` that would be sent to `url`
    pub fn named(&self, url: &Url, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name && c.matches_url(url))
    }

    /// Remove the first cookie called `name` that would be sent to `url`
    pub fn remove_named(&mut self, url: &Url, name: &str) -> bool {
        match self.cookies.iter().position(|c| c.name == name && c.matches_url(url)) {
            Some(pos) => {
                self.cookies.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every cookie that would be sent to `url`
    pub fn remove_matching(&mut self, url: &Url) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(|c| !c.matches_url(url));
        before - self.cookies.len()
    }

    /// Every live cookie in the jar
    pub fn all(&self) -> Vec<&Cookie> {
        self.cookies.iter().filter(|c| !c.is_expired()).collect()
    }

    /// Remove expired cookies
    pub fn cleanup(&mut self) {
        self.cookies.retain(|c| !c.is_expired());
    }

    /// Clear all cookies
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Get total cookie count
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Lock-guarded jar shared between the driver and the HTTP client
#[derive(Debug, Default)]
pub struct SharedCookieJar {
    inner: RwLock<CookieJar>,
}

impl SharedCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access; a poisoned lock still yields the jar
    pub fn read(&self) -> RwLockReadGuard<'_, CookieJar> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access; a poisoned lock still yields the jar
    pub fn write(&self) -> RwLockWriteGuard<'_, CookieJar> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl reqwest::cookie::CookieStore for SharedCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut jar = self.write();
        for header in cookie_headers {
            match header.to_str() {
                Ok(value) => jar.add_from_header(value, url),
                Err(_) => tracing::warn!("Ignoring non-ASCII Set-Cookie header from {}", url),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self.read().cookie_header(url)?;
        HeaderValue::from_str(&header).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cookie_parse() {
        let header = "session=abc123; Path=/; HttpOnly; Secure";
        let cookie = parse_set_cookie(header, &url("https://example.com/a/b")).unwrap();

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain, "example.com");
        assert_eq!(cookie.path, "/");
        assert!(cookie.http_only);
        assert!(cookie.secure);
    }

    #[test]
    fn test_default_path_is_request_directory() {
        let cookie = parse_set_cookie("a=1", &url("http://example.com/app/login")).unwrap();
        assert_eq!(cookie.path, "/app");
        let cookie = parse_set_cookie("a=1", &url("http://example.com/login")).unwrap();
        assert_eq!(cookie.path, "/");
    }

    #[test]
    fn test_cookie_domain_match() {
        let cookie = Cookie::new("test", "value").with_domain(".example.com").with_path("/");

        assert!(cookie.matches_domain("example.com"));
        assert!(cookie.matches_domain("foo.example.com"));
        assert!(!cookie.matches_domain("badexample.com"));
        assert!(!cookie.matches_domain("other.com"));
    }

    #[test]
    fn test_foreign_domain_rejected() {
        assert!(parse_set_cookie("a=1; Domain=other.com", &url("http://example.com/")).is_none());
        let sub = parse_set_cookie("a=1; Domain=.example.com", &url("http://www.example.com/")).unwrap();
        assert_eq!(sub.domain, ".example.com");
    }

    #[test]
    fn test_http_date() {
        assert_eq!(parse_http_date("Thu, 01 Jan 1970 00:00:00 GMT"), Some(0));
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(784_111_777));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(784_111_777));
        assert_eq!(parse_http_date("not a date"), None);
    }

    #[test]
    fn test_expired_cookie_deletes() {
        let mut jar = CookieJar::new();
        let page = url("http://example.com/");
        jar.add_from_header("session=abc; Path=/", &page);
        assert_eq!(jar.len(), 1);
        jar.add_from_header("session=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT", &page);
        assert!(jar.is_empty());
        jar.add_from_header("other=x; Path=/", &page);
        jar.add_from_header("other=x; Path=/; Max-Age=0", &page);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_cookie_jar() {
        let mut jar = CookieJar::new();
        let page = url("http://example.com/");

        jar.add_from_header("session=abc123; Path=/", &page);
        jar.add_from_header("user=john; Path=/api", &page);

        let header = jar.cookie_header(&url("http://example.com/api/test")).unwrap();
        assert!(header.contains("session=abc123"));
        assert!(header.contains("user=john"));

        let header = jar.cookie_header(&page).unwrap();
        assert_eq!(header, "session=abc123");
        assert_eq!(jar.named(&page, "session").unwrap().to_pair(), header);
    }

    #[test]
    fn test_cookie_secure() {
        let mut jar = CookieJar::new();
        jar.add_from_header("secure_cookie=value; Secure", &url("https://example.com/"));

        // Secure cookie not sent on HTTP
        assert!(jar.matching(&url("http://example.com/")).is_empty());

        // Secure cookie sent on HTTPS
        assert_eq!(jar.matching(&url("https://example.com/")).len(), 1);
    }

    #[test]
    fn test_named_and_remove() {
        let mut jar = CookieJar::new();
        let page = url("http://example.com/");
        jar.add(Cookie::new("a", "1").with_domain("example.com").with_path("/"));
        jar.add(Cookie::new("b", "2").with_domain("example.com").with_path("/"));
        jar.add(Cookie::new("c", "3").with_domain("other.com").with_path("/"));

        assert_eq!(jar.named(&page, "b").map(|c| c.value.as_str()), Some("2"));
        assert!(jar.named(&page, "c").is_none());
        assert!(jar.remove_named(&page, "a"));
        assert!(!jar.remove_named(&page, "a"));
        assert_eq!(jar.remove_matching(&page), 1);
        assert_eq!(jar.all().len(), 1);
    }

    #[test]
    fn test_shared_jar_as_cookie_store() {
        use reqwest::cookie::CookieStore;

        let jar = SharedCookieJar::new();
        let page = url("http://example.com/");
        let headers = [HeaderValue::from_static("k=v; Path=/")];
        jar.set_cookies(&mut headers.iter(), &page);
        assert_eq!(jar.read().len(), 1);
        let sent = jar.cookies(&page).unwrap();
        assert_eq!(sent.to_str().unwrap(), "k=v");
    }
}
