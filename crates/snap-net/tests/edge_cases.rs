//! Edge case tests for snap-net
//!
//! Cookie scoping, form submission requests and the transport seam.

use std::cell::RefCell;

use snap_net::*;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

// ============================================================================
// COOKIE JAR TESTS
// ============================================================================

#[test]
fn test_cookie_replaced_by_name_domain_path() {
    let mut jar = CookieJar::new();
    let page = url("http://shop.test/cart/view");
    jar.add_from_header("id=1; Path=/", &page);
    jar.add_from_header("id=2; Path=/", &page);
    jar.add_from_header("id=3; Path=/cart", &page);

    assert_eq!(jar.len(), 2);
    assert_eq!(jar.cookie_header(&page).unwrap(), "id=2; id=3");
    assert_eq!(jar.cookie_header(&url("http://shop.test/")).unwrap(), "id=2");
}

#[test]
fn test_host_only_cookie_not_sent_to_subdomain() {
    let mut jar = CookieJar::new();
    jar.add_from_header("a=1; Path=/", &url("http://example.test/"));
    jar.add_from_header("b=2; Path=/; Domain=example.test", &url("http://example.test/"));

    let sub = url("http://www.example.test/");
    let names: Vec<_> = jar.matching(&sub).iter().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["b"]);
}

#[test]
fn test_attribute_names_case_insensitive() {
    let cookie = parse_set_cookie("k=v; path=/x; HTTPONLY; secure; samesite=Strict", &url("https://h.test/")).unwrap();
    assert_eq!(cookie.path, "/x");
    assert!(cookie.http_only);
    assert!(cookie.secure);
    assert_eq!(cookie.same_site, SameSite::Strict);
}

#[test]
fn test_max_age_beats_expires() {
    let page = url("http://h.test/");
    let cookie = parse_set_cookie("k=v; Max-Age=3600; Expires=Thu, 01 Jan 1970 00:00:00 GMT", &page).unwrap();
    assert!(!cookie.is_expired());
    let cookie = parse_set_cookie("k=v; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=3600", &page).unwrap();
    assert!(!cookie.is_expired());
}

#[test]
fn test_malformed_set_cookie_ignored() {
    let page = url("http://h.test/");
    assert!(parse_set_cookie("novalue", &page).is_none());
    assert!(parse_set_cookie("=v", &page).is_none());
    let mut jar = CookieJar::new();
    jar.add_from_header("", &page);
    assert!(jar.is_empty());
}

// ============================================================================
// FORM SUBMISSION TESTS
// ============================================================================

#[test]
fn test_get_form_without_fields_keeps_action() {
    let data = FormData::new(url("http://h.test/search"), Method::Get);
    let req = data.into_request();
    assert_eq!(req.url.as_str(), "http://h.test/search");
}

#[test]
fn test_post_form_unicode() {
    let mut data = FormData::new(url("http://h.test/post"), Method::Post);
    data.push("name", "Zoë");
    let req = data.into_request();
    assert_eq!(req.body.as_deref(), Some(&b"name=Zo%C3%AB"[..]));
}

// ============================================================================
// TRANSPORT TESTS
// ============================================================================

struct Recorder {
    seen: RefCell<Vec<String>>,
}

impl Transport for Recorder {
    fn execute(&self, request: &Request) -> Result<Response, NetError> {
        self.seen.borrow_mut().push(format!("{} {}", request.method.as_str(), request.url));
        if request.url.path() == "/missing" && !request.ignore_http_errors {
            return Err(NetError::HttpError {
                status: 404,
                url: request.url.to_string(),
            });
        }
        Ok(Response {
            status: 200,
            url: request.url.clone(),
            headers: Vec::new(),
            body: b"<p>ok</p>".to_vec(),
        })
    }
}

#[test]
fn test_transport_trait_object() {
    let recorder = Recorder {
        seen: RefCell::new(Vec::new()),
    };
    let transport: &dyn Transport = &recorder;

    let resp = transport.execute(&Request::get(url("http://h.test/"))).unwrap();
    assert_eq!(resp.text(), "<p>ok</p>");

    let err = transport.execute(&Request::get(url("http://h.test/missing"))).unwrap_err();
    assert!(matches!(err, NetError::HttpError { status: 404, .. }));
    assert!(err.to_string().contains("404"));

    let ok = transport.execute(&Request::get(url("http://h.test/missing")).ignore_http_errors(true));
    assert!(ok.is_ok());
    assert_eq!(recorder.seen.borrow().len(), 3);
}
