//! Form submission encoding
//!
//! Turns collected name/value pairs into a [`Request`] the way a browser
//! submits a form: GET appends them to the action's query, POST sends them
//! in the body using the form's enctype.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::{Method, Request};

/// Form encoding type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormEnctype {
    #[default]
    UrlEncoded,
    Multipart,
    TextPlain,
}

impl FormEnctype {
    /// Map an `enctype` attribute value; unknown values fall back to url-encoding
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "multipart/form-data" => Self::Multipart,
            "text/plain" => Self::TextPlain,
            _ => Self::UrlEncoded,
        }
    }
}

/// Collected form data
#[derive(Debug, Clone)]
pub struct FormData {
    pub action: Url,
    pub method: Method,
    pub enctype: FormEnctype,
    /// Fields in submission order; names may repeat
    pub fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new(action: Url, method: Method) -> Self {
        Self {
            action,
            method,
            enctype: FormEnctype::UrlEncoded,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: &str) {
        self.fields.push((name.to_string(), value.to_string()));
    }

    /// Encode as `application/x-www-form-urlencoded`
    pub fn encode_urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    /// Encode as multipart/form-data body
    pub fn encode_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in &self.fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name.replace('"', "%22")).as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    /// Encode as `text/plain`, one `name=value` per line
    pub fn encode_text_plain(&self) -> String {
        self.fields.iter().map(|(n, v)| format!("{n}={v}\r\n")).collect()
    }

    /// Build the request that submits this form
    pub fn into_request(self) -> Request {
        match self.method {
            Method::Get => {
                let mut url = self.action.clone();
                if !self.fields.is_empty() {
                    url.query_pairs_mut().extend_pairs(self.fields.iter());
                }
                Request::get(url)
            }
            Method::Post => {
                let (content_type, body) = match self.enctype {
                    FormEnctype::UrlEncoded => (
                        "application/x-www-form-urlencoded".to_string(),
                        self.encode_urlencoded().into_bytes(),
                    ),
                    FormEnctype::Multipart => {
                        let boundary = new_boundary();
                        (
                            format!("multipart/form-data; boundary={boundary}"),
                            self.encode_multipart(&boundary),
                        )
                    }
                    FormEnctype::TextPlain => ("text/plain".to_string(), self.encode_text_plain().into_bytes()),
                };
                Request::post(self.action)
                    .with_header("Content-Type", &content_type)
                    .with_body(body)
            }
        }
    }
}

fn new_boundary() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("----snapdriver{:08x}{:04x}", nanos, COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(method: Method) -> FormData {
        let mut data = FormData::new(Url::parse("http://localhost/submit?x=1").unwrap(), method);
        data.push("q", "rust lang");
        data.push("tag", "a&b");
        data.push("tag", "c");
        data
    }

    #[test]
    fn test_enctype_from_attr() {
        assert_eq!(FormEnctype::from_attr("Multipart/Form-Data"), FormEnctype::Multipart);
        assert_eq!(FormEnctype::from_attr("text/plain"), FormEnctype::TextPlain);
        assert_eq!(FormEnctype::from_attr("bogus"), FormEnctype::UrlEncoded);
    }

    #[test]
    fn test_get_appends_query() {
        let req = form(Method::Get).into_request();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.url.as_str(), "http://localhost/submit?x=1&q=rust+lang&tag=a%26b&tag=c");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_post_urlencoded() {
        let req = form(Method::Post).into_request();
        assert_eq!(req.header("Content-Type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(req.body.as_deref(), Some(&b"q=rust+lang&tag=a%26b&tag=c"[..]));
    }

    #[test]
    fn test_post_multipart() {
        let mut data = form(Method::Post);
        data.enctype = FormEnctype::Multipart;
        let req = data.into_request();
        let content_type = req.header("content-type").unwrap().to_string();
        let boundary = content_type.strip_prefix("multipart/form-data; boundary=").unwrap();
        let body = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("name=\"q\"\r\n\r\nrust lang\r\n"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_text_plain() {
        let mut data = form(Method::Post);
        data.enctype = FormEnctype::TextPlain;
        assert_eq!(data.encode_text_plain(), "q=rust lang\r\ntag=a&b\r\ntag=c\r\n");
    }
}
