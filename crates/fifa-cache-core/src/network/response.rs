use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::{Origin, Url};

/// How a response relates to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin, not redirected
    Basic,
    Cors,
    /// Cross-origin, contents not trusted for caching
    Opaque,
    /// Same-origin but reached through a redirect
    OpaqueRedirect,
    Error,
}

impl ResponseType {
    /// Classify a response fetched for `requested` that ended up at `final_url`.
    pub fn classify(origin: &Origin, requested: &Url, final_url: &Url) -> Self {
        if &final_url.origin() != origin {
            ResponseType::Opaque
        } else if strip_fragment(requested) != strip_fragment(final_url) {
            ResponseType::OpaqueRedirect
        } else {
            ResponseType::Basic
        }
    }
}

fn strip_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// A response snapshot: status, headers and the full body.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
    url: Option<Url>,
    response_type: ResponseType,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            url: None,
            response_type: ResponseType::Basic,
        }
    }

    /// 200 OK with the given body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Only exact 200s of type `basic` are written back into the cache.
    /// Redirects, opaque cross-origin responses and every other status are
    /// passed through untouched.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.response_type == ResponseType::Basic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_basic() {
        let origin = url("http://localhost:3000").origin();
        let requested = url("http://localhost:3000/js/app.js");
        assert_eq!(
            ResponseType::classify(&origin, &requested, &requested),
            ResponseType::Basic
        );
    }

    #[test]
    fn test_classify_redirect_and_cross_origin() {
        let origin = url("http://localhost:3000").origin();
        let requested = url("http://localhost:3000/old");
        assert_eq!(
            ResponseType::classify(&origin, &requested, &url("http://localhost:3000/new")),
            ResponseType::OpaqueRedirect
        );
        assert_eq!(
            ResponseType::classify(&origin, &requested, &url("https://cdn.example.com/new")),
            ResponseType::Opaque
        );
    }

    #[test]
    fn test_cacheable_only_basic_200() {
        assert!(Response::ok("hi").is_cacheable());
        assert!(!Response::new(StatusCode::NOT_FOUND, "").is_cacheable());
        assert!(!Response::new(StatusCode::NO_CONTENT, "").is_cacheable());
        assert!(!Response::ok("hi").with_type(ResponseType::Opaque).is_cacheable());
        assert!(!Response::ok("hi")
            .with_type(ResponseType::OpaqueRedirect)
            .is_cacheable());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = Response::ok("body").with_header("Content-Type", "text/html");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("etag"), None);
    }
}
