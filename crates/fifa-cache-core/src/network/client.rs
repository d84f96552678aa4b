//! Network path used on cache misses and during install.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::{Origin, Url};

use super::{FetchError, Request, Response, ResponseType};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Sends a request to the real network.
///
/// A returned `Ok` means a response arrived, whatever its status. `Err` means
/// no response was obtained at all (offline, DNS failure, timeout).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<Response, FetchError>;
}

/// `reqwest`-backed network.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Origin,
}

impl HttpNetwork {
    /// Create a client whose responses are classified relative to `origin`
    pub fn new(origin: &Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            origin: origin.origin(),
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        let url_str = request.url().as_str().to_string();

        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::from_transport(&url_str, e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let response_type = ResponseType::classify(&self.origin, request.url(), &final_url);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(&url_str, e))?;

        debug!(
            url = %url_str,
            status = status.as_u16(),
            kind = ?response_type,
            bytes = body.len(),
            "Network response"
        );

        Ok(Response::new(status, body)
            .with_headers(headers)
            .with_url(final_url)
            .with_type(response_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, StatusCode};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn network_for(server: &MockServer) -> (HttpNetwork, Url) {
        let base = Url::parse(&server.uri()).unwrap();
        let network = HttpNetwork::new(&base, Duration::from_secs(5)).unwrap();
        (network, base)
    }

    #[tokio::test]
    async fn test_fetch_basic_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/js/app.js"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("console.log('fifa');", "application/javascript"),
            )
            .mount(&server)
            .await;

        let (network, base) = network_for(&server);
        let response = network
            .fetch(Request::get(base.join("/js/app.js").unwrap()))
            .await
            .expect("fetch failed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.response_type(), ResponseType::Basic);
        assert_eq!(response.body().as_ref(), b"console.log('fifa');");
        assert_eq!(response.header("content-type"), Some("application/javascript"));
        assert!(response.is_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_ok_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (network, base) = network_for(&server);
        let response = network
            .fetch(Request::get(base.join("/missing.png").unwrap()))
            .await
            .expect("a 404 is still a response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.is_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_followed_redirect_is_not_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let (network, base) = network_for(&server);
        let response = network
            .fetch(Request::get(base.join("/old").unwrap()))
            .await
            .expect("fetch failed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.response_type(), ResponseType::OpaqueRedirect);
        assert!(!response.is_cacheable());
    }

    #[tokio::test]
    async fn test_fetch_sends_method_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/matches"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let (network, base) = network_for(&server);
        let request = Request::new(Method::POST, base.join("/api/matches").unwrap())
            .with_header("content-type", "application/json")
            .with_body(r#"{"home":"ARG"}"#);
        let response = network.fetch(request).await.expect("fetch failed");

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_error() {
        // Port 9 (discard) is not listening on test hosts
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let network = HttpNetwork::new(&base, Duration::from_secs(2)).unwrap();
        let result = network
            .fetch(Request::get(base.join("/index.html").unwrap()))
            .await;

        assert!(result.is_err());
    }
}
