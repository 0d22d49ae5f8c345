//! The relay client.
//!
//! A [`RelayClient`] is created for one inbound request. It captures the
//! caller's session cookie once, owns its own HTTP transport, and forwards the
//! cookie on every outbound call it makes.
//!
//! # Missing session
//!
//! When the inbound request carried no session cookie, every send method
//! returns a locally built `500 Internal Server Error` response without
//! touching the network. Callers never check for the token themselves.
//!
//! # Lifecycle
//!
//! `Ready` after construction, `Closed` after [`RelayClient::close`]. Any
//! operation on a closed client fails with [`ClientError::Closed`].

use log::{debug, error};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use url::Url;

use relay_common::json::to_json_string;
use relay_common::{InboundContext, RelayConfig, SessionSource, SessionToken, SessionTokenExtractor};

use crate::error::{ClientError, Result};
use crate::request::RelayRequest;
use crate::transport::build_transport;

/// Body of the local response returned when no session cookie was captured.
pub const TOKEN_UNAVAILABLE_MESSAGE: &str =
    "Session cookie from inbound request was not available, failed to send request";

/// Scheme used when a target is addressed by explicit port.
pub const OUTBOUND_SCHEME: &str = "https";

/// `Content-Type` for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// Client for calling sibling services on behalf of the current caller.
///
/// # Examples
///
/// ```no_run
/// use relay_client::{APPLICATION_JSON, RelayClient, RelayRequest};
/// use relay_common::{InboundContext, RelayConfig};
///
/// # async fn example(context: InboundContext) -> anyhow::Result<()> {
/// let config = RelayConfig::builder().target_host("services.internal").build();
/// let mut client = RelayClient::for_context(&config, &context)?;
///
/// let url = client.resolve_target("inventory")?;
/// let request = RelayRequest::new(url).path("items");
/// let response = client
///     .post_json_with_content(request, &serde_json::json!({"sku": "A-1"}), APPLICATION_JSON)
///     .await?;
///
/// println!("{}", response.status());
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct RelayClient {
    token: Option<SessionToken>,
    base_url: Url,
    target_host: String,
    transport: Option<Client>,
}

impl RelayClient {
    /// Creates a client for a request served at `base_url`.
    ///
    /// The session cookie named by `config.token_cookie_name` is read from
    /// `session` once, here. A missing cookie is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportInit`] if the transport cannot be built.
    pub fn new<S>(config: &RelayConfig, base_url: &Url, session: &S) -> Result<Self>
    where
        S: SessionSource + ?Sized,
    {
        let token = SessionTokenExtractor::new(config.token_cookie_name.as_str()).extract(session);
        let transport = build_transport(config)?;

        Ok(Self {
            token,
            base_url: base_url.clone(),
            target_host: config.target_host.clone(),
            transport: Some(transport),
        })
    }

    /// Creates a client for an inbound request context.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TransportInit`] if the transport cannot be built.
    pub fn for_context(config: &RelayConfig, context: &InboundContext) -> Result<Self> {
        Self::new(config, context.base_url(), context)
    }

    /// Whether a session token was captured.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// The inbound base URL this client was created for.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The host outbound calls are addressed to.
    #[must_use]
    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    /// Resolves a service on the same port as the inbound request.
    ///
    /// Yields `<inbound scheme>://<target host>:<inbound port>/<context_root>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed or the URL cannot be built.
    pub fn resolve_target(&self, context_root: &str) -> Result<Url> {
        self.transport()?;

        let port = self.base_url.port_or_known_default().ok_or_else(|| {
            ClientError::InvalidTarget(format!("inbound URL {} has no port", self.base_url))
        })?;

        self.build_target(self.base_url.scheme(), port, context_root)
    }

    /// Resolves a service listening on `port`.
    ///
    /// Yields `https://<target host>:<port>/<context_root>` whatever the
    /// inbound scheme and port.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed or the URL cannot be built.
    pub fn resolve_target_on_port(&self, port: u16, context_root: &str) -> Result<Url> {
        self.transport()?;
        self.build_target(OUTBOUND_SCHEME, port, context_root)
    }

    /// Sends a request with the given method and no body.
    ///
    /// Returns the downstream response as received, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed or the request cannot be
    /// delivered.
    pub async fn send(&self, request: RelayRequest, method: Method) -> Result<Response> {
        self.dispatch(request, method, None).await
    }

    /// Sends a `PUT` with a pre-serialized body.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed, the content type is not a
    /// valid header value, or the request cannot be delivered.
    pub async fn put_with_content(
        &self,
        request: RelayRequest,
        body: impl Into<String> + Send,
        content_type: &str,
    ) -> Result<Response> {
        self.dispatch(request, Method::PUT, Some((body.into(), content_type)))
            .await
    }

    /// Serializes `value` to JSON and sends it as a `PUT`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SerializationError`] if `value` cannot be
    /// encoded, otherwise as [`put_with_content`](Self::put_with_content).
    pub async fn put_json_with_content<T>(
        &self,
        request: RelayRequest,
        value: &T,
        content_type: &str,
    ) -> Result<Response>
    where
        T: Serialize + Sync + ?Sized,
    {
        let body = to_json_string(value)?;
        self.put_with_content(request, body, content_type).await
    }

    /// Sends a `POST` with a pre-serialized body.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed, the content type is not a
    /// valid header value, or the request cannot be delivered.
    pub async fn post_with_content(
        &self,
        request: RelayRequest,
        body: impl Into<String> + Send,
        content_type: &str,
    ) -> Result<Response> {
        self.dispatch(request, Method::POST, Some((body.into(), content_type)))
            .await
    }

    /// Serializes `value` to JSON and sends it as a `POST`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SerializationError`] if `value` cannot be
    /// encoded, otherwise as [`post_with_content`](Self::post_with_content).
    pub async fn post_json_with_content<T>(
        &self,
        request: RelayRequest,
        value: &T,
        content_type: &str,
    ) -> Result<Response>
    where
        T: Serialize + Sync + ?Sized,
    {
        let body = to_json_string(value)?;
        self.post_with_content(request, body, content_type).await
    }

    /// Releases the transport. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            debug!("Relay client for {} closed", self.base_url);
        }
    }

    fn transport(&self) -> Result<&Client> {
        self.transport.as_ref().ok_or(ClientError::Closed)
    }

    fn build_target(&self, scheme: &str, port: u16, context_root: &str) -> Result<Url> {
        let raw = format!(
            "{scheme}://{}:{port}/{}",
            self.target_host,
            context_root.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| ClientError::InvalidTarget(format!("'{raw}': {e}")))
    }

    async fn dispatch(
        &self,
        request: RelayRequest,
        method: Method,
        body: Option<(String, &str)>,
    ) -> Result<Response> {
        let transport = self.transport()?;

        let body = body
            .map(|(body, content_type)| {
                HeaderValue::from_str(content_type)
                    .map(|content_type| (body, content_type))
                    .map_err(|e| {
                        ClientError::InvalidHeader(format!("content type '{content_type}': {e}"))
                    })
            })
            .transpose()?;

        let Some(token) = self.token.as_ref() else {
            error!("{TOKEN_UNAVAILABLE_MESSAGE}");
            return Ok(token_unavailable_response());
        };

        let mut cookie = HeaderValue::from_str(&token.cookie_pair())
            .map_err(|e| ClientError::InvalidHeader(format!("session cookie: {e}")))?;
        cookie.set_sensitive(true);

        let (url, mut headers) = request.into_parts();
        // Exactly one Cookie header: the relayed session
        headers.insert(COOKIE, cookie);

        debug!("Relaying {method} {url}");
        let mut builder = transport.request(method, url);
        if let Some((body, content_type)) = body {
            headers.insert(CONTENT_TYPE, content_type);
            builder = builder.body(body);
        }

        let response = builder.headers(headers).send().await?;
        debug!(
            "Relay call to {} returned {}",
            response.url(),
            response.status()
        );

        Ok(response)
    }
}

fn token_unavailable_response() -> Response {
    let mut response = http::Response::new(TOKEN_UNAVAILABLE_MESSAGE.to_string());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Response::from(response)
}

// Custom Debug implementation to avoid exposing the session token
impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url.as_str())
            .field("target_host", &self.target_host)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::collections::HashMap;

    use relay_common::NoSession;
    use reqwest::header::{HeaderMap, HeaderName};
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;

    const TOKEN_COOKIE: &str = "LtpaToken2=abc123";

    fn inbound_headers(cookie: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(cookie));
        headers
    }

    /// A client whose resolved targets land on the mock server.
    fn client_for(server: &MockServer, cookie: Option<&'static str>) -> RelayClient {
        let config = RelayConfig::builder()
            .target_host(server.address().ip().to_string())
            .build();
        let context = InboundContext::parse(&format!("{}/", server.uri())).unwrap();
        let context = match cookie {
            Some(cookie) => context.with_headers(inbound_headers(cookie)),
            None => context,
        };

        RelayClient::for_context(&config, &context).unwrap()
    }

    fn offline_client(target_host: &str, base_url: &str) -> RelayClient {
        let config = RelayConfig::builder().target_host(target_host).build();
        RelayClient::new(&config, &Url::parse(base_url).unwrap(), &NoSession).unwrap()
    }

    fn single_cookie(request: &Request) -> bool {
        request.headers.get_all(COOKIE).iter().count() == 1
    }

    #[test]
    fn test_resolve_target_uses_target_host() {
        let client = offline_client("example.internal", "https://app.public:9443/api/");
        let url = client.resolve_target("svcA").unwrap();
        assert_eq!(url.as_str(), "https://example.internal:9443/svcA");
    }

    #[test]
    fn test_resolve_target_keeps_inbound_scheme() {
        let client = offline_client("localhost", "http://app.public:9080/");
        let url = client.resolve_target("/svcA").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9080/svcA");
    }

    #[test]
    fn test_resolve_target_on_port_ignores_inbound_port() {
        let client = offline_client("example.internal", "http://app.public:9443/");
        let url = client.resolve_target_on_port(8443, "svcB").unwrap();
        assert_eq!(url.as_str(), "https://example.internal:8443/svcB");
    }

    #[test]
    fn test_resolve_target_rejects_bad_host() {
        let client = offline_client("bad host", "https://app.public:9443/");
        assert!(matches!(
            client.resolve_target("svcA"),
            Err(ClientError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_token_captured_once_at_construction() {
        let config = RelayConfig::default();
        let context = InboundContext::parse("https://app.public:9443/")
            .unwrap()
            .with_headers(inbound_headers(TOKEN_COOKIE));

        let client = RelayClient::for_context(&config, &context).unwrap();
        assert!(client.has_token());

        let client = RelayClient::new(&config, context.base_url(), &NoSession).unwrap();
        assert!(!client.has_token());
    }

    #[test]
    fn test_close_is_idempotent_and_isolated() {
        let mut first = offline_client("localhost", "https://app.public:9443/");
        let second = offline_client("localhost", "https://app.public:9443/");

        first.close();
        first.close();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert!(second.resolve_target("svcA").is_ok());
    }

    #[test]
    fn test_resolve_after_close_is_rejected() {
        let mut client = offline_client("localhost", "https://app.public:9443/");
        client.close();

        assert!(matches!(
            client.resolve_target("svcA"),
            Err(ClientError::Closed)
        ));
        assert!(matches!(
            client.resolve_target_on_port(8443, "svcB"),
            Err(ClientError::Closed)
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RelayConfig::default();
        let context = InboundContext::parse("https://app.public:9443/")
            .unwrap()
            .with_headers(inbound_headers("LtpaToken2=super-secret"));
        let client = RelayClient::for_context(&config, &context).unwrap();

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret"));
    }

    #[tokio::test]
    async fn test_send_attaches_cookie_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/svcA/items"))
            .and(header("cookie", TOKEN_COOKIE))
            .and(single_cookie)
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let url = client.resolve_target("svcA").unwrap();
        // A caller-supplied cookie must not survive next to the session cookie
        let request = RelayRequest::new(url)
            .path("items")
            .header(COOKIE, HeaderValue::from_static("stale=1"));

        let response = client.send(request, Method::GET).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_send_arbitrary_method() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/svcA/items/7"))
            .and(header("cookie", TOKEN_COOKIE))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap()).path("items/7");

        let response = client.send(request, Method::DELETE).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let mock_server = MockServer::start().await;

        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, None);
        let url = client.resolve_target("svcA").unwrap();

        let responses = vec![
            client
                .send(RelayRequest::new(url.clone()), Method::GET)
                .await
                .unwrap(),
            client
                .put_with_content(RelayRequest::new(url.clone()), "{}", APPLICATION_JSON)
                .await
                .unwrap(),
            client
                .post_json_with_content(
                    RelayRequest::new(url),
                    &serde_json::json!({"a": 1}),
                    APPLICATION_JSON,
                )
                .await
                .unwrap(),
        ];

        for response in responses {
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(response.text().await.unwrap(), TOKEN_UNAVAILABLE_MESSAGE);
        }
    }

    struct InjectingSession;

    impl SessionSource for InjectingSession {
        fn session_cookie(&self, _name: &str) -> relay_common::Result<Option<String>> {
            Ok(Some("abc\n123".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unsendable_token_is_treated_as_missing() {
        let mock_server = MockServer::start().await;

        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let config = RelayConfig::builder()
            .target_host(mock_server.address().ip().to_string())
            .build();
        let base_url = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
        let client = RelayClient::new(&config, &base_url, &InjectingSession).unwrap();
        assert!(!client.has_token());

        let url = client.resolve_target("svcA").unwrap();
        let response = client.send(RelayRequest::new(url), Method::GET).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), TOKEN_UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_downstream_error_passes_through() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/svcA"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("x-downstream", "inventory")
                    .set_body_string("no such item"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap());

        let response = client.send(request, Method::GET).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-downstream").unwrap(), "inventory");
        assert_eq!(response.text().await.unwrap(), "no such item");
    }

    #[tokio::test]
    async fn test_put_json_matches_put_string() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/svcA"))
            .and(header("cookie", TOKEN_COOKIE))
            .and(header("content-type", APPLICATION_JSON))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let url = client.resolve_target("svcA").unwrap();

        client
            .put_json_with_content(
                RelayRequest::new(url.clone()),
                &serde_json::json!({"a": 1}),
                APPLICATION_JSON,
            )
            .await
            .unwrap();
        client
            .put_with_content(RelayRequest::new(url), r#"{"a":1}"#, APPLICATION_JSON)
            .await
            .unwrap();

        let received = mock_server.received_requests().await.unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].url, received[1].url);
        assert_eq!(received[0].body, received[1].body);
        assert_eq!(
            received[0].headers.get(CONTENT_TYPE),
            received[1].headers.get(CONTENT_TYPE)
        );
    }

    #[tokio::test]
    async fn test_post_json_matches_post_string() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/svcA/orders"))
            .and(header("cookie", TOKEN_COOKIE))
            .and(header("content-type", "application/vnd.orders+json"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap()).path("orders");

        let from_value = client
            .post_json_with_content(
                request.clone(),
                &serde_json::json!({"a": 1}),
                "application/vnd.orders+json",
            )
            .await
            .unwrap();
        let from_string = client
            .post_with_content(request, r#"{"a":1}"#, "application/vnd.orders+json")
            .await
            .unwrap();

        assert_eq!(from_value.status(), StatusCode::CREATED);
        assert_eq!(from_string.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unserializable_body_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let url = client.resolve_target("svcA").unwrap();

        let mut value = HashMap::new();
        value.insert((1, 2), "non-string key");

        let put = client
            .put_json_with_content(RelayRequest::new(url.clone()), &value, APPLICATION_JSON)
            .await;
        let post = client
            .post_json_with_content(RelayRequest::new(url), &value, APPLICATION_JSON)
            .await;

        assert!(matches!(put, Err(ClientError::SerializationError(_))));
        assert!(matches!(post, Err(ClientError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_invalid_content_type() {
        let mock_server = MockServer::start().await;
        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap());

        let result = client
            .post_with_content(request, "{}", "application/json\n")
            .await;

        assert!(matches!(result, Err(ClientError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let mock_server = MockServer::start().await;
        let mut client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap());

        client.close();

        let result = client.send(request, Method::GET).await;
        assert!(matches!(result, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn test_connection_failure_surfaces_once() {
        let mock_server = MockServer::start().await;
        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap());
        drop(mock_server);

        let result = client.send(request, Method::GET).await;
        assert!(matches!(result, Err(ClientError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_extra_headers_are_forwarded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("x-request-id", "req-1"))
            .and(header("accept", APPLICATION_JSON))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server, Some(TOKEN_COOKIE));
        let request = RelayRequest::new(client.resolve_target("svcA").unwrap())
            .accept(APPLICATION_JSON)
            .header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("req-1"),
            );

        let response = client.send(request, Method::GET).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
