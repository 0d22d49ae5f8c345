//! Outbound request builder.

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// An outbound request before the method, body and session cookie are
/// applied.
///
/// Start from a URL returned by
/// [`RelayClient::resolve_target`](crate::RelayClient::resolve_target) and
/// hand the finished request to one of the client's send methods.
///
/// # Examples
///
/// ```
/// use relay_client::RelayRequest;
/// use url::Url;
///
/// let request = RelayRequest::new(Url::parse("https://localhost:9443/orders").unwrap())
///     .path("v1/items")
///     .query("status", "open");
///
/// assert_eq!(
///     request.url().as_str(),
///     "https://localhost:9443/orders/v1/items?status=open"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RelayRequest {
    url: Url,
    headers: HeaderMap,
}

impl RelayRequest {
    /// Creates a request for the given URL.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
        }
    }

    /// Appends `/`-separated path segments to the URL.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// Adds a header.
    ///
    /// A `Cookie` header set here is replaced by the session cookie when the
    /// request is sent.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the `Accept` header.
    #[must_use]
    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static(media_type));
        self
    }

    /// The target URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The headers set so far.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn into_parts(self) -> (Url, HeaderMap) {
        (self.url, self.headers)
    }
}

impl From<Url> for RelayRequest {
    fn from(url: Url) -> Self {
        Self::new(url)
    }
}
