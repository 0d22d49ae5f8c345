//! The inbound request a relay client is created for.

use http::HeaderMap;
use http::header::{AsHeaderName, HOST};
use http::request::Parts;
use url::Url;

use crate::error::{CommonError, Result};
use crate::session::SessionSource;

/// Scheme assumed when neither the request URI nor a proxy header names one.
pub const DEFAULT_INBOUND_SCHEME: &str = "https";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Address and headers of the request currently being served.
///
/// The relay client takes the scheme and port of outbound calls from here,
/// and reads the session cookie from the headers.
#[derive(Debug, Clone)]
pub struct InboundContext {
    base_url: Url,
    headers: HeaderMap,
}

impl InboundContext {
    /// Creates a context from a base URL and the inbound headers.
    #[must_use]
    pub const fn new(base_url: Url, headers: HeaderMap) -> Self {
        Self { base_url, headers }
    }

    /// Creates a context without headers from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or has no host.
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| CommonError::Context(format!("invalid base URL '{base_url}': {e}")))?;

        if url.host_str().is_none() {
            return Err(CommonError::Context(format!(
                "base URL '{base_url}' has no host"
            )));
        }

        Ok(Self::new(url, HeaderMap::new()))
    }

    /// Builds a context from the parts of an inbound HTTP request.
    ///
    /// The scheme comes from the request URI, then `X-Forwarded-Proto`, then
    /// [`DEFAULT_INBOUND_SCHEME`]. The authority comes from the request URI,
    /// then the `Host` header.
    ///
    /// # Errors
    ///
    /// Returns an error if no host can be determined.
    pub fn from_parts(parts: &Parts) -> Result<Self> {
        let scheme = parts
            .uri
            .scheme_str()
            .map(str::to_string)
            .or_else(|| {
                header_str(&parts.headers, X_FORWARDED_PROTO)
                    .and_then(|proto| proto.split(',').next())
                    .map(|proto| proto.trim().to_ascii_lowercase())
            })
            .filter(|scheme| !scheme.is_empty())
            .unwrap_or_else(|| DEFAULT_INBOUND_SCHEME.to_string());

        let authority = parts
            .uri
            .authority()
            .map(|authority| authority.as_str().to_string())
            .or_else(|| header_str(&parts.headers, HOST).map(str::to_string))
            .ok_or_else(|| CommonError::Context("inbound request has no host".to_string()))?;

        let mut context = Self::parse(&format!("{scheme}://{authority}/"))?;
        context.headers = parts.headers.clone();
        Ok(context)
    }

    /// Replaces the inbound headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The inbound base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The inbound scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.base_url.scheme()
    }

    /// The inbound host.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.base_url.host_str()
    }

    /// The inbound port, or the scheme's well-known port.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.base_url.port_or_known_default()
    }

    /// The inbound headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl SessionSource for InboundContext {
    fn session_cookie(&self, name: &str) -> Result<Option<String>> {
        self.headers.session_cookie(name)
    }
}

fn header_str(headers: &HeaderMap, name: impl AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
