//! Session token extraction.
//!
//! The relay forwards the caller's session cookie to downstream services.
//! Extraction is best effort: a missing cookie, a missing session, or a
//! failing session backend all produce `None`, and the client turns that into
//! a local error response instead of an unauthenticated call.

use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};
use log::{debug, error};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{CommonError, Result};

/// A session credential captured from the inbound request.
///
/// Rendered downstream as a single `name=value` cookie pair. The value is
/// kept in a [`SecretString`] and never appears in `Debug` output.
#[derive(Clone)]
pub struct SessionToken {
    name: String,
    value: SecretString,
}

impl SessionToken {
    /// Creates a token from a cookie name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SecretString::new(value.into().into()),
        }
    }

    /// The cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cookie value.
    #[must_use]
    pub fn expose_value(&self) -> &str {
        self.value.expose_secret()
    }

    /// The `name=value` pair sent in the outbound `Cookie` header.
    #[must_use]
    pub fn cookie_pair(&self) -> String {
        format!("{}={}", self.name, self.value.expose_secret())
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Anything that can look up a cookie of the current inbound session.
pub trait SessionSource {
    /// Returns the value of the named session cookie.
    ///
    /// `Ok(None)` means the session has no such cookie, or there is no
    /// session at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the session backend fails.
    fn session_cookie(&self, name: &str) -> Result<Option<String>>;
}

/// A session source for requests that carry no session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

impl SessionSource for NoSession {
    fn session_cookie(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

impl SessionSource for HeaderMap {
    fn session_cookie(&self, name: &str) -> Result<Option<String>> {
        // Header values may carry opaque bytes; only the matched value must be UTF-8.
        for header in self.get_all(COOKIE) {
            if let Some(value) = find_cookie_bytes(header.as_bytes(), name.as_bytes()) {
                let value = std::str::from_utf8(value).map_err(|e| {
                    CommonError::Session(format!("cookie {name} is not valid UTF-8: {e}"))
                })?;
                return Ok(Some(value.to_string()));
            }
        }

        Ok(None)
    }
}

/// Finds a cookie in a `Cookie` header value (`a=1; b=2`).
///
/// The first pair with a matching name wins. The value is returned verbatim.
#[must_use]
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    find_cookie_bytes(header.as_bytes(), name.as_bytes())
        .and_then(|value| std::str::from_utf8(value).ok())
}

fn find_cookie_bytes<'a>(header: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    header
        .split(|byte| *byte == b';')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, |byte| *byte == b'=');
            Some((parts.next()?.trim_ascii(), parts.next()?.trim_ascii()))
        })
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Pulls the configured session cookie out of a [`SessionSource`].
#[derive(Debug, Clone)]
pub struct SessionTokenExtractor {
    cookie_name: String,
}

impl SessionTokenExtractor {
    /// Creates an extractor for the named cookie.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    /// The cookie this extractor looks for.
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Extracts the session token, if any.
    ///
    /// Never fails: backend errors are logged and reported as `None`, as are
    /// values that cannot be sent in a `Cookie` header.
    pub fn extract<S>(&self, source: &S) -> Option<SessionToken>
    where
        S: SessionSource + ?Sized,
    {
        match source.session_cookie(&self.cookie_name) {
            Ok(Some(value)) if !value.is_empty() => {
                let token = SessionToken::new(self.cookie_name.clone(), value);
                if let Err(e) = HeaderValue::from_str(&token.cookie_pair()) {
                    error!(
                        "Session cookie {} is not a valid header value: {e}",
                        self.cookie_name
                    );
                    return None;
                }
                Some(token)
            }
            Ok(Some(_)) => {
                debug!("Session cookie {} is empty", self.cookie_name);
                None
            }
            Ok(None) => {
                debug!("No session cookie {} on inbound request", self.cookie_name);
                None
            }
            Err(e) => {
                error!(
                    "Failed to extract session cookie {}: {e}",
                    self.cookie_name
                );
                None
            }
        }
    }
}
