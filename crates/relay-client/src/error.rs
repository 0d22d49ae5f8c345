//! Error types for the relay client.

use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};
use thiserror::Error;

/// Prefix of the body rendered for a client that could not be created.
pub const CLIENT_INIT_MESSAGE: &str = "Exception occurred while creating client to send request";

/// Errors that can occur when relaying a request.
///
/// A missing session token is deliberately absent from this list: it is an
/// expected condition and is answered with a local `500` response instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The HTTP transport could not be built (TLS backend initialization).
    #[error("Transport initialization error: {0}")]
    TransportInit(#[source] reqwest::Error),

    /// Network or HTTP request failure while talking to the downstream service.
    ///
    /// HTTP error statuses are not errors; they come back as the response.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A structured body could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A target URL could not be built.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// A header name or value was not valid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The client was used after `close()`.
    #[error("Relay client is closed")]
    Closed,
}

impl ClientError {
    /// Check if this error happened while constructing the client.
    pub const fn is_transport_init(&self) -> bool {
        matches!(self, Self::TransportInit(_))
    }

    /// Check if this is a serialization error.
    pub const fn is_serialization_error(&self) -> bool {
        matches!(self, Self::SerializationError(_))
    }

    /// Check if this error came from the network.
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }

    /// Check if the client had already been closed.
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// HTTP status to report to the inbound caller for this error.
    ///
    /// Failures inside the relaying service are server faults. An invalid
    /// header is a bad request, and a failed downstream call a bad gateway.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            Self::NetworkError(_) => StatusCode::BAD_GATEWAY,
            Self::TransportInit(_)
            | Self::SerializationError(_)
            | Self::InvalidTarget(_)
            | Self::Closed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders this error as a plain-text response for the inbound caller.
    #[must_use]
    pub fn into_response(self) -> http::Response<String> {
        let body = match &self {
            Self::TransportInit(e) => format!("{CLIENT_INIT_MESSAGE} : {e}"),
            other => other.to_string(),
        };

        let mut response = http::Response::new(body);
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Result type alias using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
