//! # relay-common
//!
//! Shared types for relaying an authenticated session between internal
//! services.
//!
//! This crate provides:
//! - [`RelayConfig`]: target host, session cookie name and TLS trust settings
//! - [`InboundContext`]: the address and headers of the request being served
//! - [`SessionTokenExtractor`]: best-effort capture of the session cookie
//! - [`json`]: JSON helpers used for request bodies and documents
//!
//! ## Example
//!
//! ```
//! use relay_common::{InboundContext, SessionTokenExtractor};
//! use http::header::{COOKIE, HeaderMap, HeaderValue};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(COOKIE, HeaderValue::from_static("LtpaToken2=abc123"));
//!
//! let context = InboundContext::parse("https://app.internal:9443/")?
//!     .with_headers(headers);
//!
//! let token = SessionTokenExtractor::new("LtpaToken2").extract(&context);
//! assert_eq!(token.map(|t| t.cookie_pair()), Some("LtpaToken2=abc123".to_string()));
//! # Ok::<(), relay_common::CommonError>(())
//! ```

/// Relay configuration and its loaders.
pub mod config;
/// Inbound request context.
pub mod context;
pub mod error;
pub mod json;
/// Session cookie lookup and token extraction.
pub mod session;
pub mod util;

pub use config::{DEFAULT_TARGET_HOST, DEFAULT_TOKEN_COOKIE, RelayConfig};
pub use context::InboundContext;
pub use error::{CommonError, Result};
pub use session::{NoSession, SessionSource, SessionToken, SessionTokenExtractor};
