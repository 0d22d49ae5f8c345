//! # relay-client
//!
//! HTTPS client for calling sibling services on behalf of an already
//! authenticated caller.
//!
//! The client reads the caller's session cookie from the inbound request,
//! resolves target services relative to the current server, and forwards the
//! cookie on every outbound call. When the inbound request carried no session
//! cookie, calls are answered locally with a `500` response and nothing is
//! sent.
//!
//! ## Example
//!
//! ```no_run
//! use relay_client::{APPLICATION_JSON, RelayClientFactory, RelayRequest};
//! use relay_common::{InboundContext, RelayConfig};
//!
//! # async fn example(parts: http::request::Parts) -> anyhow::Result<()> {
//! // Once, at startup
//! let factory = RelayClientFactory::new(
//!     RelayConfig::builder().target_host("services.internal").build(),
//! );
//!
//! // Per inbound request
//! let context = InboundContext::from_parts(&parts)?;
//! let client = factory.scoped(&context)?;
//!
//! let url = client.resolve_target_on_port(9443, "inventory")?;
//! let response = client
//!     .put_json_with_content(
//!         RelayRequest::new(url).path("items/42"),
//!         &serde_json::json!({"quantity": 3}),
//!         APPLICATION_JSON,
//!     )
//!     .await?;
//!
//! println!("inventory answered {}", response.status());
//! // `client` is closed when it goes out of scope
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod factory;
pub mod request;
mod transport;

pub use client::{APPLICATION_JSON, OUTBOUND_SCHEME, RelayClient, TOKEN_UNAVAILABLE_MESSAGE};
pub use error::{ClientError, Result};
pub use factory::{RelayClientFactory, RelayScope};
pub use request::RelayRequest;
