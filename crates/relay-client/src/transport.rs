//! Construction of the HTTP transport owned by each relay client.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;

use relay_common::RelayConfig;

use crate::error::{ClientError, Result};

/// Builds the transport for one relay client.
///
/// With `insecure_skip_verify` set, any certificate chain and any hostname
/// are accepted. Internal peers routinely present self-signed certificates
/// and are reached over an isolated network.
///
/// # Errors
///
/// Returns [`ClientError::TransportInit`] if the TLS backend cannot be
/// initialized.
pub fn build_transport(config: &RelayConfig) -> Result<Client> {
    let mut builder = Client::builder();

    if config.insecure_skip_verify {
        warn!("TLS certificate and hostname verification is disabled for relay calls");
        builder = builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    // None means no timeout
    if let Some(seconds) = config.connect_timeout_seconds {
        builder = builder.connect_timeout(Duration::from_secs(seconds));
    }
    if let Some(seconds) = config.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    let client = builder.build().map_err(ClientError::TransportInit)?;
    debug!(
        "Relay transport ready (insecure_skip_verify: {})",
        config.insecure_skip_verify
    );

    Ok(client)
}
