//! Relay client configuration.
//!
//! The configuration is created once at startup and handed to the
//! `RelayClientFactory`; nothing here is process-wide mutable state.
//!
//! ## Example Configuration
//!
//! ```toml
//! target_host = "services.internal"
//! token_cookie_name = "LtpaToken2"
//! insecure_skip_verify = true
//! connect_timeout_seconds = 10
//! timeout_seconds = 60
//! ```
//!
//! ## Environment
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `RELAY_TARGET_HOST` | `target_host` | `localhost` |
//! | `RELAY_TOKEN_COOKIE` | `token_cookie_name` | `LtpaToken2` |
//! | `RELAY_INSECURE_SKIP_VERIFY` | `insecure_skip_verify` | `true` |

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{CommonError, Result};

/// Host used for outbound calls when none is configured.
pub const DEFAULT_TARGET_HOST: &str = "localhost";

/// Name of the inbound session cookie that is relayed downstream.
pub const DEFAULT_TOKEN_COOKIE: &str = "LtpaToken2";

/// Environment variable overriding [`RelayConfig::target_host`].
pub const TARGET_HOST_ENV: &str = "RELAY_TARGET_HOST";

/// Environment variable overriding [`RelayConfig::token_cookie_name`].
pub const TOKEN_COOKIE_ENV: &str = "RELAY_TOKEN_COOKIE";

/// Environment variable overriding [`RelayConfig::insecure_skip_verify`].
pub const INSECURE_SKIP_VERIFY_ENV: &str = "RELAY_INSECURE_SKIP_VERIFY";

/// Configuration for relay clients.
///
/// # Examples
///
/// ```
/// use relay_common::RelayConfig;
///
/// let config = RelayConfig::builder()
///     .target_host("services.internal")
///     .build();
///
/// assert_eq!(config.target_host, "services.internal");
/// assert_eq!(config.token_cookie_name, "LtpaToken2");
/// assert!(config.insecure_skip_verify);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct RelayConfig {
    /// Host that outbound calls are addressed to, in place of the inbound
    /// request's own host. Lets one logical service be moved to another
    /// machine without touching call sites.
    #[serde(default = "default_target_host")]
    #[builder(default = default_target_host(), setter(into))]
    pub target_host: String,

    /// Name of the session cookie read from the inbound request and
    /// forwarded on every outbound call.
    #[serde(default = "default_token_cookie")]
    #[builder(default = default_token_cookie(), setter(into))]
    pub token_cookie_name: String,

    /// Accept any certificate chain and any hostname on outbound TLS.
    ///
    /// Peers are internal services that commonly present self-signed
    /// certificates. Turning this off enables normal verification.
    #[serde(default = "default_insecure_skip_verify")]
    #[builder(default = default_insecure_skip_verify())]
    pub insecure_skip_verify: bool,

    /// Connect timeout in seconds (none by default).
    #[serde(default)]
    #[builder(default)]
    pub connect_timeout_seconds: Option<u64>,

    /// Total request timeout in seconds (none by default).
    #[serde(default)]
    #[builder(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            target_host: default_target_host(),
            token_cookie_name: default_token_cookie(),
            insecure_skip_verify: default_insecure_skip_verify(),
            connect_timeout_seconds: None,
            timeout_seconds: None,
        }
    }
}

fn default_target_host() -> String {
    DEFAULT_TARGET_HOST.to_string()
}

fn default_token_cookie() -> String {
    DEFAULT_TOKEN_COOKIE.to_string()
}

const fn default_insecure_skip_verify() -> bool {
    true
}

impl RelayConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unusable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Falls back to [`DEFAULT_TARGET_HOST`] when no target host is set. That
    /// fallback is convenient in development but almost certainly wrong in a
    /// multi-host deployment, so it is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match lookup(TARGET_HOST_ENV) {
            Some(host) => config.target_host = host,
            None => warn!(
                "{TARGET_HOST_ENV} is not set, relaying to default host {DEFAULT_TARGET_HOST}"
            ),
        }

        if let Some(name) = lookup(TOKEN_COOKIE_ENV) {
            config.token_cookie_name = name;
        }

        if let Some(raw) = lookup(INSECURE_SKIP_VERIFY_ENV) {
            config.insecure_skip_verify = parse_bool(&raw).ok_or_else(|| {
                CommonError::Config(format!(
                    "{INSECURE_SKIP_VERIFY_ENV} must be true or false, got '{raw}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist or cannot be read
    /// - Deserialization fails
    /// - Validation fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CommonError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the target host is blank or the cookie name is
    /// not a valid cookie name.
    pub fn validate(&self) -> Result<()> {
        if self.target_host.trim().is_empty() {
            return Err(CommonError::Config("target_host cannot be empty".to_string()));
        }

        if self.token_cookie_name.is_empty() {
            return Err(CommonError::Config(
                "token_cookie_name cannot be empty".to_string(),
            ));
        }

        if self
            .token_cookie_name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ';' | ','))
        {
            return Err(CommonError::Config(format!(
                "token_cookie_name '{}' contains invalid characters",
                self.token_cookie_name
            )));
        }

        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
