//! Client configuration.
//!
//! `ClientConfig` controls the transport and the listeners that
//! [`Client::from_config`](crate::net::Client::from_config) wires up. It
//! provides defaults via [`Default`] and a fluent [`ClientConfig::builder()`]
//! for customization with validation.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use gosub_http::ClientConfig;
//! use gosub_http::retry::RetryConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::builder()
//!     .user_agent("Gosub/0.1")
//!     .timeout(Duration::from_secs(10))
//!     .retry(RetryConfig::default())
//!     .build()?; // returns Result<ClientConfig, ClientConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `user_agent`: `User-Agent` header sent with every request.
//! - `timeout`: total time allowed for one attempt (default: 30 seconds).
//! - `connect_timeout`: time allowed to establish a connection (default: 10 seconds).
//! - `max_redirects`: redirects followed by the transport (default: 10). The
//!   cookie jar only sees the final response of a followed chain.
//! - `cookies`: keep a cookie jar for the client (default: `true`).
//! - `cookie_mode`: what the jar does with invalid cookies (default: lenient).
//! - `retry`: retry failed attempts with exponential backoff, off when `None`.
//!
//! # Errors
//!
//! Builder validation returns [`ClientConfigError`] for an empty user agent,
//! zero timeouts or an invalid retry config.

use std::fmt;
use std::time::Duration;

use crate::cookies::ValidationMode;
use crate::retry::{RetryConfig, RetryConfigError};

const DEFAULT_USER_AGENT: &str = "Gosub/1.0 (X11; Linux x86_64) Gecko/20250802 GosubHttp/1.0";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub max_redirects: usize,
    pub cookies: bool,
    pub cookie_mode: ValidationMode,
    pub retry: Option<RetryConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            max_redirects: 10,
            cookies: true,
            cookie_mode: ValidationMode::Lenient,
            retry: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Checks a config that was assembled without the builder, including
    /// its retry settings.
    pub fn validate(&self) -> Result<(), ClientConfigError> {
        validate(self)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
}

impl ClientConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn timeout(self, timeout: Duration) -> Self { self.map(|c| c.timeout = Some(timeout)) }
    pub fn no_timeout(self) -> Self { self.map(|c| c.timeout = None) }
    pub fn connect_timeout(self, timeout: Duration) -> Self { self.map(|c| c.connect_timeout = Some(timeout)) }
    pub fn max_redirects(self, n: usize) -> Self { self.map(|c| c.max_redirects = n) }
    pub fn cookies(self, on: bool) -> Self { self.map(|c| c.cookies = on) }
    pub fn cookie_mode(self, mode: ValidationMode) -> Self { self.map(|c| c.cookie_mode = mode) }
    pub fn retry(self, retry: RetryConfig) -> Self { self.map(|c| c.retry = Some(retry)) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ClientConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum ClientConfigError {
    EmptyUserAgent,
    ZeroTimeout,
    ZeroConnectTimeout,
    Retry(RetryConfigError),
}

impl fmt::Display for ClientConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientConfigError::EmptyUserAgent =>
                write!(f, "user_agent must not be empty"),
            ClientConfigError::ZeroTimeout =>
                write!(f, "timeout must be larger than zero (use no_timeout() to disable it)"),
            ClientConfigError::ZeroConnectTimeout =>
                write!(f, "connect_timeout must be larger than zero"),
            ClientConfigError::Retry(e) =>
                write!(f, "retry: {e}"),
        }
    }
}
impl std::error::Error for ClientConfigError {}

fn validate(c: &ClientConfig) -> Result<(), ClientConfigError> {
    if c.user_agent.trim().is_empty() {
        return Err(ClientConfigError::EmptyUserAgent);
    }
    if c.timeout.is_some_and(|t| t.is_zero()) {
        return Err(ClientConfigError::ZeroTimeout);
    }
    if c.connect_timeout.is_some_and(|t| t.is_zero()) {
        return Err(ClientConfigError::ZeroConnectTimeout);
    }
    if let Some(retry) = &c.retry {
        retry.validate().map_err(ClientConfigError::Retry)?;
    }
    Ok(())
}
