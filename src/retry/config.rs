//! Retry configuration.
//!
//! `RetryConfig` describes the default exponential backoff coordinator built
//! by [`RetrySubscriber::exponential_backoff`](crate::retry::RetrySubscriber::exponential_backoff).
//! It provides defaults via [`Default`] and a fluent [`RetryConfig::builder()`]
//! that validates the values.
//!
//! # Fields (summary)
//! - `max_retries`: retries per request on top of the first attempt (default: 5,
//!   at most [`MAX_RETRIES_CEILING`]).
//! - `http_codes`: status codes that trigger a retry (default: 500, 503).
//! - `transport_errors`: transport failures that trigger a retry (default:
//!   [`DEFAULT_TRANSPORT_ERRORS`]).
//! - `log_level`: log every retry at this level, no logging when `None`.
//! - `log_format`: template for the retry log line (default:
//!   [`RETRY_FORMAT`](crate::formatter::RETRY_FORMAT)).
//! - `jitter`: add up to this fraction of random extra delay (`0.0..=1.0`).
//!
//! # Errors
//!
//! Builder validation returns [`RetryConfigError`] for an empty code or error
//! list, too many retries or a jitter ratio outside `0.0..=1.0`.

use std::fmt;

use crate::errors::TransportErrorKind;
use crate::retry::filter::{DEFAULT_HTTP_CODES, DEFAULT_TRANSPORT_ERRORS};

/// Upper bound for `max_retries`. The exponential delay of retry 32 is already
/// more than 68 years.
pub const MAX_RETRIES_CEILING: u32 = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub http_codes: Vec<u16>,
    pub transport_errors: Vec<TransportErrorKind>,
    pub log_level: Option<log::Level>,
    pub log_format: Option<String>,
    pub jitter: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            http_codes: DEFAULT_HTTP_CODES.to_vec(),
            transport_errors: DEFAULT_TRANSPORT_ERRORS.to_vec(),
            log_level: None,
            log_format: None,
            jitter: None,
        }
    }
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Checks a config that was assembled without the builder.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        validate(self)
    }
}

/// Builder for [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryConfigBuilder {
    inner: RetryConfig,
}

impl RetryConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut RetryConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn max_retries(self, n: u32) -> Self { self.map(|c| c.max_retries = n) }
    pub fn http_codes(self, codes: Vec<u16>) -> Self { self.map(|c| c.http_codes = codes) }
    pub fn transport_errors(self, kinds: Vec<TransportErrorKind>) -> Self { self.map(|c| c.transport_errors = kinds) }
    pub fn log_level(self, level: log::Level) -> Self { self.map(|c| c.log_level = Some(level)) }
    pub fn log_format<S: Into<String>>(self, format: S) -> Self { self.map(|c| c.log_format = Some(format.into())) }
    pub fn jitter(self, ratio: f64) -> Self { self.map(|c| c.jitter = Some(ratio)) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut RetryConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<RetryConfig, RetryConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum RetryConfigError {
    TooManyRetries(u32),
    NoHttpCodes,
    NoTransportErrors,
    InvalidJitter(f64),
}

impl fmt::Display for RetryConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryConfigError::TooManyRetries(n) =>
                write!(f, "max_retries {n} is out of range (expected 0..={MAX_RETRIES_CEILING})"),
            RetryConfigError::NoHttpCodes =>
                write!(f, "http_codes must contain at least one status code"),
            RetryConfigError::NoTransportErrors =>
                write!(f, "transport_errors must contain at least one error kind"),
            RetryConfigError::InvalidJitter(r) =>
                write!(f, "jitter {r} is out of range (expected 0.0..=1.0)"),
        }
    }
}
impl std::error::Error for RetryConfigError {}

fn validate(c: &RetryConfig) -> Result<(), RetryConfigError> {
    if c.max_retries > MAX_RETRIES_CEILING {
        return Err(RetryConfigError::TooManyRetries(c.max_retries));
    }
    if c.http_codes.is_empty() {
        return Err(RetryConfigError::NoHttpCodes);
    }
    if c.transport_errors.is_empty() {
        return Err(RetryConfigError::NoTransportErrors);
    }
    if let Some(ratio) = c.jitter {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RetryConfigError::InvalidJitter(ratio));
        }
    }
    Ok(())
}
