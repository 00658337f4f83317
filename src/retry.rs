//! Retrying failed request attempts.
//!
//! A [`RetrySubscriber`] listens to the `Complete` and `Error` events of a
//! [`Client`](crate::net::Client). After every attempt it asks its filter
//! whether the outcome is worth another try. If so, and the retry budget of
//! the request is not used up, it waits for the computed delay, re-sends the
//! request through the same client and replaces the outcome of the attempt
//! with the outcome of the re-send.
//!
//! The number of retries already issued lives in
//! [`RequestState::retries`](crate::net::RequestState) of the request itself.
//!
//! Filters receive the number of retries issued so far (0 for the first
//! attempt). Delay functions receive the number of the retry about to be
//! issued (1 for the first retry).
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use gosub_http::net::{Client, ReqwestTransport};
//! use gosub_http::retry::{RetryConfig, RetrySubscriber};
//! use gosub_http::ClientConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let retry = RetryConfig::builder()
//!     .max_retries(3)
//!     .http_codes(vec![500, 502, 503])
//!     .log_level(log::Level::Info)
//!     .build()?;
//!
//! let transport = ReqwestTransport::new(&ClientConfig::default())?;
//! let mut client = Client::new(Box::new(transport));
//! client.attach(Arc::new(RetrySubscriber::exponential_backoff(&retry)?));
//! # Ok(()) }
//! ```

mod config;
mod delay;
mod filter;
mod subscriber;

pub use config::{RetryConfig, RetryConfigBuilder, RetryConfigError, MAX_RETRIES_CEILING};
pub use delay::{delay_fn, exponential, exponential_delay, jittered_delay, logging_delay, DelayFn};
pub use filter::{
    chain_filter, retry_filter, status_filter, transport_error_filter, RetryFilter, DEFAULT_HTTP_CODES,
    DEFAULT_TRANSPORT_ERRORS,
};
pub use subscriber::{RetryDecision, RetrySubscriber, SleepFn};
