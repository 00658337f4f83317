use reqwest::redirect::Policy;

use crate::config::ClientConfig;
use crate::errors::{TransferError, TransportErrorKind};
use crate::net::{Request, Response};

/// Performs a single request attempt on the wire.
///
/// Implementations must not retry on their own; retries are decided by
/// listeners on the [`Client`](crate::net::Client).
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<Response, TransferError>;
}

/// Blocking transport backed by `reqwest`.
///
/// Redirects (up to `max_redirects`) are followed inside reqwest, so listeners
/// only see the final response of a redirect chain. `Set-Cookie` headers of
/// intermediate 3xx responses never reach the cookie jar; set `max_redirects`
/// to 0 to get every 3xx response back from [`send`](Transport::send).
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransferError> {
        // A zero limit hands 3xx responses back instead of failing on them
        let redirect = match config.max_redirects {
            0 => Policy::none(),
            n => Policy::limited(n),
        };
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransferError::new(TransportErrorKind::Other, e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &Request) -> Result<Response, TransferError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if !request.body().is_empty() {
            builder = builder.body(request.body().to_vec());
        }

        let res = builder.send()?;

        // Fetch results
        let url = res.url().clone();
        let status = res.status().as_u16();
        let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
        let headers = res.headers().clone();

        // Fetch body. We don't do streaming yet
        let body = res.bytes()?.to_vec();

        Ok(Response {
            url,
            status,
            status_text,
            headers,
            body,
        })
    }
}
