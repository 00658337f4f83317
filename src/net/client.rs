use std::sync::Arc;
use std::time::Instant;

use crate::config::{ClientConfig, ClientConfigError};
use crate::cookies::{CookieSubscriber, DefaultCookieJar};
use crate::errors::{ClientError, TransferError};
use crate::events::{Emitter, Event, EventName, Listener};
use crate::net::{ReqwestTransport, Request, Response, TransferEvent, TransferStats, Transport};
use crate::retry::RetrySubscriber;

/// Sends requests through a [`Transport`] and notifies listeners about every
/// attempt.
pub struct Client {
    transport: Box<dyn Transport>,
    emitter: Emitter,
}

impl Client {
    /// Creates a client without any listeners.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            emitter: Emitter::new(),
        }
    }

    /// Creates a reqwest backed client and wires the cookie jar and retry
    /// listeners requested by `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(Box::new(transport), &config)?)
    }

    /// Same as [`Client::from_config`] on top of an existing transport.
    pub fn with_transport(transport: Box<dyn Transport>, config: &ClientConfig) -> Result<Self, ClientConfigError> {
        config.validate()?;
        let mut client = Self::new(transport);

        if config.cookies {
            let jar = DefaultCookieJar::with_mode(config.cookie_mode).into_handle();
            client.attach(Arc::new(CookieSubscriber::new(jar)));
        }
        if let Some(retry) = &config.retry {
            let retry = RetrySubscriber::exponential_backoff(retry).map_err(ClientConfigError::Retry)?;
            client.attach(Arc::new(retry));
        }

        Ok(client)
    }

    pub fn attach(&mut self, listener: Arc<dyn Listener>) {
        self.emitter.attach(listener);
    }

    pub fn detach(&mut self, listener: &Arc<dyn Listener>) -> bool {
        self.emitter.detach(listener)
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Sends `request` and returns the final outcome after all listeners ran.
    ///
    /// A response with any status code is an `Ok` outcome; `Err` means the
    /// transport could not produce a response at all.
    pub fn send(&self, request: &mut Request) -> Result<Response, TransferError> {
        self.emitter.emit(&mut Event::Before(&mut *request));

        log::debug!(
            "{} {} {} (retries: {})",
            request.id(),
            request.method(),
            request.url(),
            request.state().retries
        );

        let started = Instant::now();
        let outcome = self.transport.send(request);
        let stats = TransferStats {
            total_time: started.elapsed(),
        };

        match &outcome {
            Ok(resp) => log::debug!("{} {} {}", request.id(), resp.status, resp.status_text),
            Err(e) => log::debug!("{} failed: {}", request.id(), e),
        }

        let mut transfer = TransferEvent::new(self, request, outcome, stats);
        if transfer.response().is_some() {
            self.emitter.emit(&mut Event::Complete(&mut transfer));
        } else {
            self.emitter.emit(&mut Event::Error(&mut transfer));
        }

        transfer.into_outcome()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("before", &self.emitter.listeners(EventName::Before).count())
            .field("complete", &self.emitter.listeners(EventName::Complete).count())
            .field("error", &self.emitter.listeners(EventName::Error).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportErrorKind;
    use crate::events::EARLY;
    use crate::net::testing::ScriptedTransport;
    use crate::retry::{RetryConfig, RetryConfigError};
    use http::header::COOKIE;

    struct Rewriter;

    impl Listener for Rewriter {
        fn handles(&self, name: EventName) -> Option<i32> {
            (name == EventName::Error).then_some(EARLY)
        }

        fn invoke(&self, event: &mut Event<'_, '_>) {
            if let Event::Error(transfer) = event {
                let url = transfer.request().url().clone();
                transfer.intercept(Ok(Response::new(url, 204)));
            }
        }
    }

    #[test]
    fn returns_transport_outcome_without_listeners() {
        let transport = ScriptedTransport::new(vec![Ok(503)]);
        let calls = transport.calls();
        let client = Client::new(Box::new(transport));

        let mut req = Request::get("http://example.com/").unwrap();
        let resp = client.send(&mut req).unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn error_listeners_can_replace_the_outcome() {
        let transport = ScriptedTransport::new(vec![Err(TransportErrorKind::CouldntConnect)]);
        let mut client = Client::new(Box::new(transport));
        client.attach(Arc::new(Rewriter));

        let mut req = Request::get("http://example.com/").unwrap();
        assert_eq!(client.send(&mut req).unwrap().status, 204);
    }

    #[test]
    fn from_config_wires_cookie_jar() {
        let transport = ScriptedTransport::from_responses(vec![
            Ok(Response::new("http://example.com/".parse().unwrap(), 200)
                .with_header("Set-Cookie", "session=abc; Path=/")),
            Ok(Response::new("http://example.com/next".parse().unwrap(), 200)),
        ]);
        let seen = transport.seen();
        let config = ClientConfig::default();
        let client = Client::with_transport(Box::new(transport), &config).unwrap();

        let mut first = Request::get("http://example.com/").unwrap();
        client.send(&mut first).unwrap();
        assert!(first.header("cookie").is_none());

        let mut second = Request::get("http://example.com/next").unwrap();
        client.send(&mut second).unwrap();
        assert_eq!(second.header("cookie"), Some("session=abc"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].headers().get(COOKIE).is_none());
        assert_eq!(seen[1].header("cookie"), Some("session=abc"));
    }

    #[test]
    fn rejects_retry_config_that_skipped_the_builder() {
        let config = ClientConfig {
            retry: Some(RetryConfig {
                max_retries: 10_000,
                ..RetryConfig::default()
            }),
            ..ClientConfig::default()
        };

        let result = Client::with_transport(Box::new(ScriptedTransport::new(vec![])), &config);
        assert!(matches!(
            result,
            Err(ClientConfigError::Retry(RetryConfigError::TooManyRetries(10_000)))
        ));
    }
}
