use std::sync::Arc;

use crate::errors::TransportErrorKind;
use crate::net::TransferEvent;

/// Decides whether an attempt should be retried, given the number of retries
/// already issued for the request.
pub type RetryFilter = Arc<dyn Fn(u32, &TransferEvent<'_>) -> bool + Send + Sync>;

/// Wraps a closure into a [`RetryFilter`].
pub fn retry_filter<F>(f: F) -> RetryFilter
where
    F: Fn(u32, &TransferEvent<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

pub const DEFAULT_HTTP_CODES: [u16; 2] = [500, 503];

/// Transport failures that are usually transient.
pub const DEFAULT_TRANSPORT_ERRORS: [TransportErrorKind; 11] = [
    TransportErrorKind::CouldntResolveHost,
    TransportErrorKind::CouldntConnect,
    TransportErrorKind::PartialFile,
    TransportErrorKind::WriteError,
    TransportErrorKind::ReadError,
    TransportErrorKind::OperationTimedOut,
    TransportErrorKind::SslConnectError,
    TransportErrorKind::HttpPortFailed,
    TransportErrorKind::GotNothing,
    TransportErrorKind::SendError,
    TransportErrorKind::RecvError,
];

/// Retries responses with one of the given status codes. An empty list means
/// [`DEFAULT_HTTP_CODES`]. Never retries transport failures.
pub fn status_filter(codes: &[u16]) -> RetryFilter {
    let codes = if codes.is_empty() {
        DEFAULT_HTTP_CODES.to_vec()
    } else {
        codes.to_vec()
    };

    retry_filter(move |_, event| event.response().is_some_and(|r| codes.contains(&r.status)))
}

/// Retries transport failures of the given kinds. An empty list means
/// [`DEFAULT_TRANSPORT_ERRORS`].
pub fn transport_error_filter(kinds: &[TransportErrorKind]) -> RetryFilter {
    let kinds = if kinds.is_empty() {
        DEFAULT_TRANSPORT_ERRORS.to_vec()
    } else {
        kinds.to_vec()
    };

    retry_filter(move |_, event| event.error().is_some_and(|e| kinds.contains(&e.kind)))
}

/// Retries when any of `filters` says so. Filters run in order and the first
/// `true` wins.
pub fn chain_filter(filters: Vec<RetryFilter>) -> RetryFilter {
    retry_filter(move |retries, event| filters.iter().any(|f| f(retries, event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransferError;
    use crate::net::testing::ScriptedTransport;
    use crate::net::{Client, Request, Response, TransferStats};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> Client {
        Client::new(Box::new(ScriptedTransport::new(vec![])))
    }

    fn with_status<R>(status: u16, f: impl FnOnce(&TransferEvent<'_>) -> R) -> R {
        let client = client();
        let mut req = Request::get("http://example.com/").unwrap();
        let resp = Response::new(req.url().clone(), status);
        let event = TransferEvent::new(&client, &mut req, Ok(resp), TransferStats::default());
        f(&event)
    }

    fn with_error<R>(kind: TransportErrorKind, f: impl FnOnce(&TransferEvent<'_>) -> R) -> R {
        let client = client();
        let mut req = Request::get("http://example.com/").unwrap();
        let err = TransferError::new(kind, "boom");
        let event = TransferEvent::new(&client, &mut req, Err(err), TransferStats::default());
        f(&event)
    }

    fn constant(answer: bool, calls: &Arc<AtomicUsize>) -> RetryFilter {
        let calls = Arc::clone(calls);
        retry_filter(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            answer
        })
    }

    #[test]
    fn status_filter_matches_configured_codes() {
        let filter = status_filter(&[502]);
        assert!(with_status(502, |e| filter(0, e)));
        assert!(!with_status(500, |e| filter(0, e)));
        assert!(!with_error(TransportErrorKind::CouldntConnect, |e| filter(0, e)));
    }

    #[test]
    fn status_filter_defaults() {
        let filter = status_filter(&[]);
        assert!(with_status(500, |e| filter(0, e)));
        assert!(with_status(503, |e| filter(3, e)));
        assert!(!with_status(404, |e| filter(0, e)));
    }

    #[test]
    fn transport_error_filter_matches_kinds() {
        let filter = transport_error_filter(&[]);
        assert!(with_error(TransportErrorKind::OperationTimedOut, |e| filter(0, e)));
        assert!(with_error(TransportErrorKind::GotNothing, |e| filter(0, e)));
        assert!(!with_error(TransportErrorKind::TooManyRedirects, |e| filter(0, e)));
        assert!(!with_status(500, |e| filter(0, e)));

        let only_dns = transport_error_filter(&[TransportErrorKind::CouldntResolveHost]);
        assert!(!with_error(TransportErrorKind::OperationTimedOut, |e| only_dns(0, e)));
    }

    #[test]
    fn chain_filter_is_a_short_circuit_or() {
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let calls = Arc::new(AtomicUsize::new(0));
            let chain = chain_filter(vec![constant(a, &calls), constant(b, &calls)]);

            assert_eq!(with_status(200, |e| chain(0, e)), a || b);
            assert_eq!(calls.load(Ordering::SeqCst), if a { 1 } else { 2 });
        }
    }

    #[test]
    fn empty_chain_never_retries() {
        let chain = chain_filter(Vec::new());
        assert!(!with_status(500, |e| chain(0, e)));
    }
}
