use std::sync::Arc;
use std::time::Duration;

use crate::events::{Event, EventName, Listener, LATE};
use crate::formatter::{MessageFormatter, RETRY_FORMAT};
use crate::net::TransferEvent;
use crate::retry::delay::{exponential, jittered_delay, logging_delay, DelayFn};
use crate::retry::filter::{chain_filter, status_filter, transport_error_filter, RetryFilter};
use crate::retry::{RetryConfig, RetryConfigError};

/// Blocks for the computed delay before a retry.
pub type SleepFn = Arc<dyn Fn(Duration, &TransferEvent<'_>) + Send + Sync>;

fn sleep_fn<F>(f: F) -> SleepFn
where
    F: Fn(Duration, &TransferEvent<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What the coordinator does with a finished attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Issue retry number `n` (1 based).
    Retry(u32),
    /// The filter wants a retry but the budget is used up.
    Exhausted,
    /// The outcome is final.
    Settled,
}

/// Re-sends requests whose outcome the filter considers transient.
pub struct RetrySubscriber {
    filter: RetryFilter,
    delay: DelayFn,
    max_retries: u32,
    sleep: SleepFn,
}

impl RetrySubscriber {
    /// Creates a coordinator that sleeps the calling thread between attempts.
    pub fn new(filter: RetryFilter, delay: DelayFn, max_retries: u32) -> Self {
        Self {
            filter,
            delay,
            max_retries,
            sleep: sleep_fn(|delay, _| std::thread::sleep(delay)),
        }
    }

    /// Replaces the function that waits between attempts.
    pub fn with_sleep<F>(mut self, sleep: F) -> Self
    where
        F: Fn(Duration, &TransferEvent<'_>) + Send + Sync + 'static,
    {
        self.sleep = sleep_fn(sleep);
        self
    }

    /// The default coordinator: retries the configured status codes and
    /// transport failures with exponential backoff, optionally jittered and
    /// logged.
    ///
    /// The config is validated first, every retry nests another send.
    pub fn exponential_backoff(config: &RetryConfig) -> Result<Self, RetryConfigError> {
        config.validate()?;

        let filter = chain_filter(vec![
            status_filter(&config.http_codes),
            transport_error_filter(&config.transport_errors),
        ]);

        let mut delay = exponential();
        if let Some(ratio) = config.jitter {
            delay = jittered_delay(delay, ratio);
        }
        if let Some(level) = config.log_level {
            let format = config.log_format.as_deref().unwrap_or(RETRY_FORMAT);
            delay = logging_delay(delay, level, MessageFormatter::new(format));
        }

        Ok(Self::new(filter, delay, config.max_retries))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn evaluate(&self, event: &TransferEvent<'_>) -> RetryDecision {
        let retries = event.request().state().retries;

        if !(self.filter)(retries, event) {
            return RetryDecision::Settled;
        }
        if retries >= self.max_retries {
            return RetryDecision::Exhausted;
        }
        RetryDecision::Retry(retries + 1)
    }

    /// Retries the attempt of `event` if needed and replaces its outcome with
    /// the outcome of the retry.
    pub fn on_transfer(&self, event: &mut TransferEvent<'_>) {
        match self.evaluate(event) {
            RetryDecision::Retry(retry) => {
                let delay = (self.delay)(retry, event);
                log::debug!(
                    "{} retry {}/{} of {} in {:?}",
                    event.request().id(),
                    retry,
                    self.max_retries,
                    event.request().url(),
                    delay
                );
                (self.sleep)(delay, event);

                event.request_mut().state_mut().retries = retry;
                let outcome = event.resend();
                event.intercept(outcome);
            }
            RetryDecision::Exhausted => {
                log::debug!(
                    "{} giving up on {} after {} retries",
                    event.request().id(),
                    event.request().url(),
                    self.max_retries
                );
            }
            RetryDecision::Settled => {}
        }
    }
}

impl Listener for RetrySubscriber {
    fn handles(&self, name: EventName) -> Option<i32> {
        match name {
            EventName::Complete | EventName::Error => Some(LATE),
            EventName::Before => None,
        }
    }

    fn invoke(&self, event: &mut Event<'_, '_>) {
        match event {
            Event::Complete(transfer) | Event::Error(transfer) => self.on_transfer(transfer),
            Event::Before(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportErrorKind;
    use crate::net::testing::ScriptedTransport;
    use crate::net::{Client, Request};
    use crate::retry::{retry_filter, RetryConfig};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    struct Harness {
        client: Client,
        calls: Arc<std::sync::atomic::AtomicUsize>,
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    fn harness(script: Vec<Result<u16, TransportErrorKind>>, subscriber: RetrySubscriber) -> Harness {
        let transport = ScriptedTransport::new(script);
        let calls = transport.calls();
        let slept = Arc::new(Mutex::new(Vec::new()));

        let recorder = Arc::clone(&slept);
        let subscriber = subscriber.with_sleep(move |delay, _| recorder.lock().unwrap().push(delay));

        let mut client = Client::new(Box::new(transport));
        client.attach(Arc::new(subscriber));

        Harness { client, calls, slept }
    }

    fn status_coordinator(max_retries: u32) -> RetrySubscriber {
        RetrySubscriber::new(status_filter(&[500, 503]), exponential(), max_retries)
    }

    #[test]
    fn retries_until_success() {
        let h = harness(vec![Ok(500), Ok(503), Ok(200)], status_coordinator(2));

        let mut req = Request::get("http://example.com/").unwrap();
        let resp = h.client.send(&mut req).unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
        assert_eq!(req.state().retries, 2);

        let slept = h.slept.lock().unwrap();
        assert_eq!(*slept, vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(slept.iter().sum::<Duration>(), Duration::from_secs(3));
    }

    #[test]
    fn returns_last_outcome_when_exhausted() {
        let h = harness(vec![Ok(500), Ok(500), Ok(500), Ok(200)], status_coordinator(2));

        let mut req = Request::get("http://example.com/").unwrap();
        let resp = h.client.send(&mut req).unwrap();

        assert_eq!(resp.status, 500);
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn settled_outcomes_are_not_retried() {
        let h = harness(vec![Ok(404)], status_coordinator(5));

        let mut req = Request::get("http://example.com/").unwrap();
        assert_eq!(h.client.send(&mut req).unwrap().status, 404);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        assert!(h.slept.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_retries_never_resends() {
        let h = harness(vec![Ok(500), Ok(200)], status_coordinator(0));

        let mut req = Request::get("http://example.com/").unwrap();
        assert_eq!(h.client.send(&mut req).unwrap().status, 500);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transport_errors_are_retried_and_propagated_verbatim() {
        let subscriber = RetrySubscriber::new(transport_error_filter(&[]), exponential(), 1);
        let h = harness(
            vec![
                Err(TransportErrorKind::CouldntConnect),
                Err(TransportErrorKind::OperationTimedOut),
            ],
            subscriber,
        );

        let mut req = Request::get("http://example.com/").unwrap();
        let err = h.client.send(&mut req).unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::OperationTimedOut);
        assert_eq!(err.message, "scripted failure");
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn error_followed_by_success() {
        let cfg = RetryConfig::builder().max_retries(3).build().unwrap();
        let h = harness(
            vec![Err(TransportErrorKind::RecvError), Ok(503), Ok(201)],
            RetrySubscriber::exponential_backoff(&cfg).unwrap(),
        );

        let mut req = Request::get("http://example.com/").unwrap();
        assert_eq!(h.client.send(&mut req).unwrap().status, 201);
        assert_eq!(h.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *h.slept.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn backoff_rejects_unvalidated_config() {
        let cfg = RetryConfig {
            max_retries: 10_000,
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetrySubscriber::exponential_backoff(&cfg),
            Err(RetryConfigError::TooManyRetries(10_000))
        ));

        let cfg = RetryConfig {
            http_codes: vec![],
            ..RetryConfig::default()
        };
        assert!(matches!(
            RetrySubscriber::exponential_backoff(&cfg),
            Err(RetryConfigError::NoHttpCodes)
        ));
    }

    #[test]
    fn filter_sees_retries_issued_so_far() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let filter = {
            let seen = Arc::clone(&seen);
            retry_filter(move |retries, _| {
                seen.lock().unwrap().push(retries);
                true
            })
        };
        let h = harness(vec![Ok(500), Ok(500), Ok(500)], RetrySubscriber::new(filter, exponential(), 2));

        let mut req = Request::get("http://example.com/").unwrap();
        h.client.send(&mut req).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn evaluate_reports_decisions() {
        let client = Client::new(Box::new(ScriptedTransport::new(vec![])));
        let coordinator = status_coordinator(2);
        let mut req = Request::get("http://example.com/").unwrap();

        let mut decide = |retries: u32, status: u16| {
            req.state_mut().retries = retries;
            let resp = crate::net::Response::new(req.url().clone(), status);
            let event = TransferEvent::new(&client, &mut req, Ok(resp), Default::default());
            coordinator.evaluate(&event)
        };

        assert_eq!(decide(0, 500), RetryDecision::Retry(1));
        assert_eq!(decide(1, 503), RetryDecision::Retry(2));
        assert_eq!(decide(2, 500), RetryDecision::Exhausted);
        assert_eq!(decide(0, 200), RetryDecision::Settled);
    }
}
