use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::formatter::{MessageContext, MessageFormatter};
use crate::net::TransferEvent;

/// Computes how long to wait before retry number `retry` (1 based).
pub type DelayFn = Arc<dyn Fn(u32, &TransferEvent<'_>) -> Duration + Send + Sync>;

/// Wraps a closure into a [`DelayFn`].
pub fn delay_fn<F>(f: F) -> DelayFn
where
    F: Fn(u32, &TransferEvent<'_>) -> Duration + Send + Sync + 'static,
{
    Arc::new(f)
}

/// `2^(retry - 1)` seconds: 1s, 2s, 4s, 8s, ... Retry 0 waits nothing.
pub fn exponential_delay(retry: u32) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    1u64
        .checked_shl(retry - 1)
        .map(Duration::from_secs)
        .unwrap_or(Duration::MAX)
}

/// [`exponential_delay`] as a [`DelayFn`].
pub fn exponential() -> DelayFn {
    delay_fn(|retry, _| exponential_delay(retry))
}

/// Logs a line for every retry at `level`, then returns the delay of `inner`
/// unchanged.
///
/// Besides the regular placeholders of the [`MessageFormatter`] the template
/// can use `{retries}` (the retry number) and `{delay}` (seconds).
pub fn logging_delay(inner: DelayFn, level: log::Level, formatter: MessageFormatter) -> DelayFn {
    delay_fn(move |retry, event| {
        let delay = inner(retry, event);

        if log::log_enabled!(level) {
            let ctx = MessageContext::from_transfer(event)
                .with("retries", retry)
                .with("delay", delay.as_secs_f64());
            log::log!(level, "{}", formatter.format(&ctx));
        }

        delay
    })
}

/// Adds a random extra delay of up to `ratio` times the delay of `inner`.
pub fn jittered_delay(inner: DelayFn, ratio: f64) -> DelayFn {
    let ratio = ratio.clamp(0.0, 1.0);

    delay_fn(move |retry, event| {
        let delay = inner(retry, event);
        if ratio == 0.0 || delay.is_zero() {
            return delay;
        }

        let factor = 1.0 + rand::rng().random_range(0.0..=ratio);
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
    })
}
