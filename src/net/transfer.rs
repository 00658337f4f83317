use std::time::Duration;

use crate::errors::TransferError;
use crate::net::{Client, Request, Response};

/// Timing information about a single transfer attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferStats {
    /// Wall clock time spent in the transport.
    pub total_time: Duration,
}

/// Snapshot of one finished request attempt, handed to `Complete` and `Error`
/// listeners.
///
/// Listeners may inspect the outcome, or replace it with
/// [`intercept`](Self::intercept), which also stops the event from reaching
/// lower priority listeners.
pub struct TransferEvent<'c> {
    client: &'c Client,
    request: &'c mut Request,
    outcome: Result<Response, TransferError>,
    stats: TransferStats,
    propagation_stopped: bool,
}

impl<'c> TransferEvent<'c> {
    pub(crate) fn new(
        client: &'c Client,
        request: &'c mut Request,
        outcome: Result<Response, TransferError>,
        stats: TransferStats,
    ) -> Self {
        Self {
            client,
            request,
            outcome,
            stats,
            propagation_stopped: false,
        }
    }

    /// The client that performed the transfer.
    pub fn client(&self) -> &'c Client {
        self.client
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        self.request
    }

    /// The response, `None` when the transport failed.
    pub fn response(&self) -> Option<&Response> {
        self.outcome.as_ref().ok()
    }

    /// The transport error, `None` when a response was received.
    pub fn error(&self) -> Option<&TransferError> {
        self.outcome.as_ref().err()
    }

    pub fn outcome(&self) -> &Result<Response, TransferError> {
        &self.outcome
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Looks up transport diagnostics by key.
    ///
    /// Known keys: `url`, `http_code`, `total_time` (seconds as a decimal
    /// string) and `error_code` (numeric transport error code).
    pub fn transfer_info(&self, key: &str) -> Option<String> {
        match key {
            "url" => Some(self.request.url().to_string()),
            "http_code" => self.response().map(|r| r.status.to_string()),
            "total_time" => Some(format!("{:.3}", self.stats.total_time.as_secs_f64())),
            "error_code" => self.error().map(|e| e.kind.code().to_string()),
            _ => None,
        }
    }

    /// Sends the request of this event again through the same client.
    ///
    /// The new attempt runs through the full listener pipeline.
    pub fn resend(&mut self) -> Result<Response, TransferError> {
        let client = self.client;
        client.send(self.request)
    }

    /// Replaces the outcome of this transfer and stops propagation.
    pub fn intercept(&mut self, outcome: Result<Response, TransferError>) {
        self.outcome = outcome;
        self.propagation_stopped = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn into_outcome(self) -> Result<Response, TransferError> {
        self.outcome
    }
}
