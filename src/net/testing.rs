use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{TransferError, TransportErrorKind};
use crate::net::{Request, Response, Transport};

enum Step {
    Status(u16),
    Fail(TransportErrorKind),
    Canned(Result<Response, TransferError>),
}

/// Transport that plays back a fixed list of outcomes, one per call.
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Request>>>,
}

impl ScriptedTransport {
    /// `Ok(status)` answers with an empty response for the request URL,
    /// `Err(kind)` fails the attempt.
    pub(crate) fn new(steps: Vec<Result<u16, TransportErrorKind>>) -> Self {
        Self::from_steps(
            steps
                .into_iter()
                .map(|s| match s {
                    Ok(status) => Step::Status(status),
                    Err(kind) => Step::Fail(kind),
                })
                .collect(),
        )
    }

    pub(crate) fn from_responses(outcomes: Vec<Result<Response, TransferError>>) -> Self {
        Self::from_steps(outcomes.into_iter().map(Step::Canned).collect())
    }

    fn from_steps(steps: VecDeque<Step>) -> Self {
        Self {
            steps: Mutex::new(steps),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Requests exactly as they reached the transport.
    pub(crate) fn seen(&self) -> Arc<Mutex<Vec<Request>>> {
        Arc::clone(&self.seen)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &Request) -> Result<Response, TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Status(status)) => Ok(Response::new(request.url().clone(), status)),
            Some(Step::Fail(kind)) => Err(TransferError::new(kind, "scripted failure")),
            Some(Step::Canned(outcome)) => outcome,
            None => Err(TransferError::new(TransportErrorKind::Other, "script exhausted")),
        }
    }
}
