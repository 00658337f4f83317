//! Request lifecycle events.
//!
//! A [`Client`](crate::net::Client) notifies its [`Emitter`] at three points of
//! every request attempt:
//!
//! - [`EventName::Before`]: the request is about to be handed to the transport.
//!   Listeners may still change it (headers, body).
//! - [`EventName::Complete`]: the transport returned a response, whatever its
//!   status code.
//! - [`EventName::Error`]: the transport failed without a response.
//!
//! Listeners are kept sorted by priority (higher first). Sorting happens when a
//! listener is attached, never while emitting. Listeners with equal priority
//! are notified in attachment order.
//!
//! A listener on `Complete` or `Error` may replace the outcome of the attempt
//! with [`TransferEvent::intercept`], which stops the event from reaching the
//! remaining listeners.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::net::{Request, TransferEvent};

/// Priority for listeners that must run before everything else.
pub const EARLY: i32 = 10000;
/// Priority for listeners that must run after everything else.
pub const LATE: i32 = -10000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    Before,
    Complete,
    Error,
}

impl EventName {
    pub const ALL: [EventName; 3] = [EventName::Before, EventName::Complete, EventName::Error];
}

impl Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventName::Before => write!(f, "request.before_send"),
            EventName::Complete => write!(f, "request.complete"),
            EventName::Error => write!(f, "request.error"),
        }
    }
}

/// An event as handed to listeners.
pub enum Event<'e, 'c> {
    Before(&'e mut Request),
    Complete(&'e mut TransferEvent<'c>),
    Error(&'e mut TransferEvent<'c>),
}

impl Event<'_, '_> {
    pub fn name(&self) -> EventName {
        match self {
            Event::Before(_) => EventName::Before,
            Event::Complete(_) => EventName::Complete,
            Event::Error(_) => EventName::Error,
        }
    }

    pub fn request(&self) -> &Request {
        match self {
            Event::Before(request) => request,
            Event::Complete(transfer) | Event::Error(transfer) => transfer.request(),
        }
    }

    pub fn is_propagation_stopped(&self) -> bool {
        match self {
            Event::Before(_) => false,
            Event::Complete(transfer) | Event::Error(transfer) => transfer.is_propagation_stopped(),
        }
    }
}

/// Something that wants to be notified about request lifecycle events.
pub trait Listener: Send + Sync {
    /// Returns the priority to register with for `name`, or `None` when the
    /// listener is not interested in that event.
    fn handles(&self, name: EventName) -> Option<i32>;

    fn invoke(&self, event: &mut Event<'_, '_>);
}

struct Registration {
    priority: i32,
    listener: Arc<dyn Listener>,
}

/// Priority ordered listener registry.
#[derive(Default)]
pub struct Emitter {
    listeners: HashMap<EventName, Vec<Registration>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for every event it handles.
    pub fn attach(&mut self, listener: Arc<dyn Listener>) {
        for name in EventName::ALL {
            let Some(priority) = listener.handles(name) else {
                continue;
            };

            let list = self.listeners.entry(name).or_default();
            let idx = list.partition_point(|r| r.priority >= priority);
            list.insert(
                idx,
                Registration {
                    priority,
                    listener: Arc::clone(&listener),
                },
            );
        }
    }

    /// Removes `listener` from all events. Returns false if it was not attached.
    pub fn detach(&mut self, listener: &Arc<dyn Listener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut found = false;

        for list in self.listeners.values_mut() {
            let before = list.len();
            list.retain(|r| Arc::as_ptr(&r.listener) as *const () != target);
            found |= list.len() != before;
        }

        found
    }

    /// Listeners for `name` in notification order.
    pub fn listeners(&self, name: EventName) -> impl Iterator<Item = &Arc<dyn Listener>> {
        self.listeners
            .get(&name)
            .into_iter()
            .flat_map(|list| list.iter().map(|r| &r.listener))
    }

    pub fn has_listeners(&self, name: EventName) -> bool {
        self.listeners.get(&name).is_some_and(|l| !l.is_empty())
    }

    /// Notifies all listeners of `event`, stopping early when a listener
    /// stopped propagation.
    pub fn emit(&self, event: &mut Event<'_, '_>) {
        let Some(list) = self.listeners.get(&event.name()) else {
            return;
        };

        for registration in list {
            registration.listener.invoke(event);
            if event.is_propagation_stopped() {
                log::trace!("propagation of {} stopped", event.name());
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{TransferError, TransportErrorKind};
    use crate::net::testing::ScriptedTransport;
    use crate::net::{Client, Response, TransferStats};
    use std::sync::Mutex;

    struct Recorder {
        tag: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
        stop: bool,
    }

    impl Listener for Recorder {
        fn handles(&self, name: EventName) -> Option<i32> {
            (name != EventName::Error).then_some(self.priority)
        }

        fn invoke(&self, event: &mut Event<'_, '_>) {
            self.log.lock().unwrap().push(self.tag);
            if self.stop {
                if let Event::Complete(transfer) = event {
                    transfer.stop_propagation();
                }
            }
        }
    }

    fn recorder(tag: &'static str, priority: i32, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn Listener> {
        Arc::new(Recorder {
            tag,
            priority,
            log: Arc::clone(log),
            stop: false,
        })
    }

    #[test]
    fn notifies_by_priority_and_keeps_attachment_order_on_ties() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter = Emitter::new();
        emitter.attach(recorder("low", LATE, &log));
        emitter.attach(recorder("mid-1", 0, &log));
        emitter.attach(recorder("high", EARLY, &log));
        emitter.attach(recorder("mid-2", 0, &log));

        let mut req = Request::get("http://example.com/").unwrap();
        emitter.emit(&mut Event::Before(&mut req));

        assert_eq!(*log.lock().unwrap(), vec!["high", "mid-1", "mid-2", "low"]);
        assert!(emitter.has_listeners(EventName::Complete));
        assert!(!emitter.has_listeners(EventName::Error));
    }

    #[test]
    fn detach_removes_listener_from_all_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter = Emitter::new();
        let a = recorder("a", 0, &log);
        let b = recorder("b", 0, &log);
        emitter.attach(Arc::clone(&a));
        emitter.attach(Arc::clone(&b));

        assert!(emitter.detach(&a));
        assert!(!emitter.detach(&a));
        assert_eq!(emitter.listeners(EventName::Before).count(), 1);
        assert_eq!(emitter.listeners(EventName::Complete).count(), 1);

        let mut req = Request::get("http://example.com/").unwrap();
        emitter.emit(&mut Event::Before(&mut req));
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn stopped_propagation_skips_remaining_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter = Emitter::new();
        emitter.attach(Arc::new(Recorder {
            tag: "stopper",
            priority: 10,
            log: Arc::clone(&log),
            stop: true,
        }));
        emitter.attach(recorder("never", 0, &log));

        let client = Client::new(Box::new(ScriptedTransport::new(vec![])));
        let mut req = Request::get("http://example.com/").unwrap();
        let resp = Response::new(req.url().clone(), 200);
        let mut transfer = TransferEvent::new(&client, &mut req, Ok(resp), TransferStats::default());
        emitter.emit(&mut Event::Complete(&mut transfer));

        assert_eq!(*log.lock().unwrap(), vec!["stopper"]);
    }

    #[test]
    fn error_event_exposes_request() {
        let client = Client::new(Box::new(ScriptedTransport::new(vec![])));
        let mut req = Request::get("http://example.com/x").unwrap();
        let err = TransferError::new(TransportErrorKind::GotNothing, "empty reply");
        let mut transfer = TransferEvent::new(&client, &mut req, Err(err), TransferStats::default());

        let event = Event::Error(&mut transfer);
        assert_eq!(event.name(), EventName::Error);
        assert_eq!(event.request().path(), "/x");
        assert_eq!(event.name().to_string(), "request.error");
    }
}
