use std::sync::PoisonError;

use crate::cookies::CookieJarHandle;
use crate::events::{Event, EventName, Listener, EARLY};

/// Connects a cookie jar to a [`Client`](crate::net::Client).
///
/// Before a request is sent the matching cookies are added as `Cookie` header;
/// once a response arrived its `Set-Cookie` headers are stored in the jar.
pub struct CookieSubscriber {
    jar: CookieJarHandle,
}

impl CookieSubscriber {
    pub fn new(jar: CookieJarHandle) -> Self {
        Self { jar }
    }

    pub fn jar(&self) -> &CookieJarHandle {
        &self.jar
    }
}

impl Listener for CookieSubscriber {
    fn handles(&self, name: EventName) -> Option<i32> {
        match name {
            EventName::Before | EventName::Complete => Some(EARLY),
            EventName::Error => None,
        }
    }

    fn invoke(&self, event: &mut Event<'_, '_>) {
        match event {
            Event::Before(request) => {
                let jar = self.jar.read().unwrap_or_else(PoisonError::into_inner);
                jar.add_cookie_header(request);
            }
            Event::Complete(transfer) => {
                let Some(response) = transfer.response() else {
                    return;
                };
                let url = transfer.request().url().clone();

                let mut jar = self.jar.write().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = jar.add_cookies_from_response(&url, &response.headers) {
                    log::warn!("Not all cookies from {} were stored: {}", url, e);
                }
            }
            Event::Error(_) => {}
        }
    }
}
