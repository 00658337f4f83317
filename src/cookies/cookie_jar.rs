//! Cookie jar abstraction and the default in-memory implementation.
//!
//! A **cookie jar** holds all cookies of one client. The client passes
//! request/response metadata to the jar so it can update and query cookies
//! appropriately.
//!
//! ## Storage rules
//! - At most one cookie per (`domain`, `path`, `name`) is stored. A second
//!   cookie with the same identity replaces the stored one when the stored one
//!   is a session cookie and the new one is not, when the new one expires
//!   later, or when the value changed. Otherwise the add is a no-op.
//! - A replaced cookie is removed and the new one appended, so enumeration
//!   order is insertion order of the current values.
//! - Invalid cookies (no name, illegal name, no domain) are dropped in
//!   [`ValidationMode::Lenient`] and rejected with an error in
//!   [`ValidationMode::Strict`].
//!
//! ## Matching
//! A cookie matches a request URL when its domain and path match (RFC 6265),
//! it is not expired, its port list (if any) contains the request port and,
//! for `Secure` cookies, the scheme is `https`. Matching cookies are returned
//! most specific path first.
//!
//! This module is **not** internally synchronized. Share a jar through a
//! [`CookieJarHandle`].
use std::sync::{Arc, RwLock};

use http::header::{COOKIE, SET_COOKIE};
use http::HeaderMap;
use url::Url;

use crate::cookies::cookie::now_timestamp;
use crate::cookies::Cookie;
use crate::errors::CookieError;
use crate::net::Request;

/// A handle to a cookie jar trait.
///
/// This is a reference-counted, read/write-locked pointer to a type-erased
/// [`CookieJar`]. Take a **read lock** for queries and a **write lock** for
/// mutations. Since `add` is a read-then-write sequence, all access to a shared
/// jar must go through this one lock.
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// What a jar does with a cookie that fails validation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Refuse the cookie with an error.
    Strict,
    /// Silently drop the cookie.
    #[default]
    Lenient,
}

/// A cookie jar keeps the cookies for one client.
pub trait CookieJar: Send + Sync {
    /// Stores `cookie`, resolving conflicts with an existing cookie of the
    /// same identity.
    ///
    /// Returns `Ok(true)` when the cookie was stored, `Ok(false)` when it was
    /// dropped (invalid in lenient mode, or not newer than the stored one).
    fn add(&mut self, cookie: Cookie) -> Result<bool, CookieError>;

    /// All stored cookies that should be sent with a request to `url`.
    fn matching_cookies(&self, url: &Url) -> Vec<Cookie>;

    /// Removes expired cookies. Returns the number of removed cookies.
    fn remove_expired(&mut self) -> usize;

    /// Removes session cookies (`Discard` or without expiry).
    fn remove_temporary(&mut self) -> usize;

    /// Removes cookies, narrowing down from domain to path to name.
    ///
    /// - no `domain`: clears the jar,
    /// - `domain` only: every cookie matching the domain,
    /// - `domain` and `path`: every cookie matching both,
    /// - all three: the cookie with that name matching both.
    ///
    /// `name` is ignored without a `path`.
    fn remove(&mut self, domain: Option<&str>, path: Option<&str>, name: Option<&str>) -> usize;

    /// Removes all cookies from the jar.
    fn clear(&mut self);

    /// Clones of all stored cookies, in storage order.
    fn cookies(&self) -> Vec<Cookie>;

    fn len(&self) -> usize;

    /// The cookies that survive a [`serialize`](Self::serialize).
    fn persistable_cookies(&self) -> Vec<Cookie>;

    /// Replaces the complete contents of the jar.
    ///
    /// Every cookie goes through [`add`](Self::add), so invalid cookies are
    /// dropped (or reported in strict mode) and duplicate identities collapse
    /// into one. In strict mode the first validation error is returned after
    /// all cookies were processed. Returns the size of the jar afterwards.
    fn replace_all(&mut self, cookies: Vec<Cookie>) -> Result<usize, CookieError> {
        self.clear();

        let mut first_error = None;
        for cookie in cookies {
            if let Err(e) = self.add(cookie) {
                log::warn!("Rejected stored cookie: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(self.len()),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `Cookie` request header value to send for `url`, if any.
    fn request_cookie_header(&self, url: &Url) -> Option<String> {
        let header = self
            .matching_cookies(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.header_value()))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    /// Sets the `Cookie` header of `request`. Leaves the request untouched when
    /// no cookie matches.
    fn add_cookie_header(&self, request: &mut Request) {
        let Some(header) = self.request_cookie_header(request.url()) else {
            return;
        };

        if let Err(e) = request.set_header(COOKIE, &header) {
            log::warn!("Cannot send cookies to {}: {}", request.url(), e);
        }
    }

    /// Stores every cookie found in the `Set-Cookie` headers of a response to
    /// a request for `url`.
    ///
    /// Cookies without a domain get the request host. A header that fails to
    /// parse or validate is skipped without affecting the others. In strict
    /// mode the first validation error is returned after all headers were
    /// processed. Returns the number of stored cookies.
    fn add_cookies_from_response(&mut self, url: &Url, headers: &HeaderMap) -> Result<usize, CookieError> {
        let host = url.host_str().unwrap_or_default();
        let mut stored = 0;
        let mut first_error = None;

        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                log::warn!("Ignoring non-ASCII Set-Cookie header from {}", url);
                continue;
            };

            let mut cookie = match Cookie::parse(raw) {
                Ok(cookie) => cookie,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };
            if cookie.domain.is_empty() {
                cookie.domain = host.to_string();
            }

            match self.add(cookie) {
                Ok(true) => stored += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Rejected cookie from {}: {}", url, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(stored),
        }
    }

    /// Serializes the persistable cookies into a JSON array of records.
    fn serialize(&self) -> Result<String, CookieError> {
        let cookies = self.persistable_cookies();
        serde_json::to_string(&cookies).map_err(|e| CookieError::Store(e.into()))
    }

    /// Replaces the contents of the jar with the records in `json`, see
    /// [`replace_all`](Self::replace_all).
    fn restore(&mut self, json: &str) -> Result<(), CookieError> {
        let cookies: Vec<Cookie> = serde_json::from_str(json).map_err(|e| CookieError::Store(e.into()))?;
        self.replace_all(cookies)?;
        Ok(())
    }
}

/// Default cookie jar, in memory only.
#[derive(Debug, Clone, Default)]
pub struct DefaultCookieJar {
    cookies: Vec<Cookie>,
    mode: ValidationMode,
    keep_session_cookies: bool,
}

impl DefaultCookieJar {
    /// Creates an empty lenient cookie jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty jar that rejects invalid cookies with an error.
    pub fn strict() -> Self {
        Self::with_mode(ValidationMode::Strict)
    }

    pub fn with_mode(mode: ValidationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Also persist cookies without an expiry (discard cookies are never persisted).
    pub fn keep_session_cookies(mut self, keep: bool) -> Self {
        self.keep_session_cookies = keep;
        self
    }

    /// Builds a jar of session cookies for `domain` from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I, domain: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut jar = Self::new();
        for (name, value) in pairs {
            let cookie = Cookie::new(name, value).with_domain(domain).with_discard(true);
            // Lenient mode never errors
            let _ = jar.add(cookie);
        }
        jar
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn into_handle(self) -> CookieJarHandle {
        Arc::new(RwLock::new(self))
    }

    fn retain(&mut self, keep: impl FnMut(&Cookie) -> bool) -> usize {
        let before = self.cookies.len();
        self.cookies.retain(keep);
        before - self.cookies.len()
    }
}

/// Conflict resolution between a stored cookie and a new one with the same
/// identity. Precedence: session status, later expiry, changed value.
fn supersedes(new: &Cookie, stored: &Cookie) -> bool {
    if stored.discard && !new.discard {
        return true;
    }
    // `None` orders before any timestamp
    if new.expires > stored.expires {
        return true;
    }
    new.value != stored.value
}

impl CookieJar for DefaultCookieJar {
    fn add(&mut self, cookie: Cookie) -> Result<bool, CookieError> {
        if let Err(e) = cookie.validate() {
            return match self.mode {
                ValidationMode::Strict => Err(e.into()),
                ValidationMode::Lenient => {
                    log::debug!("Dropping cookie {:?}: {}", cookie.name, e);
                    Ok(false)
                }
            };
        }

        if let Some(idx) = self.cookies.iter().position(|c| c.same_identity(&cookie)) {
            if !supersedes(&cookie, &self.cookies[idx]) {
                return Ok(false);
            }
            self.cookies.remove(idx);
        }

        self.cookies.push(cookie);
        Ok(true)
    }

    fn matching_cookies(&self, url: &Url) -> Vec<Cookie> {
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        let port = url.port_or_known_default().unwrap_or_default();
        let is_https = url.scheme() == "https";
        let now = now_timestamp();

        let mut matching: Vec<Cookie> = self
            .cookies
            .iter()
            .filter(|c| c.matches_domain(host))
            .filter(|c| c.matches_path(path))
            .filter(|c| c.matches_port(port))
            .filter(|c| !c.secure || is_https)
            .filter(|c| !c.is_expired_at(now))
            .cloned()
            .collect();

        // Stable, so equal paths keep storage order
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    fn remove_expired(&mut self) -> usize {
        let now = now_timestamp();
        self.retain(|c| !c.is_expired_at(now))
    }

    fn remove_temporary(&mut self) -> usize {
        self.retain(|c| !c.is_session())
    }

    fn remove(&mut self, domain: Option<&str>, path: Option<&str>, name: Option<&str>) -> usize {
        let Some(domain) = domain else {
            let removed = self.cookies.len();
            self.cookies.clear();
            return removed;
        };

        match (path, name) {
            (None, _) => self.retain(|c| !c.matches_domain(domain)),
            (Some(path), None) => self.retain(|c| !(c.matches_domain(domain) && c.matches_path(path))),
            (Some(path), Some(name)) => {
                self.retain(|c| !(c.name == name && c.matches_domain(domain) && c.matches_path(path)))
            }
        }
    }

    fn clear(&mut self) {
        self.cookies.clear();
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.cookies.clone()
    }

    fn len(&self) -> usize {
        self.cookies.len()
    }

    fn persistable_cookies(&self) -> Vec<Cookie> {
        let now = now_timestamp();
        self.cookies
            .iter()
            .filter(|c| !c.discard && !c.is_expired_at(now))
            .filter(|c| c.expires.is_some() || self.keep_session_cookies)
            .cloned()
            .collect()
    }
}
