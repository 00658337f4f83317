use std::fmt::Display;

use http::header::{HeaderName, InvalidHeaderValue};
use http::{HeaderMap, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// A unique identifier for a request, used to correlate log lines of all
/// attempts of the same logical request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per request bookkeeping that survives re-sends of the same request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    /// Number of retries already issued for this request.
    pub retries: u32,
}

/// An outgoing HTTP request.
///
/// A request is owned by the caller for its whole lifetime; the client only
/// borrows it while sending, so retries re-send the very same value (including
/// its [`RequestState`]).
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
    state: RequestState,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            id: RequestId::new(),
            method,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
            state: RequestState::default(),
        }
    }

    /// Creates a `GET` request for `url`.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host name of the request URL, empty for host-less URLs.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the first value of header `name` if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replaces all values of header `name` with `value`.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), InvalidHeaderValue> {
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RequestState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::COOKIE;

    #[test]
    fn exposes_url_parts() {
        let req = Request::get("https://www.example.com:8443/admin/page?x=1").unwrap();
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.host(), "www.example.com");
        assert_eq!(req.path(), "/admin/page");
        assert_eq!(req.scheme(), "https");
        assert_eq!(req.state().retries, 0);
    }

    #[test]
    fn header_roundtrip() {
        let mut req = Request::get("http://example.com/").unwrap();
        assert!(req.header("cookie").is_none());

        req.set_header(COOKIE, "a=b").unwrap();
        assert_eq!(req.header("Cookie"), Some("a=b"));

        req.set_header(COOKIE, "c=d").unwrap();
        assert_eq!(req.headers().get_all(COOKIE).iter().count(), 1);
        assert_eq!(req.header("cookie"), Some("c=d"));

        req.remove_header("cookie");
        assert!(req.header("cookie").is_none());
    }

    #[test]
    fn rejects_invalid_header_values() {
        let mut req = Request::get("http://example.com/").unwrap();
        assert!(req.set_header(COOKIE, "a=b\r\nX-Evil: 1").is_err());
    }

    #[test]
    fn ids_are_unique() {
        let a = Request::get("http://example.com/").unwrap();
        let b = a.clone();
        let c = Request::get("http://example.com/").unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }
}
