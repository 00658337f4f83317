//! The [`Cookie`] value type.
//!
//! A cookie is created either by parsing a single `Set-Cookie` response header
//! value ([`Cookie::parse`]) or programmatically via [`Cookie::new`] and the
//! `with_*` setters. It carries all attributes found on the wire and knows how
//! to match itself against a request host and path (RFC 6265 §5.1.3 and
//! §5.1.4).
//!
//! Timestamps (`expires`) are unix timestamps in seconds. A `Max-Age`
//! attribute is converted to an absolute `expires` as soon as the cookie is
//! created, unless an explicit `Expires` was given.
//!
//! The serde representation doubles as the persisted record format used by the
//! cookie stores:
//!
//! ```json
//! { "Name": "sid", "Value": "abc", "Domain": "example.com", "Path": "/",
//!   "Expires": 1767225599, "Secure": true, "Discard": false, "HttpOnly": true }
//! ```
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::errors::{CookieParseError, ValidationError};

/// Latest timestamp `httpdate` can render (9999-12-31T23:59:59Z).
const MAX_HTTP_DATE: i64 = 253_402_300_799;

/// Current time as a unix timestamp in seconds.
pub(crate) fn now_timestamp() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// A single HTTP cookie as received in a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value, surrounding quotes stripped.
    pub value: String,

    /// Domain scoping. Empty means "the host of the request that set it" and is
    /// filled in by the jar when extracting cookies from a response.
    pub domain: String,

    /// Path scoping, `/` unless the server said otherwise.
    pub path: String,

    /// Relative lifetime in seconds, as received.
    #[serde(rename = "Max-Age", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,

    /// Absolute expiry as a unix timestamp. `None` for session cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Only send the cookie over `https`.
    pub secure: bool,

    /// Session cookie: never persisted across application restarts.
    pub discard: bool,

    #[serde(rename = "HttpOnly")]
    pub http_only: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "Comment-Url", skip_serializing_if = "Option::is_none")]
    pub comment_url: Option<String>,

    /// Ports the cookie may be sent to (RFC 2965). Empty means any port.
    #[serde(rename = "Port", skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,

    /// Attributes without a dedicated field (e.g. `SameSite`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Default for Cookie {
    fn default() -> Self {
        Self {
            name: String::new(),
            value: String::new(),
            domain: String::new(),
            path: "/".to_string(),
            max_age: None,
            expires: None,
            version: None,
            secure: false,
            discard: false,
            http_only: false,
            comment: None,
            comment_url: None,
            ports: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }
}

impl Cookie {
    /// Creates a cookie with the given name and value and default attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_expires(mut self, timestamp: i64) -> Self {
        self.expires = Some(timestamp);
        self
    }

    /// Sets `Max-Age`. When no explicit expiry is set yet, `expires` becomes
    /// now + `seconds`.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        if self.expires.is_none() {
            self.expires = Some(now_timestamp().saturating_add(seconds));
        }
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_discard(mut self, discard: bool) -> Self {
        self.discard = discard;
        self
    }

    /// Parses a single `Set-Cookie` header value.
    ///
    /// The first `name=value` pair is the cookie itself, every following
    /// `;`-separated piece is an attribute. Attribute names are matched
    /// case-insensitively; unknown attributes end up in [`Cookie::attributes`].
    pub fn parse(header: &str) -> Result<Cookie, CookieParseError> {
        let mut pieces = header.split(';').map(str::trim).filter(|p| !p.is_empty());

        let first = pieces.next().ok_or_else(|| parse_error(header, "empty header"))?;
        let (name, value) = first
            .split_once('=')
            .ok_or_else(|| parse_error(header, "the first pair must be name=value"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(parse_error(header, "missing cookie name"));
        }

        let mut cookie = Cookie::new(name, unquote(value));

        for part in pieces {
            let (key, value) = match part.split_once('=') {
                Some((k, v)) => (k.trim(), Some(unquote(v))),
                None => (part, None),
            };

            match key.to_ascii_lowercase().as_str() {
                "domain" => cookie.domain = value.unwrap_or_default().to_string(),
                "path" => {
                    // RFC 6265 §5.2.4: anything not starting with a slash means the default path
                    cookie.path = match value {
                        Some(p) if p.starts_with('/') => p.to_string(),
                        _ => "/".to_string(),
                    };
                }
                "max-age" => cookie.max_age = value.and_then(|v| v.parse().ok()),
                "expires" => cookie.expires = value.and_then(parse_cookie_date),
                "version" => cookie.version = value.map(str::to_string),
                "secure" => cookie.secure = true,
                "port" => {
                    cookie.ports = value
                        .map(|v| v.split(',').filter_map(|p| p.trim().parse().ok()).collect())
                        .unwrap_or_default();
                }
                "discard" => cookie.discard = true,
                "comment" => cookie.comment = value.map(str::to_string),
                "comment-url" | "commenturl" => cookie.comment_url = value.map(str::to_string),
                "httponly" => cookie.http_only = true,
                _ => {
                    cookie
                        .attributes
                        .insert(key.to_string(), value.unwrap_or_default().to_string());
                }
            }
        }

        if cookie.expires.is_none() {
            if let Some(age) = cookie.max_age {
                cookie.expires = Some(now_timestamp().saturating_add(age));
            }
        }

        Ok(cookie)
    }

    /// Checks the cookie can be stored: it needs a legal name and a domain.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name.bytes().any(is_invalid_name_byte) {
            return Err(ValidationError::InvalidName(self.name.clone()));
        }
        if self.domain.trim_start_matches('.').is_empty() {
            return Err(ValidationError::EmptyDomain);
        }
        Ok(())
    }

    /// Two cookies share an identity when domain, path and name are equal.
    /// A jar never holds two cookies with the same identity.
    pub fn same_identity(&self, other: &Cookie) -> bool {
        self.domain == other.domain && self.path == other.path && self.name == other.name
    }

    /// RFC 6265 §5.1.3 domain-match of `host` against this cookie's domain.
    ///
    /// A leading dot on the cookie domain is ignored. IP addresses only match
    /// exactly, never as a "subdomain".
    pub fn matches_domain(&self, host: &str) -> bool {
        let cookie_domain = self.domain.trim_start_matches('.');

        if cookie_domain.is_empty() || host.eq_ignore_ascii_case(cookie_domain) {
            return true;
        }

        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        if bare_host.parse::<IpAddr>().is_ok() {
            return false;
        }

        let host = host.to_ascii_lowercase();
        let cookie_domain = cookie_domain.to_ascii_lowercase();
        host.len() > cookie_domain.len()
            && host.ends_with(&cookie_domain)
            && host.as_bytes()[host.len() - cookie_domain.len() - 1] == b'.'
    }

    /// RFC 6265 §5.1.4 path-match of `request_path` against this cookie's path.
    pub fn matches_path(&self, request_path: &str) -> bool {
        let request_path = if request_path.is_empty() { "/" } else { request_path };
        let cookie_path = self.path.as_str();

        if cookie_path.is_empty() || cookie_path == request_path {
            return true;
        }
        if !request_path.starts_with(cookie_path) {
            return false;
        }
        cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/')
    }

    pub fn matches_port(&self, port: u16) -> bool {
        self.ports.is_empty() || self.ports.contains(&port)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_timestamp())
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires.is_some_and(|expires| now > expires)
    }

    /// A session cookie is either marked `Discard` or has no expiry at all.
    pub fn is_session(&self) -> bool {
        self.discard || self.expires.is_none()
    }

    /// The value as it should appear in a `Cookie` request header: values with
    /// `;` or `,` get quoted unless they already are.
    pub fn header_value(&self) -> Cow<'_, str> {
        let v = self.value.as_str();
        if !v.starts_with('"') && !v.ends_with('"') && v.contains([';', ',']) {
            Cow::Owned(format!("\"{v}\""))
        } else {
            Cow::Borrowed(v)
        }
    }
}

impl FromStr for Cookie {
    type Err = CookieParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cookie::parse(s)
    }
}

/// Renders the cookie as a `Set-Cookie` header value.
impl Display for Cookie {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        write!(f, "; Path={}", self.path)?;
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", format_cookie_date(expires))?;
        }
        if let Some(age) = self.max_age {
            write!(f, "; Max-Age={age}")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        if self.discard {
            write!(f, "; Discard")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

fn parse_error(header: &str, reason: &'static str) -> CookieParseError {
    CookieParseError {
        header: header.to_string(),
        reason,
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Control characters, space and the RFC 2616 separators (brackets excluded,
/// plenty of servers use them in names).
fn is_invalid_name_byte(b: u8) -> bool {
    b <= 32
        || b == 127
        || matches!(
            b,
            b'"' | b'(' | b')' | b',' | b'/' | b':' | b';' | b'<' | b'=' | b'>' | b'?' | b'@' | b'\\'
                | b'{' | b'}'
        )
}

/// Parses an `Expires` attribute. Accepts the HTTP date formats, the old
/// Netscape dashed variant (`Sun, 06-Nov-1994 08:49:37 GMT`) and plain unix
/// timestamps.
pub(crate) fn parse_cookie_date(value: &str) -> Option<i64> {
    if let Ok(ts) = value.parse::<i64>() {
        return Some(ts);
    }

    let parsed = httpdate::parse_http_date(value)
        .or_else(|_| httpdate::parse_http_date(&value.replace('-', " ")))
        .ok()?;

    Some(match parsed.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    })
}

/// Formats a unix timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub(crate) fn format_cookie_date(timestamp: i64) -> String {
    let ts = timestamp.clamp(0, MAX_HTTP_DATE) as u64;
    httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_secs(ts))
}
