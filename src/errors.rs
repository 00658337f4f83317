use std::fmt::{Display, Formatter};

/// Reasons a cookie is refused by a jar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The cookie name must not be empty")]
    EmptyName,

    #[error("The cookie name must not contain invalid characters: {0:?}")]
    InvalidName(String),

    #[error("The cookie domain must not be empty")]
    EmptyDomain,
}

/// A `Set-Cookie` value that could not be turned into a cookie.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed Set-Cookie header {header:?}: {reason}")]
pub struct CookieParseError {
    pub header: String,
    pub reason: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("Invalid cookie: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Parse(#[from] CookieParseError),

    #[error("Cookie persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Failures of the persistence backends behind a [`CookieStore`](crate::cookies::CookieStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cookie data is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite_cookie_store")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] r2d2_sqlite::rusqlite::Error),

    #[cfg(feature = "sqlite_cookie_store")]
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Transport level failure classes.
///
/// These mirror the transient error classes of libcurl so that retry filters
/// can be configured with the usual list of "try again" conditions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    CouldntResolveHost,
    CouldntConnect,
    PartialFile,
    WriteError,
    ReadError,
    OperationTimedOut,
    SslConnectError,
    HttpPortFailed,
    GotNothing,
    SendError,
    RecvError,
    TooManyRedirects,
    Other,
}

impl TransportErrorKind {
    /// Numeric code of this error class, compatible with libcurl's `CURLcode`.
    pub fn code(&self) -> u32 {
        match self {
            TransportErrorKind::CouldntResolveHost => 6,
            TransportErrorKind::CouldntConnect => 7,
            TransportErrorKind::PartialFile => 18,
            TransportErrorKind::WriteError => 23,
            TransportErrorKind::ReadError => 26,
            TransportErrorKind::OperationTimedOut => 28,
            TransportErrorKind::SslConnectError => 35,
            TransportErrorKind::HttpPortFailed => 45,
            TransportErrorKind::TooManyRedirects => 47,
            TransportErrorKind::GotNothing => 52,
            TransportErrorKind::SendError => 55,
            TransportErrorKind::RecvError => 56,
            TransportErrorKind::Other => 0,
        }
    }
}

impl Display for TransportErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportErrorKind::CouldntResolveHost => "could not resolve host",
            TransportErrorKind::CouldntConnect => "could not connect",
            TransportErrorKind::PartialFile => "partial file",
            TransportErrorKind::WriteError => "write error",
            TransportErrorKind::ReadError => "read error",
            TransportErrorKind::OperationTimedOut => "operation timed out",
            TransportErrorKind::SslConnectError => "TLS connect error",
            TransportErrorKind::HttpPortFailed => "HTTP port failed",
            TransportErrorKind::GotNothing => "empty reply from server",
            TransportErrorKind::SendError => "failure sending data",
            TransportErrorKind::RecvError => "failure receiving data",
            TransportErrorKind::TooManyRedirects => "too many redirects",
            TransportErrorKind::Other => "transport error",
        };
        write!(f, "{s}")
    }
}

/// A request attempt that did not produce a response.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransferError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Failure to set up a [`Client`](crate::net::Client).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid client config: {0}")]
    Config(#[from] crate::config::ClientConfigError),

    #[error("Cannot create transport: {0}")]
    Transport(#[from] TransferError),
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::OperationTimedOut
        } else if e.is_connect() {
            classify_connect_error(&e)
        } else if e.is_redirect() {
            TransportErrorKind::TooManyRedirects
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::RecvError
        } else if e.is_request() {
            TransportErrorKind::SendError
        } else {
            TransportErrorKind::Other
        };

        TransferError::new(kind, e.to_string())
    }
}

/// reqwest reports DNS and TLS failures as plain connect errors, the source
/// chain is the only place that tells them apart.
fn classify_connect_error(e: &reqwest::Error) -> TransportErrorKind {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(e);
    while let Some(err) = source {
        let text = err.to_string().to_ascii_lowercase();
        if text.contains("dns") || text.contains("resolve") || text.contains("lookup") {
            return TransportErrorKind::CouldntResolveHost;
        }
        if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
            return TransportErrorKind::SslConnectError;
        }
        source = err.source();
    }
    TransportErrorKind::CouldntConnect
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_kinds_map_to_curl_codes() {
        assert_eq!(TransportErrorKind::CouldntResolveHost.code(), 6);
        assert_eq!(TransportErrorKind::OperationTimedOut.code(), 28);
        assert_eq!(TransportErrorKind::RecvError.code(), 56);
        assert_eq!(TransportErrorKind::Other.code(), 0);
    }

    #[test]
    fn transfer_error_display_includes_kind_and_message() {
        let e = TransferError::new(TransportErrorKind::CouldntConnect, "connection refused");
        assert_eq!(e.to_string(), "could not connect: connection refused");
    }

    #[test]
    fn validation_error_converts_into_cookie_error() {
        let e: CookieError = ValidationError::EmptyDomain.into();
        assert!(matches!(e, CookieError::Validation(ValidationError::EmptyDomain)));
        assert_eq!(e.to_string(), "Invalid cookie: The cookie domain must not be empty");
    }
}
