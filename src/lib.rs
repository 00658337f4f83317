pub mod config;
pub mod cookies;
pub mod errors;
pub mod events;
pub mod formatter;
pub mod net;
pub mod retry;

pub use config::{ClientConfig, ClientConfigBuilder, ClientConfigError};
pub use errors::{ClientError, CookieError, TransferError, TransportErrorKind};
pub use net::{Client, Request, Response};
