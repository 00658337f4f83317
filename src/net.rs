//! Request/response model, transports and the event driven [`Client`].

mod client;
mod request;
mod response;
mod transfer;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use request::{Request, RequestId, RequestState};
pub use response::Response;
pub use transfer::{TransferEvent, TransferStats};
pub use transport::{ReqwestTransport, Transport};
