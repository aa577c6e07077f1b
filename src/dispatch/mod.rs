//! Outbound message dispatch — transport seam and method gateway.

pub mod gateway;
pub mod transport;

pub use gateway::{MessageGateway, SendOutcome, normalize_phone};
pub use transport::{HttpReply, HttpTransport, ReqwestTransport, TransportError};
