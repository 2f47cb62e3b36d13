pub mod batch;
pub mod connection;
pub mod fetcher;
pub mod negotiator;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;
pub mod wire;

pub use batch::{negotiate_all, BatchEntry};
pub use connection::{Connection, RequestError};
pub use fetcher::fetch_proposals;
pub use negotiator::{NegotiationConfig, NegotiationHooks, Negotiator, NoopHooks};
pub use session::Session;
pub use transport::{
    Endpoint, HttpTransport, ServiceReply, ServiceRequest, ServiceTransport, Ticket, TransportError,
};
