//! Byte-oriented transport abstraction for the NDN client core (spec
//! §4.4): TCP, UDP, Unix-domain, and in-memory transports behind one
//! narrow `Transport` trait. The core above this crate never names a
//! concrete transport.

mod config;
mod error;
mod memory;
mod tcp;
mod transport;
mod udp;
mod unix;

pub use config::{TransportOptions, DEFAULT_NDN_PORT};
pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;
pub use transport::{resolve_locality, ConnectionInfo, Transport};
pub use udp::UdpTransport;
pub use unix::UnixTransport;
