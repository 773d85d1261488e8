//! NDN-TLV wire codec, Name/Component model, and packet model for an NDN
//! client core.
//!
//! This crate is transport-agnostic: it knows how to encode and decode
//! Interest, Data, and NDNLPv2 packets, and how to sign and verify them,
//! but owns no sockets. `ndn-transport` and `ndn-face` build on top of it.

pub mod control;
pub mod data;
pub mod element_reader;
pub mod error;
pub mod interest;
pub mod lp;
pub mod metrics;
pub mod name;
pub mod signature;
pub mod signing;
pub mod tlv;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
