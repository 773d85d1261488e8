//! Error types for the NDN packet engine.

use thiserror::Error;

/// All possible errors that can occur while encoding, decoding, or
/// constructing NDN packets.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or truncated TLV structure.
    #[error("TLV decode error: {0}")]
    Tlv(String),

    /// A TLV element was decoded, but its type did not match what the
    /// caller expected (e.g. a Name TLV where an Interest was expected).
    #[error("NDN packet error: {0}")]
    NdnPacket(String),

    /// Name/Component construction or parsing error (bad URI, oversized
    /// component, etc).
    #[error("Name error: {0}")]
    Name(String),

    /// The NDNLPv2 envelope carried more than one fragment; the core does
    /// not reassemble, and drops the packet with this diagnostic.
    #[error("NDNLPv2 error: {0}")]
    Lp(String),

    /// Signing or verification failure reported by the signing façade.
    #[error("signing error: {0}")]
    Signing(String),

    /// I/O error surfaced while reading or writing wire bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Programming error: invalid argument, duplicate ID, etc. Per spec,
    /// these are a distinct error kind in release builds rather than a panic.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Catch-all for conditions that don't warrant a dedicated variant.
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
