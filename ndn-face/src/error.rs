//! Error type for the Face dispatch core (spec §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Packet(#[from] ndn_common::Error),

    #[error(transparent)]
    Transport(#[from] ndn_transport::Error),

    /// Programming error: invalid argument, duplicate ID. Per spec §7,
    /// these are a distinct error kind rather than a panic.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A registration command timed out, was Nacked, or the forwarder
    /// returned a non-success ControlResponse.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
