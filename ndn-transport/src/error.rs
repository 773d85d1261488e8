//! Error type for the transport crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Packet(#[from] ndn_common::Error),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is closed")]
    Closed,

    #[error("send would block: {0}")]
    WouldBlock(String),
}

pub type Result<T> = std::result::Result<T, Error>;
