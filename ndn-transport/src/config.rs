//! Configuration for the transport abstraction (spec §4.4).
//!
//! Follows the teacher's all-optional-with-defaults options bag shape
//! (`ServerOptions`/`ClientOptions`), generalized from QUIC connection
//! tuning knobs to the options that apply across TCP/UDP/Unix/memory.

use std::time::Duration;

/// Default NDN port for both TCP and UDP (spec §6).
pub const DEFAULT_NDN_PORT: u16 = 6363;

/// Options shared by every concrete transport.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Maximum size of a single TLV element the element reader will
    /// accept (spec §4.3; `None` uses the reader's own default of 8 MiB).
    pub max_element_size: Option<usize>,

    /// How long `connect` waits before giving up.
    pub connect_timeout: Duration,

    /// Capacity of the internal channel buffering decoded elements between
    /// the reader task and `process_events`/`recv_async`.
    pub element_channel_capacity: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_element_size: None,
            connect_timeout: Duration::from_secs(10),
            element_channel_capacity: 128,
        }
    }
}
