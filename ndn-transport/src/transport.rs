//! The transport abstraction (spec §4.4): a narrow interface implemented
//! separately by each concrete transport. The core never names a concrete
//! transport directly (spec §9 "Transport polymorphism").

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};
use std::sync::{Mutex, OnceLock};

/// Identifies an endpoint to connect to. Distinct transports interpret
/// different variants; `is_local` dispatches on this too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionInfo {
    Tcp { host: String, port: u16 },
    Udp { host: String, port: u16 },
    Unix { path: String },
    /// In-process loopback, keyed by an arbitrary shared name so two
    /// `MemoryTransport`s constructed with the same `id` are connected.
    Memory { id: String },
}

impl ConnectionInfo {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        ConnectionInfo::Tcp { host: host.into(), port }
    }

    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        ConnectionInfo::Udp { host: host.into(), port }
    }

    pub fn unix(path: impl Into<String>) -> Self {
        ConnectionInfo::Unix { path: path.into() }
    }

    pub fn memory(id: impl Into<String>) -> Self {
        ConnectionInfo::Memory { id: id.into() }
    }
}

fn locality_cache() -> &'static Mutex<HashMap<ConnectionInfo, bool>> {
    static CACHE: OnceLock<Mutex<HashMap<ConnectionInfo, bool>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn is_loopback_host(host: &str) -> bool {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_loopback_ip(ip);
    }
    // Resolving a hostname here may block; spec §4.4 explicitly permits
    // this for `isLocal`.
    match (host, 0u16).to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<_> = addrs.collect();
            !addrs.is_empty() && addrs.iter().all(|a| is_loopback_ip(a.ip()))
        }
        Err(_) => false,
    }
}

fn is_loopback_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4 == Ipv4Addr::LOCALHOST || v4.octets()[0] == 127,
        IpAddr::V6(v6) => v6 == Ipv6Addr::LOCALHOST,
    }
}

/// Resolves and caches whether `info` refers to a local endpoint (spec
/// §4.4: "The result is cached per ConnectionInfo"). Unix transports are
/// unconditionally local; TCP/UDP are local iff the remote address
/// resolves to a loopback address.
pub fn resolve_locality(info: &ConnectionInfo) -> bool {
    if let ConnectionInfo::Unix { .. } = info {
        return true;
    }
    if let ConnectionInfo::Memory { .. } = info {
        return true;
    }
    let cache = locality_cache();
    if let Some(&cached) = cache.lock().unwrap().get(info) {
        return cached;
    }
    let result = match info {
        ConnectionInfo::Tcp { host, .. } | ConnectionInfo::Udp { host, .. } => is_loopback_host(host),
        ConnectionInfo::Unix { .. } | ConnectionInfo::Memory { .. } => unreachable!(),
    };
    cache.lock().unwrap().insert(info.clone(), result);
    result
}

/// Byte-oriented duplex channel, implemented separately per concrete
/// transport (spec §4.4). `process_events` is the synchronous-poll-mode
/// entry point; `recv_async` is the asynchronous-reactor-mode entry
/// point. An implementation may back both with the same internal queue.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, info: ConnectionInfo) -> Result<()>;

    fn is_local(&self, info: &ConnectionInfo) -> bool {
        resolve_locality(info)
    }

    async fn send(&mut self, bytes: Bytes) -> Result<()>;

    /// Non-blocking: drains whatever whole elements are currently
    /// buffered, invoking `on_element` once per element, and returns how
    /// many were delivered.
    fn process_events(&mut self, on_element: &mut dyn FnMut(Bytes)) -> Result<usize>;

    /// Awaits the next whole element; used by the asynchronous reactor
    /// mode. Returns `None` once the transport is closed.
    async fn recv_async(&mut self) -> Option<Bytes>;

    fn is_connected(&self) -> bool;

    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_and_memory_are_always_local() {
        assert!(resolve_locality(&ConnectionInfo::unix("/tmp/nfd.sock")));
        assert!(resolve_locality(&ConnectionInfo::memory("test")));
    }

    #[test]
    fn loopback_literal_ip_is_local() {
        assert!(resolve_locality(&ConnectionInfo::tcp("127.0.0.1", 6363)));
        assert!(resolve_locality(&ConnectionInfo::tcp("::1", 6363)));
    }

    #[test]
    fn non_loopback_literal_ip_is_not_local() {
        assert!(!resolve_locality(&ConnectionInfo::tcp("8.8.8.8", 6363)));
    }
}
