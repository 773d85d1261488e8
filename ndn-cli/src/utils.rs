//! Shared CLI plumbing: endpoint parsing and a `Face` builder.

use anyhow::{Context, Result};
use ndn_face::Face;
use ndn_transport::{ConnectionInfo, TcpTransport, Transport, TransportOptions, UnixTransport};
use std::time::{Duration, Instant};

/// Endpoint spec CLI commands accept: `host:port` for TCP, or a bare path
/// starting with `/` for a Unix-domain socket.
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix { path: String },
}

impl Endpoint {
    pub fn parse(spec: &str) -> Result<Self> {
        if let Some(path) = spec.strip_prefix("unix:") {
            return Ok(Endpoint::Unix { path: path.to_string() });
        }
        if spec.starts_with('/') {
            return Ok(Endpoint::Unix { path: spec.to_string() });
        }
        let (host, port) = spec
            .rsplit_once(':')
            .with_context(|| format!("expected host:port or a unix socket path, got '{spec}'"))?;
        let port: u16 = port.parse().with_context(|| format!("invalid port in '{spec}'"))?;
        Ok(Endpoint::Tcp { host: host.to_string(), port })
    }

    fn connection_info(&self) -> ConnectionInfo {
        match self {
            Endpoint::Tcp { host, port } => ConnectionInfo::tcp(host.clone(), *port),
            Endpoint::Unix { path } => ConnectionInfo::unix(path.clone()),
        }
    }
}

/// Connects to `endpoint` and wraps the transport in a `Face`.
pub async fn connect_face(endpoint: &Endpoint) -> Result<Face> {
    let info = endpoint.connection_info();
    let options = TransportOptions::default();

    let mut transport: Box<dyn Transport> = match endpoint {
        Endpoint::Tcp { .. } => Box::new(TcpTransport::new(options)),
        Endpoint::Unix { .. } => Box::new(UnixTransport::new(options)),
    };
    let is_local = transport.is_local(&info);
    transport.connect(info).await.context("failed to connect transport")?;

    Ok(Face::new(transport, is_local))
}

/// Polls `face.process_events()` until `deadline`, yielding briefly
/// between polls so the runtime can drive the transport's reader task.
pub async fn poll_until(face: &Face, deadline: Instant) -> Result<()> {
    while Instant::now() < deadline {
        face.process_events().await?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
