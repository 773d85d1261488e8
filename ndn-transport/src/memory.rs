//! In-memory loopback transport (spec §4.4), mainly for tests and a
//! same-process producer/consumer pairing in the CLI.

use crate::error::{Error, Result};
use crate::transport::{ConnectionInfo, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

pub struct MemoryTransport {
    tx: Option<mpsc::Sender<Bytes>>,
    rx: Option<mpsc::Receiver<Bytes>>,
    connected: bool,
}

impl MemoryTransport {
    /// Builds two transports wired directly to each other; sending on one
    /// is immediately receivable on the other.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel(capacity);
        let (tx_b, rx_a) = mpsc::channel(capacity);
        (
            Self { tx: Some(tx_a), rx: Some(rx_a), connected: true },
            Self { tx: Some(tx_b), rx: Some(rx_b), connected: true },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self, info: ConnectionInfo) -> Result<()> {
        if !matches!(info, ConnectionInfo::Memory { .. }) {
            return Err(Error::Connect("MemoryTransport requires ConnectionInfo::Memory".into()));
        }
        // Wiring happens at construction via `pair`; connect is a no-op
        // confirming locality and readiness.
        Ok(())
    }

    fn is_local(&self, _info: &ConnectionInfo) -> bool {
        true
    }

    async fn send(&mut self, bytes: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        tx.send(bytes).await.map_err(|_| Error::Closed)
    }

    fn process_events(&mut self, on_element: &mut dyn FnMut(Bytes)) -> Result<usize> {
        let Some(rx) = self.rx.as_mut() else {
            return Ok(0);
        };
        let mut count = 0;
        while let Ok(element) = rx.try_recv() {
            on_element(element);
            count += 1;
        }
        Ok(count)
    }

    async fn recv_async(&mut self) -> Option<Bytes> {
        self.rx.as_mut()?.recv().await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        self.rx = None;
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_bytes_in_order() {
        let (mut a, mut b) = MemoryTransport::pair(8);
        a.send(Bytes::from_static(b"one")).await.unwrap();
        a.send(Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(b.recv_async().await, Some(Bytes::from_static(b"one")));
        assert_eq!(b.recv_async().await, Some(Bytes::from_static(b"two")));
    }

    #[tokio::test]
    async fn closed_transport_rejects_send() {
        let (mut a, _b) = MemoryTransport::pair(8);
        a.close().await.unwrap();
        assert!(a.send(Bytes::from_static(b"x")).await.is_err());
    }
}
