//! UDP transport (spec §4.4, §6: default port 6363).
//!
//! NDN-TLV elements on UDP must each fit in a single datagram, so there is
//! no element reader state machine here: each recv'd datagram is one
//! candidate element, decoded just enough to confirm it's a whole TLV.

use crate::config::TransportOptions;
use crate::error::{Error, Result};
use crate::transport::{ConnectionInfo, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use ndn_common::tlv::TlvElement;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

pub struct UdpTransport {
    options: TransportOptions,
    socket: Option<Arc<UdpSocket>>,
    element_rx: Option<mpsc::Receiver<Bytes>>,
    reader_task: Option<tokio::task::JoinHandle<()>>,
    connected: bool,
}

impl UdpTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            options,
            socket: None,
            element_rx: None,
            reader_task: None,
            connected: false,
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self, info: ConnectionInfo) -> Result<()> {
        let ConnectionInfo::Udp { host, port } = info else {
            return Err(Error::Connect("UdpTransport requires ConnectionInfo::Udp".into()));
        };

        let socket = tokio::time::timeout(self.options.connect_timeout, async {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect((host.as_str(), port)).await?;
            Ok::<_, std::io::Error>(socket)
        })
        .await
        .map_err(|_| Error::Connect(format!("timed out connecting to {host}:{port}")))??;

        let socket = Arc::new(socket);
        self.socket = Some(Arc::clone(&socket));

        let (tx, rx) = mpsc::channel(self.options.element_channel_capacity);
        self.element_rx = Some(rx);

        let max_size = self.options.max_element_size.unwrap_or(
            ndn_common::element_reader::DEFAULT_MAX_ELEMENT_SIZE,
        );

        self.reader_task = Some(tokio::spawn(async move {
            let mut buf = vec![0u8; 65536];
            loop {
                match socket.recv(&mut buf).await {
                    Ok(n) if n > 0 && n <= max_size => {
                        let datagram = Bytes::copy_from_slice(&buf[..n]);
                        match TlvElement::decode(&mut datagram.clone()) {
                            Ok(_) => {
                                let _ = tx.try_send(datagram);
                            }
                            Err(e) => warn!("UDP datagram is not a whole TLV element: {e}"),
                        }
                    }
                    Ok(_) => warn!("UDP datagram exceeds max element size, dropped"),
                    Err(e) => {
                        warn!("UDP read error: {e}");
                        break;
                    }
                }
            }
        }));

        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, bytes: Bytes) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(Error::Closed)?;
        socket.send(&bytes).await?;
        Ok(())
    }

    fn process_events(&mut self, on_element: &mut dyn FnMut(Bytes)) -> Result<usize> {
        let Some(rx) = self.element_rx.as_mut() else {
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
        self.element_rx.as_mut()?.recv().await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.socket = None;
        self.element_rx = None;
        self.connected = false;
        Ok(())
    }
}
