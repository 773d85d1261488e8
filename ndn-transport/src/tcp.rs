//! TCP transport (spec §4.4, §6: default port 6363).

use crate::config::TransportOptions;
use crate::error::{Error, Result};
use crate::transport::{ConnectionInfo, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use ndn_common::element_reader::ElementReader;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

pub struct TcpTransport {
    options: TransportOptions,
    write_half: Option<tokio::net::tcp::OwnedWriteHalf>,
    element_rx: Option<mpsc::Receiver<Bytes>>,
    reader_task: Option<tokio::task::JoinHandle<()>>,
    connected: bool,
}

impl TcpTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            options,
            write_half: None,
            element_rx: None,
            reader_task: None,
            connected: false,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, info: ConnectionInfo) -> Result<()> {
        let ConnectionInfo::Tcp { host, port } = info else {
            return Err(Error::Connect("TcpTransport requires ConnectionInfo::Tcp".into()));
        };

        let stream = tokio::time::timeout(
            self.options.connect_timeout,
            TcpStream::connect((host.as_str(), port)),
        )
        .await
        .map_err(|_| Error::Connect(format!("timed out connecting to {host}:{port}")))??;

        let (mut read_half, write_half) = stream.into_split();
        self.write_half = Some(write_half);

        let (tx, rx) = mpsc::channel(self.options.element_channel_capacity);
        self.element_rx = Some(rx);

        let max_size = self.options.max_element_size;
        self.reader_task = Some(tokio::spawn(async move {
            let mut reader = match max_size {
                Some(size) => ElementReader::with_max_size(size),
                None => ElementReader::new(),
            };
            let mut buf = [0u8; 4096];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        debug!("TCP connection closed by peer");
                        break;
                    }
                    Ok(n) => {
                        reader.feed(
                            &buf[..n],
                            |element| {
                                let _ = tx.try_send(element);
                            },
                            |message, _| warn!("TCP element reader error: {message}"),
                        );
                    }
                    Err(e) => {
                        warn!("TCP read error: {e}");
                        break;
                    }
                }
            }
        }));

        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, bytes: Bytes) -> Result<()> {
        let write_half = self.write_half.as_mut().ok_or(Error::Closed)?;
        write_half.write_all(&bytes).await?;
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
        self.write_half = None;
        self.element_rx = None;
        self.connected = false;
        Ok(())
    }
}
