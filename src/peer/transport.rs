use super::error::PeerError;
use super::message::{Frame, Handshake};
use crate::config::ClientConfig;
use crate::constants::{HANDSHAKE_LEN, READ_BUFFER_SIZE};
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Byte-level I/O for one peer: handshake exchange and frame reassembly.
pub struct PeerTransport {
    stream: TcpStream,
    read_buf: BytesMut,
    handshake_timeout: Duration,
    read_timeout: Duration,
    write_timeout: Duration,
    max_message_size: usize,
}

impl PeerTransport {
    pub fn new(stream: TcpStream, config: &ClientConfig) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            handshake_timeout: config.handshake_timeout(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            max_message_size: config.max_message_size,
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        self.send_raw(&handshake.encode()).await
    }

    /// Reads exactly 68 bytes and returns them unparsed.
    ///
    /// A stream that ends early yields an `InvalidHandshake` length error.
    /// Bytes received past the handshake stay buffered for framing.
    pub async fn receive_handshake(&mut self) -> Result<BytesMut, PeerError> {
        let limit = self.handshake_timeout;
        let read = async {
            while self.read_buf.len() < HANDSHAKE_LEN {
                let n = self.stream.read_buf(&mut self.read_buf).await?;

                if n == 0 {
                    return Err(PeerError::InvalidHandshake("length"));
                }
            }
            Ok::<_, PeerError>(self.read_buf.split_to(HANDSHAKE_LEN))
        };

        timeout(limit, read)
            .await
            .map_err(|_| PeerError::Timeout)?
    }

    pub async fn send_raw(&mut self, data: &[u8]) -> Result<(), PeerError> {
        timeout(self.write_timeout, self.stream.write_all(data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    /// Waits for the next complete frame.
    pub async fn receive_frame(&mut self) -> Result<Frame, PeerError> {
        loop {
            if let Some(frame) = Frame::parse(&mut self.read_buf, self.max_message_size)? {
                return Ok(frame);
            }

            let n = timeout(self.read_timeout, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| PeerError::Timeout)??;

            if n == 0 {
                return Err(PeerError::ConnectionClosed);
            }
        }
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}
