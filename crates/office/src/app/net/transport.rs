use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

const MAX_PENDING_OUTBOUND_BYTES: usize = 256 * 1024;
const MAX_INBOUND_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportEvent {
    Opened,
    Line(String),
    Closed { reason: String },
}

#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("could not resolve server address {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("server address {addr} did not resolve to any socket address")]
    NoAddress { addr: String },
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure socket: {0}")]
    Configure(#[source] io::Error),
    #[error("connection is closed")]
    Closed,
    #[error("outbound queue is full ({pending_bytes} bytes pending)")]
    Backpressure { pending_bytes: usize },
}

/// Duplex line-oriented connection polled from the game thread.
pub(crate) trait Transport {
    /// Appends everything that happened since the last poll.
    fn poll(&mut self, events: &mut Vec<TransportEvent>);
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;
    fn close(&mut self);
}

#[derive(Debug)]
struct PendingWrite {
    bytes: Vec<u8>,
    written: usize,
}

/// Newline-delimited JSON over a non-blocking TCP stream.
#[derive(Debug)]
pub(crate) struct TcpLineTransport {
    stream: Option<TcpStream>,
    peer: SocketAddr,
    read_buf: Vec<u8>,
    active_write: Option<PendingWrite>,
    queued_writes: VecDeque<Vec<u8>>,
    queued_bytes: usize,
    open_reported: bool,
    close_reason: Option<String>,
}

impl TcpLineTransport {
    pub(crate) fn connect(addr: &str, timeout: Duration) -> Result<Self, TransportError> {
        let peer = addr
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                addr: addr.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::NoAddress {
                addr: addr.to_string(),
            })?;
        let stream = TcpStream::connect_timeout(&peer, timeout)
            .map_err(|source| TransportError::Connect { addr: peer, source })?;
        stream
            .set_nonblocking(true)
            .map_err(TransportError::Configure)?;
        if let Err(error) = stream.set_nodelay(true) {
            warn!(error = %error, "transport_nodelay_failed");
        }
        info!(peer = %peer, "transport_connected");

        Ok(Self {
            stream: Some(stream),
            peer,
            read_buf: Vec::new(),
            active_write: None,
            queued_writes: VecDeque::new(),
            queued_bytes: 0,
            open_reported: false,
            close_reason: None,
        })
    }

    fn read_available(&mut self, events: &mut Vec<TransportEvent>) -> Option<String> {
        let stream = self.stream.as_mut()?;
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => return Some("server closed the connection".to_string()),
                Ok(bytes_read) => {
                    self.read_buf.extend_from_slice(&chunk[..bytes_read]);
                    drain_complete_lines(&mut self.read_buf, events);
                    if self.read_buf.len() > MAX_INBOUND_LINE_BYTES {
                        warn!(
                            peer = %self.peer,
                            pending_bytes = self.read_buf.len(),
                            "transport_inbound_line_too_long"
                        );
                        return Some(format!(
                            "inbound line exceeds {MAX_INBOUND_LINE_BYTES} bytes"
                        ));
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return None,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    warn!(peer = %self.peer, error = %error, "transport_read_failed");
                    return Some(error.to_string());
                }
            }
        }
    }

    fn flush_pending(&mut self) -> io::Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        loop {
            if self.active_write.is_none() {
                let Some(bytes) = self.queued_writes.pop_front() else {
                    return Ok(());
                };
                self.active_write = Some(PendingWrite { bytes, written: 0 });
            }
            let Some(active) = self.active_write.as_mut() else {
                return Ok(());
            };
            match stream.write(&active.bytes[active.written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "socket accepted no bytes",
                    ))
                }
                Ok(written) => {
                    active.written += written;
                    if active.written >= active.bytes.len() {
                        self.queued_bytes = self.queued_bytes.saturating_sub(active.bytes.len());
                        self.active_write = None;
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
    }

    fn shut_down(&mut self, reason: String) {
        if self.stream.take().is_some() {
            self.read_buf.clear();
            self.active_write = None;
            self.queued_writes.clear();
            self.queued_bytes = 0;
            self.close_reason = Some(reason);
        }
    }
}

impl Transport for TcpLineTransport {
    fn poll(&mut self, events: &mut Vec<TransportEvent>) {
        if self.stream.is_some() {
            if !self.open_reported {
                self.open_reported = true;
                events.push(TransportEvent::Opened);
            }
            if let Some(reason) = self.read_available(events) {
                self.shut_down(reason);
            } else if let Err(error) = self.flush_pending() {
                warn!(peer = %self.peer, error = %error, "transport_write_failed");
                self.shut_down(error.to_string());
            }
        }
        if let Some(reason) = self.close_reason.take() {
            events.push(TransportEvent::Closed { reason });
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.stream.is_none() {
            return Err(TransportError::Closed);
        }
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        if self.queued_bytes + bytes.len() > MAX_PENDING_OUTBOUND_BYTES {
            return Err(TransportError::Backpressure {
                pending_bytes: self.queued_bytes,
            });
        }
        self.queued_bytes += bytes.len();
        self.queued_writes.push_back(bytes);

        if let Err(error) = self.flush_pending() {
            warn!(peer = %self.peer, error = %error, "transport_write_failed");
            // Reported as Closed on the next poll.
            self.shut_down(error.to_string());
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.stream.is_none() {
            return;
        }
        if let Err(error) = self.flush_pending() {
            warn!(peer = %self.peer, error = %error, "transport_final_flush_failed");
        }
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            info!(peer = %self.peer, "transport_closed");
        }
    }
}

fn drain_complete_lines(buffer: &mut Vec<u8>, events: &mut Vec<TransportEvent>) {
    while let Some(newline_index) = buffer.iter().position(|byte| *byte == b'\n') {
        let mut line_bytes = buffer.drain(..=newline_index).collect::<Vec<u8>>();
        line_bytes.pop();
        if line_bytes.last().copied() == Some(b'\r') {
            line_bytes.pop();
        }
        if line_bytes.is_empty() {
            continue;
        }
        match String::from_utf8(line_bytes) {
            Ok(line) => events.push(TransportEvent::Line(line)),
            Err(error) => warn!(error = %error, "transport_line_invalid_utf8"),
        }
    }
}
