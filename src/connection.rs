use std::io::{self, Read as IoRead, Write as IoWrite};
use std::net::SocketAddr;

use mio::net::TcpStream;
use mio::{Interest, Token};

/// Outcome of a non-blocking read.
#[derive(Debug, PartialEq, Eq)]
pub enum Read {
    /// `n` bytes were read into the buffer.
    Data(usize),
    /// Nothing to read right now; wait for the next READABLE event.
    WouldBlock,
    /// The peer closed its write side. The connection is closed once any
    /// buffered outbound bytes drain.
    Eof,
}

/// Outcome of a flush attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Flush {
    /// The outbound buffer is empty.
    Done,
    /// The socket stopped accepting bytes mid-buffer; keep WRITE interest
    /// and retry on the next WRITABLE event.
    Partial,
}

/// One accepted, non-blocking connection.
///
/// Owned by the reactor for its whole life. Read and write calls only touch
/// this connection's own buffers and never block the reactor thread;
/// partial writes land in `outbound` and drain across WRITABLE events.
pub struct Connection {
    stream: TcpStream,
    token: Token,
    peer_addr: SocketAddr,
    outbound: Vec<u8>,
    eof: bool,
    close_after_flush: bool,
    closed: bool,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, token: Token, peer_addr: SocketAddr) -> Self {
        Connection {
            stream,
            token,
            peer_addr,
            outbound: Vec::new(),
            eof: false,
            close_after_flush: false,
            closed: false,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Non-blocking read into `buf`.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<Read> {
        if self.closed {
            return Ok(Read::WouldBlock);
        }
        loop {
            match self.stream.read(buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(Read::Eof);
                }
                Ok(n) => return Ok(Read::Data(n)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Read::WouldBlock),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Queues bytes for delivery. The reactor flushes opportunistically
    /// after the current callback returns and keeps WRITE interest armed
    /// until the buffer drains.
    pub fn send(&mut self, data: &[u8]) {
        if self.closed {
            return;
        }
        self.outbound.extend_from_slice(data);
    }

    /// Pushes buffered bytes into the socket until done or would-block.
    pub fn flush(&mut self) -> io::Result<Flush> {
        let mut written = 0;
        while written < self.outbound.len() {
            match self.stream.write(&self.outbound[written..]) {
                Ok(0) => {
                    self.outbound.drain(..written);
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "socket accepted zero bytes",
                    ));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.outbound.drain(..written);
                    return Ok(Flush::Partial);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.outbound.drain(..written);
                    return Err(e);
                }
            }
        }
        self.outbound.clear();
        Ok(Flush::Done)
    }

    /// Bytes queued but not yet accepted by the socket.
    pub fn pending_out(&self) -> usize {
        self.outbound.len()
    }

    /// Marks the connection closed. Idempotent; the underlying resource is
    /// released when the reactor drops the handle after deregistering it.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Closes once the outbound buffer has drained. With nothing pending
    /// this is an immediate close.
    pub fn close_after_flush(&mut self) {
        if self.outbound.is_empty() {
            self.closed = true;
        } else {
            self.close_after_flush = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// The interest this connection currently wants, or `None` when it
    /// should be closed and deregistered.
    ///
    /// READ is suppressed after EOF or once a close is scheduled; WRITE is
    /// armed only while bytes are pending, so an always-writable socket
    /// cannot spin the loop.
    pub(crate) fn desired_interest(&self) -> Option<Interest> {
        if self.closed {
            return None;
        }
        let draining = !self.outbound.is_empty();
        if !draining && (self.eof || self.close_after_flush) {
            return None;
        }

        let mut want = if self.eof || self.close_after_flush {
            None
        } else {
            Some(Interest::READABLE)
        };
        if draining {
            want = Some(match want {
                Some(interest) => interest | Interest::WRITABLE,
                None => Interest::WRITABLE,
            });
        }
        want
    }

    pub(crate) fn source_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}
