use std::net::SocketAddr;
use std::{io, net};

use mio::net::{TcpListener, TcpStream};
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{ReactorError, Result};

/// Non-blocking listening socket.
///
/// Built through socket2 so the listen backlog is an explicit input rather
/// than whatever the platform wrapper defaults to. Never read from or
/// written to, only accepted from, and only after the poll has reported it
/// readable.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds and starts listening. Any failure along the way surfaces as
    /// [`ReactorError::Bind`]; there is no partially-constructed listener.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self> {
        let bind_err = |source: io::Error| ReactorError::Bind { addr, source };

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(backlog as i32).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let std_listener: net::TcpListener = socket.into();
        let local_addr = std_listener.local_addr().map_err(bind_err)?;

        Ok(Listener {
            inner: TcpListener::from_std(std_listener),
            local_addr,
        })
    }

    /// Accepts one pending connection if there is one.
    ///
    /// `Ok(None)` is the would-block outcome: nothing is pending and the
    /// caller goes back to waiting for the next ACCEPT readiness. The
    /// returned stream is not yet registered anywhere; that is the
    /// reactor's job.
    pub fn accept(&self) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        loop {
            match self.inner.accept() {
                Ok(pair) => return Ok(Some(pair)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// The address actually bound, resolving port 0 to the assigned port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn source_mut(&mut self) -> &mut TcpListener {
        &mut self.inner
    }
}
