use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mio::{Events, Interest, Token, Waker};

use crate::buffer_pool::BufferPool;
use crate::config::ReactorConfig;
use crate::connection::{Connection, Flush, Read};
use crate::error::{ReactorError, Result};
use crate::event::ReadinessEvent;
use crate::handler::ServiceHandler;
use crate::listener::Listener;
use crate::log::{LogLevel, Logger};
use crate::poll::{PollHandle, WAKE_TOKEN};
use crate::registry::{HandleTag, InterestRegistry, LISTENER_TOKEN};

const READ_BUFFER_POOL_SIZE: usize = 16;

/// Lifecycle of a [`Reactor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Listener bound, selector open, loop not yet entered.
    Starting,
    /// Polling and dispatching.
    Running,
    /// Stop observed; closing connections and releasing resources.
    Stopping,
    /// Terminal. No further operations.
    Stopped,
}

/// Thread-safe handle that requests a cooperative shutdown.
///
/// Sets the stop flag and wakes a poll in progress; the reactor observes
/// the flag between iterations and tears down in order.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.waker.wake();
    }
}

/// Single-threaded readiness reactor.
///
/// Owns the poll handle, the interest registry, the listener, and every
/// accepted connection; only the thread running [`Reactor::run`] ever
/// touches them, so none of it is locked. The one blocking call is the
/// poll itself.
///
/// Construction does the `Starting` work (bind + open selector) so a bind
/// conflict fails fast with no partially-started server, and so the caller
/// can learn the resolved address before the loop takes ownership of the
/// thread.
pub struct Reactor<H: ServiceHandler> {
    poll: PollHandle,
    events: Events,
    registry: InterestRegistry,
    listener: Listener,
    connections: HashMap<Token, Connection>,
    buffers: BufferPool,
    handler: H,
    logger: Arc<dyn Logger>,
    config: ReactorConfig,
    stop: Arc<AtomicBool>,
    state: LoopState,
}

impl<H: ServiceHandler> std::fmt::Debug for Reactor<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("state", &self.state)
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

impl<H: ServiceHandler> Reactor<H> {
    pub fn new(config: ReactorConfig, handler: H) -> Result<Self> {
        let listener = Listener::bind(config.address, config.backlog)?;
        let poll = PollHandle::new()?;

        Ok(Reactor {
            poll,
            events: Events::with_capacity(config.events_capacity),
            registry: InterestRegistry::new(),
            listener,
            connections: HashMap::new(),
            buffers: BufferPool::new(READ_BUFFER_POOL_SIZE, config.buffer_size),
            handler,
            logger: Arc::clone(&config.logger),
            config,
            stop: Arc::new(AtomicBool::new(false)),
            state: LoopState::Starting,
        })
    }

    /// The address the listener actually bound, with port 0 resolved.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.listener.local_addr()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
            waker: self.poll.waker(),
        }
    }

    /// Runs the loop until a shutdown request or a fatal selector error.
    ///
    /// Either way the exit is orderly: every connection is closed and
    /// deregistered, then the listener, before this returns.
    pub fn run(&mut self) -> Result<()> {
        self.poll
            .register(self.listener.source_mut(), LISTENER_TOKEN, Interest::READABLE)?;
        self.registry
            .register(LISTENER_TOKEN, Interest::READABLE, HandleTag::Listener)?;

        self.state = LoopState::Running;
        self.logger.log(
            LogLevel::Info,
            &format!("reactor listening on {}", self.listener.local_addr()),
        );

        let mut result = Ok(());
        while !self.stop.load(Ordering::SeqCst) {
            if let Err(e) = self.turn() {
                self.logger
                    .log(LogLevel::Error, &format!("fatal reactor error: {e}"));
                result = Err(e);
                break;
            }
        }

        self.teardown();
        result
    }

    /// One poll-and-dispatch iteration: collect the whole readiness batch,
    /// then act on it, so registry mutation never races the selector's
    /// result set. A zero-event batch (timeout or spurious wakeup) is a
    /// normal re-poll, not an error.
    pub(crate) fn turn(&mut self) -> Result<()> {
        let timeout = self.config.poll_timeout();
        self.poll.poll(&mut self.events, timeout)?;

        let batch: Vec<ReadinessEvent> =
            self.events.iter().map(ReadinessEvent::from).collect();

        for event in batch {
            match event.token() {
                WAKE_TOKEN => {} // stop flag is checked between turns
                LISTENER_TOKEN => self.accept_ready(),
                token => self.connection_ready(token, &event),
            }
        }
        Ok(())
    }

    /// Drains the accept queue until would-block.
    fn accept_ready(&mut self) {
        loop {
            match self.listener.accept() {
                Ok(Some((stream, peer_addr))) => self.admit(stream, peer_addr),
                Ok(None) => break,
                Err(e) => {
                    // Accept failures are isolated to the attempted
                    // connection; the listener stays registered.
                    self.logger
                        .log(LogLevel::Error, &format!("accept error: {e}"));
                    break;
                }
            }
        }
    }

    fn admit(&mut self, stream: mio::net::TcpStream, peer_addr: std::net::SocketAddr) {
        if let Some(max) = self.config.max_connections {
            if self.connections.len() >= max {
                self.logger.log(
                    LogLevel::Warn,
                    &format!("max connections reached, rejecting {peer_addr}"),
                );
                return;
            }
        }

        if let Err(e) = stream.set_nodelay(self.config.no_delay) {
            self.logger
                .log(LogLevel::Error, &format!("failed to set TCP_NODELAY: {e}"));
        }

        let token = self.registry.alloc_token();
        let mut conn = Connection::new(stream, token, peer_addr);

        // New connections wait for READ first; WRITE is armed only once
        // there are bytes to drain.
        if let Err(e) = self
            .poll
            .register(conn.source_mut(), token, Interest::READABLE)
        {
            self.logger.log(
                LogLevel::Error,
                &format!("failed to register {peer_addr}: {e}"),
            );
            return;
        }
        if let Err(e) = self
            .registry
            .register(token, Interest::READABLE, HandleTag::Connection)
        {
            self.logger.log(LogLevel::Error, &e.to_string());
            let _ = self.poll.deregister(conn.source_mut());
            return;
        }

        if let Err(e) = self.handler.on_connection_accepted(&mut conn) {
            self.handler.on_error(token, &e);
            conn.close();
        }
        self.logger.log(
            LogLevel::Info,
            &format!("accepted {peer_addr} as {token:?}"),
        );

        self.connections.insert(token, conn);
        self.sync_connection(token);
    }

    fn connection_ready(&mut self, token: Token, event: &ReadinessEvent) {
        // Stale event for a handle closed earlier in this same batch.
        if !self.connections.contains_key(&token) {
            return;
        }

        if event.is_readable() {
            self.read_ready(token);
        }
        if event.is_writable() {
            self.write_ready(token);
        }
        self.sync_connection(token);
    }

    /// Drains one readable connection until would-block or EOF, handing
    /// each chunk to the handler.
    fn read_ready(&mut self, token: Token) {
        let mut buf = self.buffers.acquire();
        loop {
            let Some(conn) = self.connections.get_mut(&token) else {
                return;
            };
            if conn.is_closed() {
                return;
            }
            match conn.read(buf.as_mut_slice()) {
                Ok(Read::Data(n)) => {
                    let chunk = &buf.as_slice()[..n];
                    let Some(conn) = self.connections.get_mut(&token) else {
                        return;
                    };
                    if let Err(e) = self.handler.on_data_readable(conn, chunk) {
                        self.handler.on_error(token, &e);
                        if let Some(conn) = self.connections.get_mut(&token) {
                            conn.close();
                        }
                        return;
                    }
                }
                Ok(Read::WouldBlock) => return,
                Ok(Read::Eof) => return, // desired_interest decides the close
                Err(e) => {
                    let err = ReactorError::ConnectionIo { token, source: e };
                    self.logger.log(LogLevel::Error, &err.to_string());
                    self.handler.on_error(token, &err);
                    if let Some(conn) = self.connections.get_mut(&token) {
                        conn.close();
                    }
                    return;
                }
            }
        }
    }

    fn write_ready(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        match conn.flush() {
            Ok(Flush::Done) => {
                let Some(conn) = self.connections.get_mut(&token) else {
                    return;
                };
                if let Err(e) = self.handler.on_writable(conn) {
                    self.handler.on_error(token, &e);
                    if let Some(conn) = self.connections.get_mut(&token) {
                        conn.close();
                    }
                }
            }
            Ok(Flush::Partial) => {} // WRITE interest stays armed
            Err(e) => {
                let err = ReactorError::ConnectionIo { token, source: e };
                self.logger.log(LogLevel::Error, &err.to_string());
                self.handler.on_error(token, &err);
                if let Some(conn) = self.connections.get_mut(&token) {
                    conn.close();
                }
            }
        }
    }

    /// Reconciles one connection with the registry after its callbacks ran:
    /// flush anything the handler queued, then either swap interests in
    /// place or close and deregister. Runs before the next poll, so the
    /// selector never reports a dead handle.
    fn sync_connection(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        if !conn.is_closed() && conn.pending_out() > 0 {
            if let Err(e) = conn.flush() {
                let err = ReactorError::ConnectionIo { token, source: e };
                self.logger.log(LogLevel::Error, &err.to_string());
                self.handler.on_error(token, &err);
                if let Some(conn) = self.connections.get_mut(&token) {
                    conn.close();
                }
            }
        }

        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        match conn.desired_interest() {
            None => self.close_connection(token),
            Some(want) => {
                if self.registry.interest(token) != Some(want) {
                    if let Err(e) = self.poll.reregister(conn.source_mut(), token, want) {
                        self.logger.log(
                            LogLevel::Error,
                            &format!("failed to update interest for {token:?}: {e}"),
                        );
                        self.close_connection(token);
                        return;
                    }
                    if let Err(e) = self.registry.update_interest(token, want) {
                        // Registry and poll disagree; close rather than
                        // leave a dangling registration.
                        self.logger.log(LogLevel::Error, &e.to_string());
                        self.close_connection(token);
                    }
                }
            }
        }
    }

    /// Removes a connection from the registry and the selector before its
    /// socket is dropped. Safe to call for an already-removed token.
    fn close_connection(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.deregister(conn.source_mut());
            if let Err(e) = self.registry.deregister(token) {
                self.logger.log(LogLevel::Error, &e.to_string());
            }
            conn.close();
            self.handler.on_disconnect(token);
            self.logger
                .log(LogLevel::Info, &format!("closed connection {token:?}"));
        }
    }

    /// Orderly release: every connection, then the listener.
    fn teardown(&mut self) {
        self.state = LoopState::Stopping;

        for token in self.registry.connection_tokens() {
            self.close_connection(token);
        }

        let _ = self.poll.deregister(self.listener.source_mut());
        if self.registry.contains(LISTENER_TOKEN) {
            let _ = self.registry.deregister(LISTENER_TOKEN);
        }

        self.state = LoopState::Stopped;
        self.logger.log(LogLevel::Info, "reactor stopped");
    }

    #[cfg(test)]
    fn registry_len(&self) -> usize {
        self.registry.len()
    }
}
