use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::log::{Logger, NoOpLogger};

pub(crate) const DEFAULT_BACKLOG: u32 = 1024;
pub(crate) const DEFAULT_EVENTS_CAPACITY: usize = 1024;
pub(crate) const DEFAULT_POLL_TIMEOUT_MS: u64 = 150;
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Reactor configuration.
///
/// Use [`ReactorConfig::builder`] for construction.
///
/// `poll_timeout_ms` of 0 blocks indefinitely; any positive value wakes the
/// loop periodically even with no readiness, which is what lets the stop
/// flag be observed without relying solely on the waker.
#[derive(Clone)]
pub struct ReactorConfig {
    /// Address the listener binds to.
    pub address: SocketAddr,
    /// Maximum pending, unaccepted connections.
    pub backlog: u32,
    /// Poll timeout in milliseconds; 0 means block indefinitely.
    pub poll_timeout_ms: u64,
    /// Maximum readiness events consumed per poll.
    pub events_capacity: usize,
    /// Size of pooled read buffers.
    pub buffer_size: usize,
    /// Hard cap on concurrent connections (None for unlimited).
    pub max_connections: Option<usize>,
    /// Enable TCP_NODELAY on accepted connections.
    pub no_delay: bool,
    /// Logger for reactor events.
    pub logger: Arc<dyn Logger>,
}

impl ReactorConfig {
    pub fn builder() -> ReactorConfigBuilder {
        ReactorConfigBuilder::new()
    }

    pub(crate) fn poll_timeout(&self) -> Option<Duration> {
        match self.poll_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".parse().unwrap(),
            backlog: DEFAULT_BACKLOG,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_connections: None,
            no_delay: true,
            logger: Arc::new(NoOpLogger),
        }
    }
}

/// Builder for [`ReactorConfig`]. Unset fields fall back to the defaults.
pub struct ReactorConfigBuilder {
    address: Option<SocketAddr>,
    backlog: Option<u32>,
    poll_timeout_ms: Option<u64>,
    events_capacity: Option<usize>,
    buffer_size: Option<usize>,
    max_connections: Option<usize>,
    no_delay: Option<bool>,
    logger: Option<Arc<dyn Logger>>,
}

impl ReactorConfigBuilder {
    pub fn new() -> Self {
        Self {
            address: None,
            backlog: None,
            poll_timeout_ms: None,
            events_capacity: None,
            buffer_size: None,
            max_connections: None,
            no_delay: None,
            logger: None,
        }
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = Some(backlog);
        self
    }

    pub fn poll_timeout_ms(mut self, ms: u64) -> Self {
        self.poll_timeout_ms = Some(ms);
        self
    }

    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = Some(capacity);
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = Some(enabled);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> ReactorConfig {
        let default = ReactorConfig::default();
        ReactorConfig {
            address: self.address.unwrap_or(default.address),
            backlog: self.backlog.unwrap_or(default.backlog),
            poll_timeout_ms: self.poll_timeout_ms.unwrap_or(default.poll_timeout_ms),
            events_capacity: self.events_capacity.unwrap_or(default.events_capacity),
            buffer_size: self.buffer_size.unwrap_or(default.buffer_size),
            max_connections: self.max_connections.or(default.max_connections),
            no_delay: self.no_delay.unwrap_or(default.no_delay),
            logger: self.logger.unwrap_or(default.logger),
        }
    }
}

impl Default for ReactorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
