//! # spindle-io
//!
//! A single-threaded, readiness-based reactor for non-blocking TCP servers,
//! built on top of [`mio`] and free of any async runtime.
//!
//! One thread owns one selection handle, one listening socket, and every
//! accepted connection. The loop blocks in exactly one place (the poll),
//! drains whatever became ready, dispatches into application callbacks,
//! reconciles event interests, and polls again until asked to stop.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   accept    ┌──────────────┐  register READ  ┌──────────────────┐
//! │  Listener  │────────────▶│   Reactor    │────────────────▶│ InterestRegistry │
//! └────────────┘             └──────┬───────┘                 └──────────────────┘
//!                                   │ poll
//!                                   ▼
//!                            ┌──────────────┐   readiness     ┌──────────────────┐
//!                            │  PollHandle  │────────────────▶│  ServiceHandler  │
//!                            └──────────────┘    dispatch     └──────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use spindle_io::{Connection, Reactor, ReactorConfig, Result, ServiceHandler};
//!
//! struct Echo;
//!
//! impl ServiceHandler for Echo {
//!     fn on_data_readable(&mut self, conn: &mut Connection, data: &[u8]) -> Result<()> {
//!         conn.send(data);
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let config = ReactorConfig::builder()
//!         .address("127.0.0.1:8080".parse().unwrap())
//!         .build();
//!     let mut reactor = Reactor::new(config, Echo)?;
//!     println!("listening on {}", reactor.local_addr());
//!     reactor.run() // blocks until a ShutdownHandle fires
//! }
//! ```
//!
//! ## Modules
//!
//! - [`reactor`]: the control loop, its state machine, and [`ShutdownHandle`]
//! - [`handler`]: the [`ServiceHandler`] extension points
//! - [`connection`] / [`listener`]: non-blocking handle wrappers
//! - [`registry`]: event-interest bookkeeping
//! - [`poll`]: readiness selection and the wake mechanism
//! - [`worker`]: escape hatch for blocking collaborators
//! - [`error`]: the failure taxonomy

pub mod buffer_pool;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod handler;
pub mod listener;
pub mod log;
pub mod poll;
pub mod reactor;
pub mod registry;
pub mod worker;

pub use buffer_pool::{BufferPool, PooledBuf};
pub use config::{ReactorConfig, ReactorConfigBuilder};
pub use connection::{Connection, Flush, Read};
pub use error::{ReactorError, Result};
pub use event::ReadinessEvent;
pub use handler::ServiceHandler;
pub use listener::Listener;
pub use log::{ConsoleLogger, LogLevel, Logger, NoOpLogger};
pub use mio::Token;
pub use reactor::{LoopState, Reactor, ShutdownHandle};
pub use worker::BlockingPool;

/// Re-exports of the types almost every user touches.
pub mod prelude {
    pub use crate::config::ReactorConfig;
    pub use crate::connection::Connection;
    pub use crate::error::{ReactorError, Result};
    pub use crate::handler::ServiceHandler;
    pub use crate::log::{ConsoleLogger, LogLevel, Logger, NoOpLogger};
    pub use crate::reactor::{LoopState, Reactor, ShutdownHandle};
    pub use mio::Token;
}
