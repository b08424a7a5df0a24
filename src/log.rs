//! Pluggable logging seam.
//!
//! The reactor never logs through a global framework; callers hand it a
//! [`Logger`] via [`ReactorConfig`](crate::config::ReactorConfig) and decide
//! themselves how messages are emitted.

/// Severity of a reactor log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Logger trait for reactor events.
///
/// Implement this to route reactor diagnostics into whatever logging
/// infrastructure the application already uses.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Default logger that discards every message.
#[derive(Default, Clone)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Logger that writes to stdout, errors and warnings to stderr.
#[derive(Default, Clone)]
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Warn | LogLevel::Error => eprintln!("[{:?}] {}", level, message),
            _ => println!("[{:?}] {}", level, message),
        }
    }
}
