use mio::Token;

use crate::connection::Connection;
use crate::error::{ReactorError, Result};

/// Application-side extension points, invoked synchronously on the reactor
/// thread.
///
/// The reactor is protocol-agnostic; everything it knows about payload
/// bytes flows through this trait. Callbacks must not block: a stalled
/// callback stalls every connection on the reactor. Hand blocking work to a
/// [`BlockingPool`](crate::worker::BlockingPool) instead.
///
/// Returning an error from a per-connection callback closes that one
/// connection. It never terminates the loop.
pub trait ServiceHandler {
    /// A connection was accepted and registered for READ. Queue bytes with
    /// [`Connection::send`] to greet the peer.
    fn on_connection_accepted(&mut self, conn: &mut Connection) -> Result<()> {
        let _ = conn;
        Ok(())
    }

    /// Bytes arrived. `data` is one drained chunk; large transfers arrive
    /// across many calls.
    fn on_data_readable(&mut self, conn: &mut Connection, data: &[u8]) -> Result<()>;

    /// The socket became writable again after a partial flush. The reactor
    /// has already re-flushed the outbound buffer; this is the hook for
    /// backpressure-aware producers.
    fn on_writable(&mut self, conn: &mut Connection) -> Result<()> {
        let _ = conn;
        Ok(())
    }

    /// The connection was closed and deregistered, for any reason.
    fn on_disconnect(&mut self, token: Token) {
        let _ = token;
    }

    /// An error isolated to one connection. The reactor closes the
    /// connection right after this returns.
    fn on_error(&mut self, token: Token, error: &ReactorError) {
        let _ = (token, error);
    }
}
