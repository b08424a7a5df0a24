use mio::{event::Event, Token};
use std::fmt;

/// One readiness notification, decoded from a raw poll event.
///
/// Transient by design: a batch of these is produced by one poll call and
/// fully consumed before the next. An error or read-closed condition on the
/// handle is folded into `readable` so the read path surfaces it and the
/// owning connection gets closed, rather than the event being dropped.
pub struct ReadinessEvent {
    token: Token,
    readable: bool,
    writable: bool,
}

impl fmt::Debug for ReadinessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessEvent")
            .field("token", &self.token)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .finish()
    }
}

impl ReadinessEvent {
    pub fn token(&self) -> Token {
        self.token
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl From<&Event> for ReadinessEvent {
    fn from(event: &Event) -> Self {
        Self {
            token: event.token(),
            readable: event.is_readable() || event.is_error() || event.is_read_closed(),
            writable: event.is_writable(),
        }
    }
}
