use std::sync::Arc;
use std::time::Duration;

use mio::{event::Source, Events, Interest, Poll, Token, Waker};

use crate::error::{ReactorError, Result};

/// Token reserved for the internal waker. Never handed out by the registry.
pub const WAKE_TOKEN: Token = Token(0);

/// Blocking readiness-query primitive.
///
/// Owns the `mio::Poll` instance and a `Waker` that can unblock a poll in
/// progress from another thread, which is how cooperative shutdown reaches
/// a reactor sleeping inside `poll`.
pub struct PollHandle {
    poller: Poll,
    waker: Arc<Waker>,
}

impl PollHandle {
    pub fn new() -> Result<Self> {
        let poller = Poll::new().map_err(ReactorError::SelectorFatal)?;
        let waker =
            Waker::new(poller.registry(), WAKE_TOKEN).map_err(ReactorError::SelectorFatal)?;
        Ok(PollHandle {
            poller,
            waker: Arc::new(waker),
        })
    }

    pub fn register<S>(&self, src: &mut S, token: Token, interest: Interest) -> Result<()>
    where
        S: Source + ?Sized,
    {
        src.register(self.poller.registry(), token, interest)?;
        Ok(())
    }

    /// Atomic interest swap for an already-registered source. No
    /// deregister/register cycle, so no readiness window is lost.
    pub fn reregister<S>(&self, src: &mut S, token: Token, interest: Interest) -> Result<()>
    where
        S: Source + ?Sized,
    {
        src.reregister(self.poller.registry(), token, interest)?;
        Ok(())
    }

    pub fn deregister<S>(&self, src: &mut S) -> Result<()>
    where
        S: Source + ?Sized,
    {
        src.deregister(self.poller.registry())?;
        Ok(())
    }

    /// Blocks until at least one registered source is ready, the timeout
    /// elapses, or the waker fires. A zero-event return is a normal spurious
    /// wakeup and the caller simply polls again; only a real failure of the
    /// poll primitive itself is an error, and that one is fatal.
    pub fn poll(&mut self, events: &mut Events, timeout: Option<Duration>) -> Result<usize> {
        match self.poller.poll(events, timeout) {
            Ok(()) => Ok(events.iter().count()),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                events.clear();
                Ok(0)
            }
            Err(e) => Err(ReactorError::SelectorFatal(e)),
        }
    }

    pub fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    pub fn wake(&self) -> Result<()> {
        self.waker.wake()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn poll_times_out_with_zero_events() {
        let mut poller = PollHandle::new().unwrap();
        let mut events = Events::with_capacity(64);
        let n = poller
            .poll(&mut events, Some(Duration::from_millis(20)))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn waker_unblocks_poll() {
        let mut poller = PollHandle::new().unwrap();
        let waker = poller.waker();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            waker.wake().unwrap();
        });

        let mut events = Events::with_capacity(64);
        let start = Instant::now();
        let n = poller
            .poll(&mut events, Some(Duration::from_secs(10)))
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(n, 1);
        assert_eq!(events.iter().next().unwrap().token(), WAKE_TOKEN);
        handle.join().unwrap();
    }
}
