use std::collections::HashMap;

use mio::{Interest, Token};

use crate::error::{ReactorError, Result};

/// Token reserved for the listening socket.
pub const LISTENER_TOKEN: Token = Token(1);

// Token(0) is the waker, Token(1) the listener. Connections start here.
const FIRST_CONNECTION_TOKEN: usize = 2;

/// What kind of handle a registry entry refers to, used to pick the
/// dispatch path when its token shows up in a readiness batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleTag {
    Listener,
    Connection,
}

struct Entry {
    interest: Interest,
    tag: HandleTag,
}

/// Bookkeeping of which token currently wants which readiness events.
///
/// Owned exclusively by the reactor thread, so no lock. The invariant the
/// rest of the crate leans on: exactly one entry per live handle, and an
/// entry is always removed before the handle's resource is released.
pub struct InterestRegistry {
    entries: HashMap<Token, Entry>,
    next_token: usize,
}

impl InterestRegistry {
    pub fn new() -> Self {
        InterestRegistry {
            entries: HashMap::new(),
            next_token: FIRST_CONNECTION_TOKEN,
        }
    }

    /// Hands out a fresh connection token. Monotonic, never reuses the
    /// waker or listener tokens.
    pub fn alloc_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    pub fn register(&mut self, token: Token, interest: Interest, tag: HandleTag) -> Result<()> {
        if self.entries.contains_key(&token) {
            return Err(ReactorError::RegistryMisuse {
                reason: "token already registered",
                token,
            });
        }
        self.entries.insert(token, Entry { interest, tag });
        Ok(())
    }

    /// Swap the interest of a registered token. Calling this for an unknown
    /// token is a programming error and is surfaced, not ignored.
    pub fn update_interest(&mut self, token: Token, interest: Interest) -> Result<()> {
        match self.entries.get_mut(&token) {
            Some(entry) => {
                entry.interest = interest;
                Ok(())
            }
            None => Err(ReactorError::RegistryMisuse {
                reason: "update_interest on unregistered token",
                token,
            }),
        }
    }

    pub fn deregister(&mut self, token: Token) -> Result<()> {
        match self.entries.remove(&token) {
            Some(_) => Ok(()),
            None => Err(ReactorError::RegistryMisuse {
                reason: "deregister on unregistered token",
                token,
            }),
        }
    }

    pub fn interest(&self, token: Token) -> Option<Interest> {
        self.entries.get(&token).map(|e| e.interest)
    }

    pub fn tag(&self, token: Token) -> Option<HandleTag> {
        self.entries.get(&token).map(|e| e.tag)
    }

    pub fn contains(&self, token: Token) -> bool {
        self.entries.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of registered connection tokens, for shutdown sweeps.
    pub fn connection_tokens(&self) -> Vec<Token> {
        self.entries
            .iter()
            .filter(|(_, e)| e.tag == HandleTag::Connection)
            .map(|(t, _)| *t)
            .collect()
    }
}

impl Default for InterestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_monotonic_and_skip_reserved() {
        let mut registry = InterestRegistry::new();
        let first = registry.alloc_token();
        let second = registry.alloc_token();
        assert!(first.0 >= FIRST_CONNECTION_TOKEN);
        assert_eq!(second.0, first.0 + 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = InterestRegistry::new();
        let token = registry.alloc_token();
        registry
            .register(token, Interest::READABLE, HandleTag::Connection)
            .unwrap();
        let err = registry
            .register(token, Interest::WRITABLE, HandleTag::Connection)
            .unwrap_err();
        assert!(matches!(err, ReactorError::RegistryMisuse { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn update_on_unregistered_token_is_misuse() {
        let mut registry = InterestRegistry::new();
        let err = registry
            .update_interest(Token(42), Interest::READABLE)
            .unwrap_err();
        assert!(matches!(
            err,
            ReactorError::RegistryMisuse { token: Token(42), .. }
        ));
    }

    #[test]
    fn interest_swap_is_visible() {
        let mut registry = InterestRegistry::new();
        let token = registry.alloc_token();
        registry
            .register(token, Interest::READABLE, HandleTag::Connection)
            .unwrap();
        registry
            .update_interest(token, Interest::READABLE | Interest::WRITABLE)
            .unwrap();
        assert_eq!(
            registry.interest(token),
            Some(Interest::READABLE | Interest::WRITABLE)
        );
    }

    #[test]
    fn deregister_removes_entry() {
        let mut registry = InterestRegistry::new();
        let token = registry.alloc_token();
        registry
            .register(token, Interest::READABLE, HandleTag::Connection)
            .unwrap();
        registry.deregister(token).unwrap();
        assert!(!registry.contains(token));
        assert!(registry.deregister(token).is_err());
    }

    #[test]
    fn connection_tokens_exclude_listener() {
        let mut registry = InterestRegistry::new();
        registry
            .register(LISTENER_TOKEN, Interest::READABLE, HandleTag::Listener)
            .unwrap();
        let conn = registry.alloc_token();
        registry
            .register(conn, Interest::READABLE, HandleTag::Connection)
            .unwrap();
        assert_eq!(registry.connection_tokens(), vec![conn]);
    }
}
