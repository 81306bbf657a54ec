//! Session collaborators consumed by the bridge.

use std::sync::RwLock;

use action_kernel::SessionHandle;
use serde_json::Value;

/// Supplies the current bot session, if one is connected.
pub trait SessionProvider: Send + Sync {
    /// Returns the live session handle.
    fn session(&self) -> Option<SessionHandle>;

    /// Returns the session when it is present and ready for work.
    fn ready_session(&self) -> Option<SessionHandle> {
        self.session().filter(|session| session.is_ready())
    }
}

/// Swappable session slot owned by the host's connection logic.
#[derive(Default)]
pub struct SharedSession {
    slot: RwLock<Option<SessionHandle>>,
}

impl std::fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSession")
            .field("connected", &self.session().is_some())
            .finish()
    }
}

impl SharedSession {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot holding `session`.
    #[must_use]
    pub fn with_session(session: SessionHandle) -> Self {
        Self {
            slot: RwLock::new(Some(session)),
        }
    }

    /// Replaces the current session, returning the previous one.
    ///
    /// # Panics
    ///
    /// Panics if the slot lock is poisoned.
    pub fn set(&self, session: SessionHandle) -> Option<SessionHandle> {
        self.slot
            .write()
            .expect("session slot poisoned")
            .replace(session)
    }

    /// Empties the slot, returning the previous session.
    ///
    /// # Panics
    ///
    /// Panics if the slot lock is poisoned.
    pub fn clear(&self) -> Option<SessionHandle> {
        self.slot.write().expect("session slot poisoned").take()
    }
}

impl SessionProvider for SharedSession {
    fn session(&self) -> Option<SessionHandle> {
        self.slot.read().ok()?.clone()
    }
}

/// Read-only view of session state and recent events.
pub trait SessionObserver: Send + Sync {
    /// Returns a JSON snapshot of the current session state.
    fn state_snapshot(&self) -> Value;

    /// Returns up to `limit` recent events, newest last.
    fn recent_events(&self, limit: usize) -> Vec<Value>;
}
