//! Process-wide session holder.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use campus_auth::Session;

/// Buffered change notifications per subscriber.
const SESSION_NOTIFY_BUFFER: usize = 16;

#[derive(Debug)]
struct Slot {
    generation: u64,
    session: Arc<Session>,
}

/// Holds the single [`Session`] of the process.
///
/// - Many readers: `snapshot()` hands out immutable `Arc<Session>` values.
/// - One writer: only the session manager (this crate) can replace the session.
/// - Every replacement is announced to subscribers.
///
/// Each auth event bumps a generation counter. A hydration started under an
/// older generation is discarded when it finishes, so the most recent event
/// always wins.
#[derive(Debug)]
pub struct SessionStore {
    slot: RwLock<Slot>,
    notify: broadcast::Sender<Arc<Session>>,
}

impl SessionStore {
    /// Store holding the process-start session (loading, no identity).
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(SESSION_NOTIFY_BUFFER);
        Self {
            slot: RwLock::new(Slot {
                generation: 0,
                session: Arc::new(Session::default()),
            }),
            notify,
        }
    }

    pub fn snapshot(&self) -> Arc<Session> {
        Arc::clone(&self.slot.read().unwrap_or_else(PoisonError::into_inner).session)
    }

    /// Receive every session published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Session>> {
        self.notify.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    /// Replace the session for a new auth event. Returns the new generation.
    pub(crate) fn replace(&self, session: Session) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.session = Arc::new(session);
        // Notify under the lock so subscribers observe writes in order.
        let _ = self.notify.send(Arc::clone(&slot.session));
        slot.generation
    }

    /// Publish a hydration result, unless a newer event superseded it.
    pub(crate) fn complete(&self, generation: u64, session: Session) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != generation {
            return false;
        }
        slot.session = Arc::new(session);
        let _ = self.notify.send(Arc::clone(&slot.session));
        true
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
