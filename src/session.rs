//! Per-user conversation state and the shared store holding it.
//!
//! Sessions live for the process lifetime, keyed by Telegram user id, in
//! memory only — there is deliberately no persistence across restarts. The
//! store is shared between the polling loop and spawned render tasks, so all
//! access goes through [`SessionStore::update`], which holds one lock for
//! the duration of a closure. Critical sections are a few field writes, so a
//! single map-wide mutex is enough; per-key locking would buy nothing at
//! this contention level.

use crate::score::{ScoreFormat, ScoreUrl};
use std::collections::HashMap;
use std::sync::Mutex;

/// Telegram user identifier.
pub type UserId = i64;

/// Where a conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for a score link. Initial state.
    #[default]
    AwaitingLink,
    /// Link accepted; waiting for a format token.
    AwaitingFormat,
    /// A file was just delivered; a new link or a bare format both work.
    FileDelivered,
}

/// One user's conversation state.
///
/// `link` and `format` are overwritten on each new cycle, never accumulated.
/// `format` is only ever set while `link` holds a validated URL for the
/// current cycle.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: SessionState,
    pub link: Option<ScoreUrl>,
    pub format: Option<ScoreFormat>,
}

impl Session {
    /// Reset to the initial state, dropping any pending inputs.
    pub fn reset(&mut self) {
        *self = Session::default();
    }
}

/// Shared map of user id → [`Session`].
///
/// Cheap to share: callers wrap it in an `Arc`. A session is created
/// implicitly the first time a user id is touched.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the user's session, creating it on first contact.
    ///
    /// The store lock is held for the duration of `f`, which makes every
    /// per-user transition atomic with respect to concurrent messages.
    pub fn update<R>(&self, user: UserId, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut map = self.inner.lock().expect("session store poisoned");
        f(map.entry(user).or_default())
    }

    /// Snapshot of one user's session, if any.
    pub fn get(&self, user: UserId) -> Option<Session> {
        self.inner
            .lock()
            .expect("session store poisoned")
            .get(&user)
            .cloned()
    }
}
