//! Session registry with per-turn exclusive access
//!
//! A turn holds its user's slot lock from acquire to release, across every
//! provider and store await. Idle sessions are dropped from the registry on
//! release; a waiter that wakes on a dropped slot starts over on a fresh one.

use crate::state_machine::{SessionState, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
struct Slot {
    state: Option<SessionState>,
    /// Removed from the registry; waiters must retry
    retired: bool,
}

type SlotRef = Arc<AsyncMutex<Slot>>;

/// Exclusive access to one user's session for the length of a turn
pub struct SessionGuard {
    slot: SlotRef,
    guard: OwnedMutexGuard<Slot>,
    state: SessionState,
}

impl SessionGuard {
    pub fn state(&self) -> &SessionState {
        &self.state
    }
}

/// Registry of in-progress sessions keyed by user
#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<UserId, SlotRef>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<UserId, SlotRef>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for exclusive access to the user's session.
    /// A user without a stored session gets a fresh idle one.
    pub async fn acquire(&self, user_id: UserId, now: DateTime<Utc>) -> SessionGuard {
        loop {
            let slot = Arc::clone(self.slots().entry(user_id).or_default());
            let guard = Arc::clone(&slot).lock_owned().await;
            if guard.retired {
                continue;
            }

            let state = guard
                .state
                .clone()
                .unwrap_or_else(|| SessionState::idle(user_id, now));
            return SessionGuard { slot, guard, state };
        }
    }

    /// Store the turn's final state and give up the slot
    pub fn release(&self, session: SessionGuard, state: SessionState) {
        let SessionGuard { slot, mut guard, .. } = session;

        if state.is_idle() {
            let mut slots = self.slots();
            if slots
                .get(&state.user_id)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                slots.remove(&state.user_id);
            }
            guard.state = None;
            guard.retired = true;
        } else {
            guard.state = Some(state);
        }
    }

    /// Number of users with a stored session
    #[allow(dead_code)] // Used by tests
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    #[allow(dead_code)] // Used by tests
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[allow(dead_code)] // Used by tests
    pub fn contains(&self, user_id: UserId) -> bool {
        self.slots().contains_key(&user_id)
    }
}
