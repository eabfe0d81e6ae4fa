//! Mutual exclusion for circulation transitions.
//!
//! A transition holds its copy and its reader for the whole
//! read-validate-write sequence. Both keys are taken together, so two
//! transitions never wait on each other while each holds half of what the
//! other needs.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use shelf_types::{CopyId, UserId};

use crate::error::{CirculationError, CirculationResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum LockKey {
    Copy(CopyId),
    User(UserId),
}

/// Set of copies and readers with a transition in flight.
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until neither `copy` nor `user` is held, then hold both.
    pub fn acquire(&self, user: &UserId, copy: CopyId) -> CirculationResult<TransitionGuard<'_>> {
        let keys = [LockKey::Copy(copy), LockKey::User(user.clone())];
        let mut held = self.held.lock().map_err(|_| CirculationError::LockPoisoned)?;
        while keys.iter().any(|key| held.contains(key)) {
            held = self
                .released
                .wait(held)
                .map_err(|_| CirculationError::LockPoisoned)?;
        }
        for key in &keys {
            held.insert(key.clone());
        }
        Ok(TransitionGuard { table: self, keys })
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        match self.held.lock() {
            Ok(held) => held.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Releases its copy and reader on drop.
#[derive(Debug)]
pub struct TransitionGuard<'a> {
    table: &'a LockTable,
    keys: [LockKey; 2],
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        let mut held = match self.table.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.table.released.notify_all();
    }
}
