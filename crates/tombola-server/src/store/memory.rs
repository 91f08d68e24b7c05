//! In-memory bet store for tests.

#![allow(clippy::expect_used, reason = "poisoned mutex is acceptable for test storage")]

use std::sync::{Arc, Mutex};

use tombola_proto::Bet;

use super::{BetStore, StoreError};

/// In-memory store.
///
/// Clones share the same underlying Vec through an Arc, so a test can keep a
/// handle and inspect what a server stored. Uses `lock().expect()`, which
/// panics if the mutex is poisoned - acceptable for test code.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bets: Arc<Mutex<Vec<Bet>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored so far, in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Bet> {
        self.bets.lock().expect("mutex poisoned").clone()
    }
}

impl BetStore for MemoryStore {
    fn store_bets(&self, bets: &[Bet]) -> Result<(), StoreError> {
        self.bets.lock().expect("mutex poisoned").extend_from_slice(bets);
        Ok(())
    }

    fn load_bets(&self) -> Result<Vec<Bet>, StoreError> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_bets() {
        let store = MemoryStore::new();
        let handle = store.clone();

        let bet = Bet {
            agency: 1,
            first_name: "Ana".to_owned(),
            last_name: "Perez".to_owned(),
            document: "123".to_owned(),
            birthdate: "2000-01-01".to_owned(),
            number: "7".to_owned(),
        };
        store.store_bets(std::slice::from_ref(&bet)).expect("store");

        assert_eq!(handle.snapshot(), vec![bet]);
    }
}
