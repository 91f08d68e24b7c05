//! Bet storage and the draw predicate.
//!
//! The trait is synchronous (no async) to maintain a clean synchronous API
//! design; serialization of concurrent writers is the [`BetLedger`]'s job,
//! not the backend's. [`CsvStore`] is the per-run file used in production,
//! [`MemoryStore`] backs tests and keeps a handle for inspection.

mod csv;
mod memory;

use std::sync::Arc;

use tokio::sync::Mutex;
use tombola_proto::Bet;

pub use self::{csv::CsvStore, memory::MemoryStore};

/// Errors from the bet store.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    Io(std::io::Error),

    /// A stored record does not scan back as a bet.
    ///
    /// The file was edited or produced by something else. The whole scan
    /// fails rather than silently dropping the record.
    MalformedRecord {
        /// 1-based line number of the offending record.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A bet field cannot be represented in a CSV record.
    UnstorableField {
        /// Name of the offending field.
        field: &'static str,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::MalformedRecord { line, reason } => {
                write!(f, "malformed record at line {line}: {reason}")
            },
            Self::UnstorableField { field } => {
                write!(f, "field `{field}` cannot be stored in a CSV record")
            },
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::MalformedRecord { .. } | Self::UnstorableField { .. } => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Persistence primitives the draw core builds on.
///
/// Implementations take `&self`; they do not need to be internally
/// synchronized against concurrent writers because the ledger serializes
/// every call through its lock.
pub trait BetStore: Send + Sync + 'static {
    /// Append a batch of bets, preserving their order.
    fn store_bets(&self, bets: &[Bet]) -> Result<(), StoreError>;

    /// Scan every stored bet, in append order.
    fn load_bets(&self) -> Result<Vec<Bet>, StoreError>;
}

/// The draw predicate: a bet wins when its played number is the winning one.
#[must_use]
pub fn has_won(bet: &Bet, winning_number: u32) -> bool {
    bet.number.parse::<u32>().is_ok_and(|number| number == winning_number)
}

/// Serialized facade over a [`BetStore`].
///
/// Owns the cross-session file lock: every `store` from any session goes
/// through the same mutex, which is the single-writer discipline the store
/// requires. `draw_winners_for` re-scans the store on every call - sessions
/// may have stored bets concurrently right up to the barrier, so a cached
/// result could miss late batches.
#[derive(Debug)]
pub struct BetLedger<S> {
    winning_number: u32,
    store: Arc<Mutex<S>>,
}

impl<S> Clone for BetLedger<S> {
    fn clone(&self) -> Self {
        Self { winning_number: self.winning_number, store: Arc::clone(&self.store) }
    }
}

impl<S: BetStore> BetLedger<S> {
    /// Wrap a store with the given winning number.
    pub fn new(store: S, winning_number: u32) -> Self {
        Self { winning_number, store: Arc::new(Mutex::new(store)) }
    }

    /// Append a batch under the file lock.
    ///
    /// The lock is released on every exit path, success or error.
    pub async fn store(&self, bets: &[Bet]) -> Result<(), StoreError> {
        let store = self.store.lock().await;
        store.store_bets(bets)
    }

    /// Winning documents for one agency, in store order.
    ///
    /// Takes the same lock as `store`. By the time a draw runs the barrier
    /// has already excluded concurrent writers, so the lock is uncontended
    /// here; holding it anyway keeps "all store access is serialized" a
    /// property of the ledger instead of its callers.
    pub async fn draw_winners_for(&self, agency: u32) -> Result<Vec<String>, StoreError> {
        let store = self.store.lock().await;
        let bets = store.load_bets()?;

        Ok(bets
            .into_iter()
            .filter(|bet| has_won(bet, self.winning_number) && bet.agency == agency)
            .map(|bet| bet.document)
            .collect())
    }
}
