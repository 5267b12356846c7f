//! Enemy presence tracker.
//!
//! The [`EnemyTracker`] keeps one counter per town: the number of distinct
//! enemies currently inside the town's claim. It answers a single question for
//! the rest of the system, [`EnemyTracker::town_is_contested`].
//!
//! # State Machine
//!
//! Each town is either `CLEAR` (count 0 or untracked) or `CONTESTED`
//! (count > 0). The decrement that takes a town from 1 to 0 returns
//! [`DecrementOutcome::Cleared`]; that is the only outcome on which the caller
//! restores flight.
//!
//! # Absent vs Zero
//!
//! Entries are created on first increment and never removed by a decrement,
//! so a town whose enemies have all left is tracked at zero. Decrementing an
//! untracked town is an invariant violation ([`TrackerError::UntrackedTown`])
//! and creates nothing. Decrementing a town already at zero is tolerated and
//! reported as [`DecrementOutcome::AlreadyClear`].
//!
//! # Locking
//!
//! All counts live behind one mutex. Every operation is a short map update and
//! never calls out while holding the lock.
//!
//! # Example
//!
//! ```
//! use townflight_core::tracker::{DecrementOutcome, EnemyTracker};
//! use townmap::TownId;
//!
//! let tracker = EnemyTracker::new();
//! let town = TownId::new(1);
//!
//! tracker.increment_enemies(town);
//! assert!(tracker.town_is_contested(town));
//!
//! assert_eq!(tracker.decrement_enemies(town), Ok(DecrementOutcome::Cleared));
//! assert!(!tracker.town_is_contested(town));
//! assert_eq!(tracker.enemy_count(town), Some(0));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use townmap::TownId;

use crate::error::TrackerError;

/// Result of a successful decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecrementOutcome {
    /// Enemies remain; the town stays contested.
    Remaining(u32),
    /// The last enemy left. Flight should be restored.
    Cleared,
    /// The town was already at zero; nothing changed.
    AlreadyClear,
}

/// Per-town enemy counts.
#[derive(Debug, Default)]
pub struct EnemyTracker {
    counts: Mutex<HashMap<TownId, u32>>,
}

impl EnemyTracker {
    /// Creates a tracker with no towns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<TownId, u32>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one more enemy inside `town` and returns the new count.
    pub fn increment_enemies(&self, town: TownId) -> u32 {
        let count = {
            let mut counts = self.counts();
            let entry = counts.entry(town).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        tracing::info!(town = %town, count, "enemies in town incremented");
        count
    }

    /// Records one enemy leaving `town`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UntrackedTown`] if `town` was never incremented.
    /// No entry is created in that case.
    pub fn decrement_enemies(&self, town: TownId) -> Result<DecrementOutcome, TrackerError> {
        let outcome = {
            let mut counts = self.counts();
            match counts.get_mut(&town) {
                None => None,
                Some(0) => Some(DecrementOutcome::AlreadyClear),
                Some(count) => {
                    *count -= 1;
                    Some(if *count == 0 {
                        DecrementOutcome::Cleared
                    } else {
                        DecrementOutcome::Remaining(*count)
                    })
                }
            }
        };

        match outcome {
            None => {
                let err = TrackerError::UntrackedTown(town);
                tracing::error!(town = %town, "{err}");
                Err(err)
            }
            Some(DecrementOutcome::AlreadyClear) => {
                tracing::warn!(town = %town, "enemy left a town already at zero enemies");
                Ok(DecrementOutcome::AlreadyClear)
            }
            Some(DecrementOutcome::Cleared) => {
                tracing::info!(town = %town, count = 0, "enemies in town decremented");
                Ok(DecrementOutcome::Cleared)
            }
            Some(DecrementOutcome::Remaining(count)) => {
                tracing::info!(town = %town, count, "enemies in town decremented");
                Ok(DecrementOutcome::Remaining(count))
            }
        }
    }

    /// Returns true if enemies are currently inside `town`.
    #[must_use]
    pub fn town_is_contested(&self, town: TownId) -> bool {
        self.counts().get(&town).is_some_and(|count| *count > 0)
    }

    /// Returns the count for `town`, or `None` if it was never incremented.
    #[must_use]
    pub fn enemy_count(&self, town: TownId) -> Option<u32> {
        self.counts().get(&town).copied()
    }

    /// Returns every town with an entry, including those at zero, sorted.
    #[must_use]
    pub fn tracked_towns(&self) -> Vec<TownId> {
        let mut towns: Vec<TownId> = self.counts().keys().copied().collect();
        towns.sort();
        towns
    }

    /// Returns every town currently contested, sorted.
    #[must_use]
    pub fn contested_towns(&self) -> Vec<TownId> {
        let mut towns: Vec<TownId> = self
            .counts()
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(town, _)| *town)
            .collect();
        towns.sort();
        towns
    }

    /// Forgets every town. Used on shutdown and reload.
    pub fn clear(&self) {
        let dropped = {
            let mut counts = self.counts();
            let n = counts.len();
            counts.clear();
            n
        };
        tracing::info!(towns = dropped, "enemy tracker cleared");
    }
}
