//! Reference flight board.
//!
//! The [`FlightBoard`] records which players currently have flight and which
//! external rules forbid it. Rules are expressed as [`FlightBlock`] flags set
//! by whatever owns them (combat tagging, permissions, wars); a player with any
//! block set may not be granted flight by enemy-presence restoration.
//!
//! The board is shared between threads, so every method takes `&self`.
//!
//! # Idempotence
//!
//! Granting flight to a flying player or revoking it from a grounded player
//! succeeds and changes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PlayerId;

bitflags! {
    /// External reasons a player may not fly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FlightBlock: u8 {
        /// Recently involved in combat.
        const COMBAT = 0b0000_0001;
        /// Lacks the permission node for flight.
        const PERMISSION = 0b0000_0010;
        /// Inside an active war zone.
        const WAR_ZONE = 0b0000_0100;
    }
}

/// Why the board refused a flight change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightRefusal {
    /// The player is not connected.
    #[error("{0} is offline")]
    Offline(PlayerId),
    /// The host rejected the change (injected for testing failure paths).
    #[error("flight change rejected for {0}")]
    Rejected(PlayerId),
}

#[derive(Debug, Default)]
struct BoardState {
    online: HashSet<PlayerId>,
    flying: HashSet<PlayerId>,
    blocks: HashMap<PlayerId, FlightBlock>,
    rejecting: HashSet<PlayerId>,
    grants: u64,
    revokes: u64,
}

/// Thread-safe record of player flight.
#[derive(Debug, Default)]
pub struct FlightBoard {
    state: Mutex<BoardState>,
}

impl FlightBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a player as connected.
    pub fn connect(&self, player: PlayerId) {
        self.state().online.insert(player);
    }

    /// Marks a player as disconnected. Disconnecting also grounds them.
    pub fn disconnect(&self, player: PlayerId) {
        let mut state = self.state();
        state.online.remove(&player);
        state.flying.remove(&player);
    }

    /// Gives a player flight.
    ///
    /// # Errors
    ///
    /// Fails if the player is offline or the board was told to reject them.
    pub fn grant(&self, player: PlayerId) -> Result<(), FlightRefusal> {
        let mut state = self.state();
        Self::check(&state, player)?;
        if state.flying.insert(player) {
            state.grants += 1;
        }
        Ok(())
    }

    /// Takes flight away from a player.
    ///
    /// # Errors
    ///
    /// Fails if the player is offline or the board was told to reject them.
    pub fn revoke(&self, player: PlayerId) -> Result<(), FlightRefusal> {
        let mut state = self.state();
        Self::check(&state, player)?;
        if state.flying.remove(&player) {
            state.revokes += 1;
        }
        Ok(())
    }

    fn check(state: &BoardState, player: PlayerId) -> Result<(), FlightRefusal> {
        if !state.online.contains(&player) {
            return Err(FlightRefusal::Offline(player));
        }
        if state.rejecting.contains(&player) {
            return Err(FlightRefusal::Rejected(player));
        }
        Ok(())
    }

    /// Returns true if the player currently has flight.
    #[must_use]
    pub fn is_flying(&self, player: PlayerId) -> bool {
        self.state().flying.contains(&player)
    }

    /// Sets or clears external blocks on a player.
    pub fn set_block(&self, player: PlayerId, block: FlightBlock, value: bool) {
        let mut state = self.state();
        let entry = state.blocks.entry(player).or_default();
        entry.set(block, value);
        if entry.is_empty() {
            state.blocks.remove(&player);
        }
    }

    /// Returns the blocks currently set on a player.
    #[must_use]
    pub fn blocks(&self, player: PlayerId) -> FlightBlock {
        self.state().blocks.get(&player).copied().unwrap_or_default()
    }

    /// Returns true if no external rule forbids flight for the player.
    #[must_use]
    pub fn is_unblocked(&self, player: PlayerId) -> bool {
        self.blocks(player).is_empty()
    }

    /// Makes every subsequent grant/revoke for `player` fail (or succeed again).
    pub fn reject_changes(&self, player: PlayerId, reject: bool) {
        let mut state = self.state();
        if reject {
            state.rejecting.insert(player);
        } else {
            state.rejecting.remove(&player);
        }
    }

    /// Number of grants that actually changed state.
    #[must_use]
    pub fn grant_count(&self) -> u64 {
        self.state().grants
    }

    /// Number of revokes that actually changed state.
    #[must_use]
    pub fn revoke_count(&self) -> u64 {
        self.state().revokes
    }
}
