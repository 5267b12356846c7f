//! Per-player presence records.
//!
//! The presence table remembers which town each observed player stands in and
//! whether their arrival was counted as an enemy. Entry and exit signals are
//! checked against it, so a duplicated entry or an exit without a matching
//! entry never reaches the tracker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use townmap::{PlayerId, TownId};

/// Where a player is, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Town the player is inside.
    pub town: TownId,
    /// Whether the player's arrival incremented the town's enemy count.
    ///
    /// Frozen at entry so the matching exit decrements exactly what was
    /// incremented, even if diplomacy changed in between.
    pub counted: bool,
}

/// Presence records keyed by player.
#[derive(Debug, Default)]
pub struct PresenceTable {
    players: HashMap<PlayerId, Presence>,
}

impl PresenceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a player's record.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> Option<Presence> {
        self.players.get(&player).copied()
    }

    /// Records a player, returning the previous record.
    pub fn insert(&mut self, player: PlayerId, presence: Presence) -> Option<Presence> {
        self.players.insert(player, presence)
    }

    /// Forgets a player, returning their record.
    pub fn remove(&mut self, player: PlayerId) -> Option<Presence> {
        self.players.remove(&player)
    }

    /// Returns everyone recorded inside `town`, sorted by player.
    #[must_use]
    pub fn occupants(&self, town: TownId) -> Vec<(PlayerId, Presence)> {
        let mut occupants: Vec<(PlayerId, Presence)> = self
            .players
            .iter()
            .filter(|(_, presence)| presence.town == town)
            .map(|(player, presence)| (*player, *presence))
            .collect();
        occupants.sort_by_key(|(player, _)| *player);
        occupants
    }

    /// Returns every recorded player, sorted.
    #[must_use]
    pub fn players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.players.keys().copied().collect();
        players.sort();
        players
    }

    /// Returns the number of recorded players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Forgets everyone.
    pub fn clear(&mut self) {
        self.players.clear();
    }
}
