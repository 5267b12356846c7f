//! Town map: claims, residency, diplomacy, and player positions.
//!
//! The [`TownMap`] is the authoritative in-memory territory model. It answers
//! the two questions a flight rule needs about the world:
//!
//! - which town (if any) owns a location ([`TownMap::town_at`])
//! - whether a player is hostile to a town ([`TownMap::is_enemy`])
//!
//! # Enemies
//!
//! A player is an enemy of a town when either:
//! - the town has outlawed the player, or
//! - the player resides in a town whose nation the town's nation has declared
//!   an enemy.
//!
//! Residents are never enemies of their own town. Enmity is one-directional:
//! nation A declaring B an enemy makes B's residents enemies inside A's towns,
//! not the other way around.
//!
//! # Determinism
//!
//! Towns and nations are stored in `BTreeMap`s so listing operations return
//! them in ID order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ClaimError;
use crate::{Location, NationId, PlayerId, PlotCoord, TownId};

/// A claimed territory with a resident population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    /// Town identity.
    pub id: TownId,
    /// Display name.
    pub name: String,
    /// Nation the town belongs to, if any.
    pub nation: Option<NationId>,
    /// Players who live here.
    pub residents: BTreeSet<PlayerId>,
    /// Players the town has declared hostile regardless of diplomacy.
    pub outlaws: BTreeSet<PlayerId>,
}

/// A group of towns sharing diplomacy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nation {
    /// Nation identity.
    pub id: NationId,
    /// Display name.
    pub name: String,
    /// Nations this nation has declared enemies.
    pub enemies: BTreeSet<NationId>,
}

/// In-memory territory model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TownMap {
    next_town: u64,
    next_nation: u64,
    towns: BTreeMap<TownId, Town>,
    nations: BTreeMap<NationId, Nation>,
    plots: HashMap<PlotCoord, TownId>,
    residence: HashMap<PlayerId, TownId>,
    positions: HashMap<PlayerId, Location>,
}

impl TownMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Towns and nations
    // -------------------------------------------------------------------------

    /// Founds a new town with no claims and no residents.
    pub fn found_town(&mut self, name: &str) -> TownId {
        let id = TownId::new(self.next_town);
        self.next_town += 1;
        self.towns.insert(
            id,
            Town {
                id,
                name: name.to_string(),
                nation: None,
                residents: BTreeSet::new(),
                outlaws: BTreeSet::new(),
            },
        );
        tracing::debug!(town = %id, name, "town founded");
        id
    }

    /// Founds a new nation with no member towns.
    pub fn found_nation(&mut self, name: &str) -> NationId {
        let id = NationId::new(self.next_nation);
        self.next_nation += 1;
        self.nations.insert(
            id,
            Nation {
                id,
                name: name.to_string(),
                enemies: BTreeSet::new(),
            },
        );
        id
    }

    /// Returns a town by ID.
    #[must_use]
    pub fn town(&self, id: TownId) -> Option<&Town> {
        self.towns.get(&id)
    }

    /// Returns a nation by ID.
    #[must_use]
    pub fn nation(&self, id: NationId) -> Option<&Nation> {
        self.nations.get(&id)
    }

    /// Returns all towns in ID order.
    pub fn towns(&self) -> impl Iterator<Item = &Town> + '_ {
        self.towns.values()
    }

    /// Puts a town into a nation.
    ///
    /// # Errors
    ///
    /// Returns an error if either the town or the nation does not exist.
    pub fn join_nation(&mut self, town: TownId, nation: NationId) -> Result<(), ClaimError> {
        if !self.nations.contains_key(&nation) {
            return Err(ClaimError::UnknownNation(nation));
        }
        let entry = self.towns.get_mut(&town).ok_or(ClaimError::UnknownTown(town))?;
        entry.nation = Some(nation);
        Ok(())
    }

    /// Makes `nation` treat residents of `enemy`'s towns as hostile.
    ///
    /// # Errors
    ///
    /// Returns an error if either nation does not exist.
    pub fn declare_enemy(&mut self, nation: NationId, enemy: NationId) -> Result<(), ClaimError> {
        if !self.nations.contains_key(&enemy) {
            return Err(ClaimError::UnknownNation(enemy));
        }
        let entry = self
            .nations
            .get_mut(&nation)
            .ok_or(ClaimError::UnknownNation(nation))?;
        entry.enemies.insert(enemy);
        Ok(())
    }

    /// Ends hostility declared by `nation` toward `enemy`.
    ///
    /// # Errors
    ///
    /// Returns an error if `nation` does not exist.
    pub fn make_peace(&mut self, nation: NationId, enemy: NationId) -> Result<(), ClaimError> {
        let entry = self
            .nations
            .get_mut(&nation)
            .ok_or(ClaimError::UnknownNation(nation))?;
        entry.enemies.remove(&enemy);
        Ok(())
    }

    /// Registers a player as a resident of a town, leaving any previous town.
    ///
    /// # Errors
    ///
    /// Returns an error if the town does not exist.
    pub fn add_resident(&mut self, town: TownId, player: PlayerId) -> Result<(), ClaimError> {
        if !self.towns.contains_key(&town) {
            return Err(ClaimError::UnknownTown(town));
        }
        if let Some(previous) = self.residence.insert(player, town) {
            if let Some(old) = self.towns.get_mut(&previous) {
                old.residents.remove(&player);
            }
        }
        if let Some(entry) = self.towns.get_mut(&town) {
            entry.residents.insert(player);
            entry.outlaws.remove(&player);
        }
        Ok(())
    }

    /// Declares a player hostile to a town.
    ///
    /// # Errors
    ///
    /// Returns an error if the town does not exist.
    pub fn outlaw(&mut self, town: TownId, player: PlayerId) -> Result<(), ClaimError> {
        let entry = self.towns.get_mut(&town).ok_or(ClaimError::UnknownTown(town))?;
        entry.outlaws.insert(player);
        Ok(())
    }

    /// Returns the town a player lives in.
    #[must_use]
    pub fn residence_of(&self, player: PlayerId) -> Option<TownId> {
        self.residence.get(&player).copied()
    }

    /// Returns true if `player` is hostile to `town`.
    #[must_use]
    pub fn is_enemy(&self, player: PlayerId, town: TownId) -> bool {
        let Some(target) = self.towns.get(&town) else {
            return false;
        };
        if target.residents.contains(&player) {
            return false;
        }
        if target.outlaws.contains(&player) {
            return true;
        }

        let player_nation = self
            .residence_of(player)
            .and_then(|home| self.towns.get(&home))
            .and_then(|home| home.nation);

        match (target.nation, player_nation) {
            (Some(ours), Some(theirs)) if ours != theirs => self
                .nations
                .get(&ours)
                .is_some_and(|n| n.enemies.contains(&theirs)),
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Claims
    // -------------------------------------------------------------------------

    /// Claims a plot for a town.
    ///
    /// # Errors
    ///
    /// Returns an error if the town does not exist or the plot is owned by
    /// another town. Re-claiming a plot the town already owns succeeds.
    pub fn claim(&mut self, town: TownId, plot: PlotCoord) -> Result<(), ClaimError> {
        if !self.towns.contains_key(&town) {
            return Err(ClaimError::UnknownTown(town));
        }
        match self.plots.get(&plot) {
            Some(&owner) if owner != town => Err(ClaimError::PlotAlreadyClaimed { plot, owner }),
            _ => {
                self.plots.insert(plot, town);
                Ok(())
            }
        }
    }

    /// Releases a plot owned by a town.
    ///
    /// # Errors
    ///
    /// Returns an error if the plot is not owned by `town`.
    pub fn unclaim(&mut self, town: TownId, plot: PlotCoord) -> Result<(), ClaimError> {
        match self.plots.get(&plot) {
            Some(&owner) if owner == town => {
                self.plots.remove(&plot);
                Ok(())
            }
            _ => Err(ClaimError::NotClaimed { plot, town }),
        }
    }

    /// Releases every plot owned by a town, returning them sorted.
    pub fn unclaim_all(&mut self, town: TownId) -> Vec<PlotCoord> {
        let mut released: Vec<PlotCoord> = self
            .plots
            .iter()
            .filter(|(_, owner)| **owner == town)
            .map(|(plot, _)| *plot)
            .collect();
        for plot in &released {
            self.plots.remove(plot);
        }
        released.sort();
        released
    }

    /// Returns the owner of a plot.
    #[must_use]
    pub fn owner_of(&self, plot: PlotCoord) -> Option<TownId> {
        self.plots.get(&plot).copied()
    }

    /// Returns the town whose claim contains `location`.
    #[must_use]
    pub fn town_at(&self, location: Location) -> Option<TownId> {
        self.owner_of(location.plot())
    }

    /// Returns the number of plots a town owns.
    #[must_use]
    pub fn claim_count(&self, town: TownId) -> usize {
        self.plots.values().filter(|owner| **owner == town).count()
    }

    // -------------------------------------------------------------------------
    // Player positions
    // -------------------------------------------------------------------------

    /// Places (or moves) an online player.
    pub fn place_player(&mut self, player: PlayerId, location: Location) {
        self.positions.insert(player, location);
    }

    /// Removes a player from the world (logout).
    pub fn remove_player(&mut self, player: PlayerId) -> Option<Location> {
        self.positions.remove(&player)
    }

    /// Returns an online player's location.
    #[must_use]
    pub fn location_of(&self, player: PlayerId) -> Option<Location> {
        self.positions.get(&player).copied()
    }

    /// Returns all online players, sorted by ID.
    #[must_use]
    pub fn online_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.positions.keys().copied().collect();
        players.sort();
        players
    }

    /// Returns the online players standing inside a town, sorted by ID.
    #[must_use]
    pub fn players_in(&self, town: TownId) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self
            .positions
            .iter()
            .filter(|(_, loc)| self.town_at(**loc) == Some(town))
            .map(|(player, _)| *player)
            .collect();
        players.sort();
        players
    }
}
