//! Collaborator traits the reconciler depends on.
//!
//! The core owns neither territory nor flight. It consumes them through two
//! traits supplied at construction:
//!
//! - [`Territory`]: which town owns a location, who is hostile, where players are
//! - [`FlightControl`]: grant/revoke flight and report external deny-reasons
//!
//! Reference implementations are provided for the `townmap` types:
//! `RwLock<TownMap>` implements [`Territory`] and [`FlightBoard`] implements
//! [`FlightControl`]. Tests substitute their own implementations freely.
//!
//! Both traits require `Send + Sync` because events arrive from the host's
//! worker threads.

use std::sync::{PoisonError, RwLock};

use townmap::{FlightBoard, Location, PlayerId, TownId, TownMap};

use crate::error::FlightError;

/// Read access to territory ownership and diplomacy.
pub trait Territory: Send + Sync {
    /// Returns the town whose claim contains `location`, or `None` for wilderness.
    fn town_at(&self, location: Location) -> Option<TownId>;

    /// Returns true if `player` is hostile to `town`.
    fn is_enemy(&self, player: PlayerId, town: TownId) -> bool;

    /// Returns the player's current location, or `None` if they are offline.
    fn location_of(&self, player: PlayerId) -> Option<Location>;

    /// Returns the town the player currently stands in.
    fn town_of(&self, player: PlayerId) -> Option<TownId> {
        self.location_of(player)
            .and_then(|location| self.town_at(location))
    }
}

/// Control over player flight.
///
/// `grant_flight` and `revoke_flight` must be idempotent: repeating either has
/// the same observable effect as calling it once.
pub trait FlightControl: Send + Sync {
    /// Gives the player flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be applied.
    fn grant_flight(&self, player: PlayerId) -> Result<(), FlightError>;

    /// Takes flight away from the player.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be applied.
    fn revoke_flight(&self, player: PlayerId) -> Result<(), FlightError>;

    /// Returns true if the player can currently fly.
    fn is_flying(&self, player: PlayerId) -> bool;

    /// Returns false if a rule outside enemy presence forbids this player
    /// from flying. Restoration skips such players.
    fn may_fly(&self, _player: PlayerId) -> bool {
        true
    }
}

impl Territory for RwLock<TownMap> {
    fn town_at(&self, location: Location) -> Option<TownId> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .town_at(location)
    }

    fn is_enemy(&self, player: PlayerId, town: TownId) -> bool {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_enemy(player, town)
    }

    fn location_of(&self, player: PlayerId) -> Option<Location> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .location_of(player)
    }

    fn town_of(&self, player: PlayerId) -> Option<TownId> {
        let map = self.read().unwrap_or_else(PoisonError::into_inner);
        map.location_of(player).and_then(|loc| map.town_at(loc))
    }
}

impl FlightControl for FlightBoard {
    fn grant_flight(&self, player: PlayerId) -> Result<(), FlightError> {
        Ok(self.grant(player)?)
    }

    fn revoke_flight(&self, player: PlayerId) -> Result<(), FlightError> {
        Ok(self.revoke(player)?)
    }

    fn is_flying(&self, player: PlayerId) -> bool {
        FlightBoard::is_flying(self, player)
    }

    fn may_fly(&self, player: PlayerId) -> bool {
        self.is_unblocked(player)
    }
}
