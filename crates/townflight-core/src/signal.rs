//! Host signals and reconciliation reports.
//!
//! A [`Signal`] is one movement-related event from the host. Hosts with a
//! single event bus forward signals to
//! [`Reconciler::dispatch`](crate::reconciler::Reconciler::dispatch); hosts
//! with one listener per event call the matching `on_*` function directly.
//!
//! Every reconciliation returns a [`Reconciliation`] describing what changed.
//! Hosts may ignore it; it exists for logging and tests.
//!
//! # Example
//!
//! ```
//! use townflight_core::signal::Signal;
//! use townmap::{PlayerId, TownId};
//!
//! let signal = Signal::Enter { player: PlayerId::new(1), town: TownId::new(2) };
//! assert_eq!(signal.player(), Some(PlayerId::new(1)));
//! ```

use serde::{Deserialize, Serialize};
use townmap::{Location, PlayerId, TownId};

/// A movement-related event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// The player crossed into a town's claim.
    Enter {
        /// Moving player.
        player: PlayerId,
        /// Town entered.
        town: TownId,
    },
    /// The player crossed out of a town's claim.
    Exit {
        /// Moving player.
        player: PlayerId,
        /// Town left.
        town: TownId,
    },
    /// The player disconnected.
    Logout {
        /// Departing player.
        player: PlayerId,
    },
    /// The player connected (or the host replays online players after a restart).
    Join {
        /// Arriving player.
        player: PlayerId,
    },
    /// The player was moved instantly between two locations.
    Teleport {
        /// Moving player.
        player: PlayerId,
        /// Origin.
        from: Location,
        /// Destination.
        to: Location,
    },
    /// Some or all of a town's claim was released.
    ClaimRemoved {
        /// Town that lost territory.
        town: TownId,
    },
}

impl Signal {
    /// Returns the player the signal is about, if it concerns a single player.
    #[must_use]
    pub const fn player(&self) -> Option<PlayerId> {
        match self {
            Self::Enter { player, .. }
            | Self::Exit { player, .. }
            | Self::Logout { player }
            | Self::Join { player }
            | Self::Teleport { player, .. } => Some(*player),
            Self::ClaimRemoved { .. } => None,
        }
    }
}

/// A town crossing the zero boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// `CLEAR -> CONTESTED`: the first enemy arrived.
    Contested(TownId),
    /// `CONTESTED -> CLEAR`: the last enemy left.
    Cleared(TownId),
}

/// A flight change computed under lock and applied after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightAction {
    /// Take flight away from the player if `town` is still contested when applied.
    Revoke {
        /// Player to ground.
        player: PlayerId,
        /// Contested town the player is inside.
        town: TownId,
    },
    /// Restore flight to the player if `town` is still clear when applied.
    Restore {
        /// Player to grant flight to.
        player: PlayerId,
        /// Town whose clearing triggered the restore.
        town: TownId,
    },
}

/// What a reconciliation call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Zero-boundary crossings, in order.
    pub transitions: Vec<Transition>,
    /// Players whose flight was restored.
    pub granted: Vec<PlayerId>,
    /// Players denied flight.
    pub revoked: Vec<PlayerId>,
    /// Players whose flight change was dropped because the town changed state
    /// before it was applied, or (for restores) because another rule forbids
    /// them flight.
    pub skipped: Vec<PlayerId>,
    /// Flight calls that failed and were dropped.
    pub failures: usize,
}

impl Reconciliation {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.transitions.is_empty()
            && self.granted.is_empty()
            && self.revoked.is_empty()
            && self.skipped.is_empty()
            && self.failures == 0
    }

    /// Returns true if `town` went from contested to clear.
    #[must_use]
    pub fn cleared(&self, town: TownId) -> bool {
        self.transitions.contains(&Transition::Cleared(town))
    }

    /// Returns true if `town` went from clear to contested.
    #[must_use]
    pub fn contested(&self, town: TownId) -> bool {
        self.transitions.contains(&Transition::Contested(town))
    }

    /// Appends another report to this one.
    pub fn merge(&mut self, other: Self) {
        self.transitions.extend(other.transitions);
        self.granted.extend(other.granted);
        self.revoked.extend(other.revoked);
        self.skipped.extend(other.skipped);
        self.failures += other.failures;
    }
}
