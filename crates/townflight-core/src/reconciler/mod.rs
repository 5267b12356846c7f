//! Event reconciler.
//!
//! The [`Reconciler`] turns host movement signals into tracker updates and
//! flight changes. It is the only writer of the [`EnemyTracker`] and the only
//! caller of flight grant/revoke for enemy-presence reasons.
//!
//! # Exactly-Once Counting
//!
//! Every signal is checked against a [`PresenceTable`] before it reaches the
//! tracker:
//! - entering the town a player is already recorded in does nothing
//! - entering a different town first leaves the recorded one
//! - exiting a town the player is not recorded in does nothing
//! - a departure decrements only if the arrival was counted
//!
//! # Two Phases
//!
//! Each call runs in two phases:
//!
//! 1. **PLAN**: under the presence lock, update presence and counts and collect
//!    the [`FlightAction`]s the change requires.
//! 2. **APPLY**: with no lock held, call the flight collaborator. Each action
//!    re-checks the town's state first, so a revoke racing a restore (or the
//!    reverse) is dropped instead of applied out of order.
//!
//! Lock order is presence, then tracker. The tracker never calls back.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, RwLock};
//! use townflight_core::reconciler::Reconciler;
//! use townmap::{FlightBoard, PlayerId, PlotCoord, TownMap};
//!
//! let mut map = TownMap::new();
//! let town = map.found_town("Ashford");
//! map.claim(town, PlotCoord::new(0, 0)).unwrap();
//! let raider = PlayerId::new(1);
//! map.outlaw(town, raider).unwrap();
//!
//! let reconciler = Reconciler::new(Arc::new(RwLock::new(map)), Arc::new(FlightBoard::new()));
//!
//! reconciler.on_enter(raider, town);
//! assert!(reconciler.town_is_contested(town));
//!
//! let report = reconciler.on_logout(raider);
//! assert!(report.cleared(town));
//! ```

mod presence;

pub use presence::{Presence, PresenceTable};

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rayon::prelude::*;
use townmap::{Location, PlayerId, TownId};

use crate::collaborator::{FlightControl, Territory};
use crate::signal::{FlightAction, Reconciliation, Signal, Transition};
use crate::tracker::{DecrementOutcome, EnemyTracker};

/// Changes decided under lock, applied after release.
#[derive(Debug, Default)]
struct Plan {
    transitions: Vec<Transition>,
    actions: Vec<FlightAction>,
}

/// Drives the enemy tracker and flight collaborator from host signals.
pub struct Reconciler<T: Territory + ?Sized, F: FlightControl + ?Sized> {
    territory: Arc<T>,
    flight: Arc<F>,
    tracker: Arc<EnemyTracker>,
    presence: Mutex<PresenceTable>,
}

impl<T: Territory + ?Sized, F: FlightControl + ?Sized> fmt::Debug for Reconciler<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("tracker", &self.tracker)
            .field("presence", &self.presence)
            .finish_non_exhaustive()
    }
}

impl<T: Territory + ?Sized, F: FlightControl + ?Sized> Reconciler<T, F> {
    /// Creates a reconciler with a fresh tracker.
    #[must_use]
    pub fn new(territory: Arc<T>, flight: Arc<F>) -> Self {
        Self::with_tracker(territory, flight, Arc::new(EnemyTracker::new()))
    }

    /// Creates a reconciler around an existing tracker.
    #[must_use]
    pub fn with_tracker(territory: Arc<T>, flight: Arc<F>, tracker: Arc<EnemyTracker>) -> Self {
        Self {
            territory,
            flight,
            tracker,
            presence: Mutex::new(PresenceTable::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, PresenceTable> {
        self.presence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the tracker this reconciler drives.
    #[must_use]
    pub fn tracker(&self) -> &Arc<EnemyTracker> {
        &self.tracker
    }

    /// Returns true if enemies are currently inside `town`.
    #[must_use]
    pub fn town_is_contested(&self, town: TownId) -> bool {
        self.tracker.town_is_contested(town)
    }

    /// Returns a player's presence record.
    #[must_use]
    pub fn presence_of(&self, player: PlayerId) -> Option<Presence> {
        self.table().get(player)
    }

    /// Returns the players recorded inside `town`, sorted.
    #[must_use]
    pub fn occupants(&self, town: TownId) -> Vec<PlayerId> {
        self.table()
            .occupants(town)
            .into_iter()
            .map(|(player, _)| player)
            .collect()
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Routes a signal to its handler.
    pub fn dispatch(&self, signal: &Signal) -> Reconciliation {
        match *signal {
            Signal::Enter { player, town } => self.on_enter(player, town),
            Signal::Exit { player, town } => self.on_exit(player, town),
            Signal::Logout { player } => self.on_logout(player),
            Signal::Join { player } => self.on_join(player),
            Signal::Teleport { player, from, to } => self.on_teleport(player, from, to),
            Signal::ClaimRemoved { town } => self.on_claim_removed(town),
        }
    }

    /// The player crossed into `town`.
    pub fn on_enter(&self, player: PlayerId, town: TownId) -> Reconciliation {
        self.relocate(player, Some(town))
    }

    /// The player crossed out of `town`.
    ///
    /// Ignored unless the player is recorded inside `town`.
    pub fn on_exit(&self, player: PlayerId, town: TownId) -> Reconciliation {
        let plan = {
            let mut table = self.table();
            let mut plan = Plan::default();
            match table.get(player) {
                Some(presence) if presence.town == town => {
                    self.leave_locked(&mut table, player, &mut plan);
                }
                recorded => {
                    tracing::debug!(
                        player = %player,
                        town = %town,
                        recorded = ?recorded.map(|p| p.town),
                        "exit from a town the player is not recorded in; ignoring"
                    );
                }
            }
            plan
        };
        self.apply(plan)
    }

    /// The player disconnected. Counts as leaving whatever town they were in.
    pub fn on_logout(&self, player: PlayerId) -> Reconciliation {
        let plan = {
            let mut table = self.table();
            let mut plan = Plan::default();
            self.leave_locked(&mut table, player, &mut plan);
            plan
        };
        self.apply(plan)
    }

    /// The player connected. Re-derives their presence from where they stand.
    pub fn on_join(&self, player: PlayerId) -> Reconciliation {
        let destination = self.territory.town_of(player);
        self.relocate(player, destination)
    }

    /// The player teleported from `from` to `to`.
    ///
    /// A teleport that stays within one town (or within wilderness) does
    /// nothing unless the player is recorded somewhere else.
    pub fn on_teleport(&self, player: PlayerId, from: Location, to: Location) -> Reconciliation {
        let source = self.territory.town_at(from);
        let destination = self.territory.town_at(to);
        if source == destination && self.table().get(player).map(|p| p.town) == destination {
            tracing::debug!(player = %player, town = ?source, "teleport within one area; ignoring");
            return Reconciliation::default();
        }
        self.relocate(player, destination)
    }

    /// Some of `town`'s claim was released.
    ///
    /// Everyone recorded in `town` who no longer stands inside it is treated
    /// as having left; anyone now standing in a different town enters it.
    /// Displaced friendly players leave before any enemy, so a clear caused
    /// by the release only restores players still standing in `town`.
    pub fn on_claim_removed(&self, town: TownId) -> Reconciliation {
        let displaced: Vec<(PlayerId, Option<(TownId, bool)>)> = self
            .occupants(town)
            .into_iter()
            .filter_map(|player| {
                let now = self.territory.town_of(player);
                (now != Some(town)).then(|| {
                    let classified = now.map(|to| (to, self.territory.is_enemy(player, to)));
                    (player, classified)
                })
            })
            .collect();

        let plan = {
            let mut table = self.table();
            let mut plan = Plan::default();
            let (enemies, friendly): (Vec<_>, Vec<_>) = displaced
                .into_iter()
                .filter(|(player, _)| table.get(*player).is_some_and(|p| p.town == town))
                .partition(|(player, _)| table.get(*player).is_some_and(|p| p.counted));
            for (player, destination) in friendly.into_iter().chain(enemies) {
                tracing::debug!(player = %player, town = %town, "claim removed under player");
                self.move_locked(&mut table, player, destination, &mut plan);
            }
            plan
        };
        self.apply(plan)
    }

    /// Rebuilds presence from the current world state.
    ///
    /// `online` is every connected player. Recorded players missing from it
    /// are logged out; everyone else is classified in parallel, then moved to
    /// where they stand.
    pub fn resync(&self, online: &[PlayerId]) -> Reconciliation {
        let mut report = Reconciliation::default();

        let connected: HashSet<PlayerId> = online.iter().copied().collect();
        let stale: Vec<PlayerId> = self
            .table()
            .players()
            .into_iter()
            .filter(|player| !connected.contains(player))
            .collect();
        for player in stale {
            report.merge(self.on_logout(player));
        }

        let territory = &self.territory;
        let classified: Vec<(PlayerId, Option<(TownId, bool)>)> = online
            .par_iter()
            .map(|&player| {
                let destination = territory
                    .town_of(player)
                    .map(|town| (town, territory.is_enemy(player, town)));
                (player, destination)
            })
            .collect();

        for (player, destination) in classified {
            report.merge(self.relocate_classified(player, destination));
        }

        tracing::info!(
            players = online.len(),
            contested = self.tracker.contested_towns().len(),
            "enemy presence resynchronised"
        );
        report
    }

    /// Lifts every suspension and forgets all state.
    ///
    /// Used when the feature is switched off: occupants of contested towns
    /// get their flight back (subject to [`FlightControl::may_fly`]).
    pub fn release_all(&self) -> Reconciliation {
        let plan = {
            let mut table = self.table();
            let mut plan = Plan::default();
            for town in self.tracker.contested_towns() {
                plan.transitions.push(Transition::Cleared(town));
                Self::plan_restore(&table, town, &mut plan);
            }
            table.clear();
            self.tracker.clear();
            plan
        };
        self.apply(plan)
    }

    // =========================================================================
    // Planning
    // =========================================================================

    fn relocate(&self, player: PlayerId, destination: Option<TownId>) -> Reconciliation {
        let classified =
            destination.map(|town| (town, self.territory.is_enemy(player, town)));
        self.relocate_classified(player, classified)
    }

    fn relocate_classified(
        &self,
        player: PlayerId,
        destination: Option<(TownId, bool)>,
    ) -> Reconciliation {
        let plan = {
            let mut table = self.table();
            let mut plan = Plan::default();
            self.move_locked(&mut table, player, destination, &mut plan);
            plan
        };
        self.apply(plan)
    }

    fn move_locked(
        &self,
        table: &mut PresenceTable,
        player: PlayerId,
        destination: Option<(TownId, bool)>,
        plan: &mut Plan,
    ) {
        match (table.get(player), destination) {
            (Some(presence), Some((town, _))) if presence.town == town => {
                tracing::debug!(player = %player, town = %town, "already inside; ignoring");
            }
            (_, Some((town, enemy))) => {
                self.enter_locked(table, player, town, enemy, plan);
            }
            (Some(_), None) => {
                self.leave_locked(table, player, plan);
            }
            (None, None) => {}
        }
    }

    fn enter_locked(
        &self,
        table: &mut PresenceTable,
        player: PlayerId,
        town: TownId,
        enemy: bool,
        plan: &mut Plan,
    ) {
        if table.get(player).is_some() {
            self.leave_locked(table, player, plan);
        }
        table.insert(
            player,
            Presence {
                town,
                counted: enemy,
            },
        );

        if enemy {
            let count = self.tracker.increment_enemies(town);
            if count == 1 {
                // First enemy: ground everyone already inside, the enemy included.
                plan.transitions.push(Transition::Contested(town));
                for (occupant, _) in table.occupants(town) {
                    plan.actions.push(FlightAction::Revoke {
                        player: occupant,
                        town,
                    });
                }
            } else {
                plan.actions.push(FlightAction::Revoke { player, town });
            }
        } else if self.tracker.town_is_contested(town) {
            plan.actions.push(FlightAction::Revoke { player, town });
        }
    }

    fn leave_locked(&self, table: &mut PresenceTable, player: PlayerId, plan: &mut Plan) {
        let Some(presence) = table.remove(player) else {
            return;
        };
        if !presence.counted {
            return;
        }
        // Untracked and already-clear towns are logged by the tracker.
        if let Ok(DecrementOutcome::Cleared) = self.tracker.decrement_enemies(presence.town) {
            plan.transitions.push(Transition::Cleared(presence.town));
            Self::plan_restore(table, presence.town, plan);
        }
    }

    fn plan_restore(table: &PresenceTable, town: TownId, plan: &mut Plan) {
        for (occupant, presence) in table.occupants(town) {
            if !presence.counted {
                plan.actions.push(FlightAction::Restore {
                    player: occupant,
                    town,
                });
            }
        }
    }

    // =========================================================================
    // Applying
    // =========================================================================

    fn apply(&self, plan: Plan) -> Reconciliation {
        let mut report = Reconciliation {
            transitions: plan.transitions,
            ..Reconciliation::default()
        };

        for action in plan.actions {
            match action {
                FlightAction::Revoke { player, town } => {
                    if !self.tracker.town_is_contested(town) {
                        report.skipped.push(player);
                        continue;
                    }
                    match self.flight.revoke_flight(player) {
                        Ok(()) => {
                            report.revoked.push(player);
                            self.undo_stale_revoke(player, town, &mut report);
                        }
                        Err(err) => {
                            tracing::warn!(player = %player, town = %town, error = %err, "failed to revoke flight");
                            report.failures += 1;
                        }
                    }
                }
                FlightAction::Restore { player, town } => {
                    if self.tracker.town_is_contested(town)
                        || !self.flight.may_fly(player)
                        || self.territory.is_enemy(player, town)
                    {
                        report.skipped.push(player);
                        continue;
                    }
                    match self.flight.grant_flight(player) {
                        Ok(()) => report.granted.push(player),
                        Err(err) => {
                            tracing::warn!(player = %player, town = %town, error = %err, "failed to restore flight");
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        for transition in &report.transitions {
            if let Transition::Cleared(town) = transition {
                tracing::info!(town = %town, granted = report.granted.len(), "flight re-added to players in town");
            }
        }
        report
    }

    /// A town can clear while a revoke is in flight; its restoration may then
    /// land before the revoke. Grants flight back if that happened.
    fn undo_stale_revoke(&self, player: PlayerId, town: TownId, report: &mut Reconciliation) {
        if self.tracker.town_is_contested(town) {
            return;
        }
        let still_inside = self
            .table()
            .get(player)
            .is_some_and(|p| p.town == town && !p.counted);
        if !still_inside || !self.flight.may_fly(player) || self.territory.is_enemy(player, town) {
            return;
        }
        tracing::debug!(player = %player, town = %town, "town cleared during revoke; restoring");
        match self.flight.grant_flight(player) {
            Ok(()) => report.granted.push(player),
            Err(err) => {
                tracing::warn!(player = %player, town = %town, error = %err, "failed to restore flight");
                report.failures += 1;
            }
        }
    }
}
