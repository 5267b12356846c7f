//! Test helpers for building worlds and driving the reconciler.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use townmap::{FlightBoard, Location, NationId, PlayerId, PlotCoord, TownId, TownMap};

use crate::collaborator::{FlightControl, Territory};
use crate::error::FlightError;
use crate::reconciler::Reconciler;
use crate::signal::Reconciliation;

/// Installs a test-writer subscriber so tracing output shows on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// =============================================================================
// Town map world
// =============================================================================

/// A town map with one town at war, a flight board, and a reconciler.
///
/// Town `home` claims plots (0,0) and (1,0). Nation `defenders` (home's nation)
/// has declared nation `raiders` an enemy; residents of the `camp` town belong
/// to `raiders`. Plot (5,5) is wilderness.
pub struct World {
    pub map: Arc<RwLock<TownMap>>,
    pub board: Arc<FlightBoard>,
    pub reconciler: Reconciler<RwLock<TownMap>, FlightBoard>,
    pub home: TownId,
    pub camp: TownId,
    pub defenders: NationId,
    pub raiders: NationId,
    next_player: u64,
}

impl World {
    pub fn new() -> Self {
        init_tracing();
        let mut map = TownMap::new();
        let home = map.found_town("Home");
        let camp = map.found_town("Camp");
        let defenders = map.found_nation("Defenders");
        let raiders = map.found_nation("Raiders");
        map.join_nation(home, defenders).unwrap();
        map.join_nation(camp, raiders).unwrap();
        map.declare_enemy(defenders, raiders).unwrap();
        map.claim(home, PlotCoord::new(0, 0)).unwrap();
        map.claim(home, PlotCoord::new(1, 0)).unwrap();
        map.claim(camp, PlotCoord::new(10, 10)).unwrap();

        let map = Arc::new(RwLock::new(map));
        let board = Arc::new(FlightBoard::new());
        let reconciler = Reconciler::new(Arc::clone(&map), Arc::clone(&board));

        Self {
            map,
            board,
            reconciler,
            home,
            camp,
            defenders,
            raiders,
            next_player: 1,
        }
    }

    fn connect(&mut self, town: TownId, at: Location, flying: bool) -> PlayerId {
        let player = PlayerId::new(self.next_player);
        self.next_player += 1;
        {
            let mut map = self.map.write().unwrap();
            map.add_resident(town, player).unwrap();
            map.place_player(player, at);
        }
        self.board.connect(player);
        if flying {
            self.board.grant(player).unwrap();
        }
        player
    }

    /// A flying resident of `home`, standing in wilderness.
    pub fn resident(&mut self) -> PlayerId {
        self.connect(self.home, wilderness(), true)
    }

    /// A resident of the enemy `camp`, standing in wilderness.
    pub fn enemy(&mut self) -> PlayerId {
        self.connect(self.camp, wilderness(), false)
    }

    /// Moves a player and sends the matching enter/exit signals.
    pub fn walk(&self, player: PlayerId, to: Location) -> Reconciliation {
        let (from_town, to_town) = {
            let mut map = self.map.write().unwrap();
            let from_town = map.location_of(player).and_then(|loc| map.town_at(loc));
            map.place_player(player, to);
            (from_town, map.town_at(to))
        };

        let mut report = Reconciliation::default();
        if from_town == to_town {
            return report;
        }
        if let Some(town) = from_town {
            report.merge(self.reconciler.on_exit(player, town));
        }
        if let Some(town) = to_town {
            report.merge(self.reconciler.on_enter(player, town));
        }
        report
    }

    /// Moves a player instantly and sends a teleport signal.
    pub fn teleport(&self, player: PlayerId, to: Location) -> Reconciliation {
        let from = {
            let mut map = self.map.write().unwrap();
            let from = map.location_of(player).unwrap();
            map.place_player(player, to);
            from
        };
        self.reconciler.on_teleport(player, from, to)
    }

    /// Disconnects a player and sends the logout signal.
    pub fn logout(&self, player: PlayerId) -> Reconciliation {
        self.map.write().unwrap().remove_player(player);
        let report = self.reconciler.on_logout(player);
        self.board.disconnect(player);
        report
    }

    pub fn count(&self, town: TownId) -> Option<u32> {
        self.reconciler.tracker().enemy_count(town)
    }

    pub fn flying(&self, player: PlayerId) -> bool {
        self.board.is_flying(player)
    }
}

/// A location inside `home`'s first plot.
pub fn in_home() -> Location {
    PlotCoord::new(0, 0).center()
}

/// A different location inside `home`, on its second plot.
pub fn in_home_east() -> Location {
    PlotCoord::new(1, 0).center()
}

/// A location inside `camp`.
pub fn in_camp() -> Location {
    PlotCoord::new(10, 10).center()
}

/// An unclaimed location.
pub fn wilderness() -> Location {
    PlotCoord::new(5, 5).center()
}

// =============================================================================
// Collaborator doubles
// =============================================================================

/// Territory where every odd-numbered player is an enemy of every town and
/// locations map to towns by plot column.
#[derive(Debug, Default)]
pub struct OddEnemies;

impl Territory for OddEnemies {
    fn town_at(&self, location: Location) -> Option<TownId> {
        let plot = location.plot();
        u64::try_from(plot.x).ok().map(TownId::new)
    }

    fn is_enemy(&self, player: PlayerId, _town: TownId) -> bool {
        player.as_u64() % 2 == 1
    }

    fn location_of(&self, _player: PlayerId) -> Option<Location> {
        None
    }
}

/// Flight control that records calls and never fails.
#[derive(Debug, Default)]
pub struct CountingFlight {
    flying: Mutex<HashSet<PlayerId>>,
    pub calls: Mutex<Vec<(PlayerId, bool)>>,
}

impl FlightControl for CountingFlight {
    fn grant_flight(&self, player: PlayerId) -> Result<(), FlightError> {
        self.flying.lock().unwrap().insert(player);
        self.calls.lock().unwrap().push((player, true));
        Ok(())
    }

    fn revoke_flight(&self, player: PlayerId) -> Result<(), FlightError> {
        self.flying.lock().unwrap().remove(&player);
        self.calls.lock().unwrap().push((player, false));
        Ok(())
    }

    fn is_flying(&self, player: PlayerId) -> bool {
        self.flying.lock().unwrap().contains(&player)
    }
}

/// Hook run once, inside the next revoke of a given player.
type RevokeHook = Box<dyn FnOnce() + Send>;

/// Flight control that runs a hook in the middle of a revoke, before the
/// revoke itself lands.
#[derive(Default)]
pub struct InterruptingFlight {
    pub inner: CountingFlight,
    hook: Mutex<Option<(PlayerId, RevokeHook)>>,
}

impl InterruptingFlight {
    /// Arms `hook` to run inside the next revoke of `player`.
    pub fn on_revoke(&self, player: PlayerId, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock().unwrap() = Some((player, Box::new(hook)));
    }
}

impl FlightControl for InterruptingFlight {
    fn grant_flight(&self, player: PlayerId) -> Result<(), FlightError> {
        self.inner.grant_flight(player)
    }

    fn revoke_flight(&self, player: PlayerId) -> Result<(), FlightError> {
        let hook = {
            let mut armed = self.hook.lock().unwrap();
            match armed.take() {
                Some((target, hook)) if target == player => Some(hook),
                other => {
                    *armed = other;
                    None
                }
            }
        };
        if let Some(hook) = hook {
            hook();
        }
        self.inner.revoke_flight(player)
    }

    fn is_flying(&self, player: PlayerId) -> bool {
        self.inner.is_flying(player)
    }
}
