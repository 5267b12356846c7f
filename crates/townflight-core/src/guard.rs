//! Flight guard: lifecycle owner for enemy-presence suspension.
//!
//! The [`FlightGuard`] is what the host plugin holds. It reads the
//! [`FlightConfig`] and, only when suspension is enabled, creates the
//! [`EnemyTracker`] and [`Reconciler`]. When disabled, neither exists and
//! every signal is dropped without work.
//!
//! # Lifecycle
//!
//! 1. [`FlightGuard::start`]: build from config, resynchronise from the players
//!    currently online.
//! 2. [`FlightGuard::dispatch`]: forward host signals.
//! 3. [`FlightGuard::reload`]: tear down and rebuild with new config.
//! 4. [`FlightGuard::shutdown`]: lift all suspensions and drop the state.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, RwLock};
//! use townflight_core::config::FlightConfig;
//! use townflight_core::guard::FlightGuard;
//! use townmap::{FlightBoard, TownMap};
//!
//! let territory = Arc::new(RwLock::new(TownMap::new()));
//! let flight = Arc::new(FlightBoard::new());
//!
//! let guard = FlightGuard::start(FlightConfig::disabled(), territory, flight, &[]);
//! assert!(!guard.is_active());
//! assert!(guard.tracker().is_none());
//! ```

use std::sync::Arc;

use townmap::{PlayerId, TownId};

use crate::collaborator::{FlightControl, Territory};
use crate::config::FlightConfig;
use crate::reconciler::Reconciler;
use crate::signal::{Reconciliation, Signal};
use crate::tracker::EnemyTracker;

/// Owns the tracker and reconciler for as long as suspension is enabled.
#[derive(Debug)]
pub struct FlightGuard<T: Territory + ?Sized, F: FlightControl + ?Sized> {
    config: FlightConfig,
    territory: Arc<T>,
    flight: Arc<F>,
    reconciler: Option<Reconciler<T, F>>,
}

impl<T: Territory + ?Sized, F: FlightControl + ?Sized> FlightGuard<T, F> {
    /// Builds the guard and, if enabled, resynchronises from `online`.
    #[must_use]
    pub fn start(config: FlightConfig, territory: Arc<T>, flight: Arc<F>, online: &[PlayerId]) -> Self {
        let mut guard = Self {
            config,
            territory,
            flight,
            reconciler: None,
        };
        guard.activate(online);
        guard
    }

    fn activate(&mut self, online: &[PlayerId]) -> Reconciliation {
        if !self.config.suspends_on_enemies() {
            tracing::info!("enemy presence flight suspension disabled");
            return Reconciliation::default();
        }
        let reconciler = Reconciler::new(Arc::clone(&self.territory), Arc::clone(&self.flight));
        tracing::info!("enemy presence tracking enabled");
        let report = reconciler.resync(online);
        self.reconciler = Some(reconciler);
        report
    }

    /// Returns the active config.
    #[must_use]
    pub fn config(&self) -> FlightConfig {
        self.config
    }

    /// Returns true if enemy presence is being tracked.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.reconciler.is_some()
    }

    /// Returns the reconciler, if active.
    #[must_use]
    pub fn reconciler(&self) -> Option<&Reconciler<T, F>> {
        self.reconciler.as_ref()
    }

    /// Returns the tracker, if active.
    #[must_use]
    pub fn tracker(&self) -> Option<&EnemyTracker> {
        self.reconciler.as_ref().map(|r| r.tracker().as_ref())
    }

    /// Returns true if enemies are inside `town`. Always false when inactive.
    #[must_use]
    pub fn town_is_contested(&self, town: TownId) -> bool {
        self.reconciler
            .as_ref()
            .is_some_and(|r| r.town_is_contested(town))
    }

    /// Forwards a host signal. Does nothing when inactive.
    pub fn dispatch(&self, signal: &Signal) -> Reconciliation {
        match &self.reconciler {
            Some(reconciler) => reconciler.dispatch(signal),
            None => Reconciliation::default(),
        }
    }

    /// Replaces the config, discarding all tracked state and rebuilding it
    /// from `online`.
    pub fn reload(&mut self, config: FlightConfig, online: &[PlayerId]) -> Reconciliation {
        let mut report = self.shutdown();
        self.config = config;
        report.merge(self.activate(online));
        report
    }

    /// Lifts every suspension and drops the tracker.
    pub fn shutdown(&mut self) -> Reconciliation {
        match self.reconciler.take() {
            Some(reconciler) => {
                let report = reconciler.release_all();
                tracing::info!("enemy presence tracking stopped");
                report
            }
            None => Reconciliation::default(),
        }
    }
}
