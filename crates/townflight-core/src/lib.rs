//! # Townflight Core
//!
//! Enemy-presence flight suspension for town territories.
//!
//! Players may fly inside towns, but while one or more enemies of a town are
//! physically inside its claim, nobody there flies. When the last enemy
//! leaves, flight is restored automatically.
//!
//! ## Architecture
//!
//! - **Collaborators** ([`collaborator`]): territory lookups and flight control,
//!   supplied by the host as trait objects or generics
//! - **Tracker** ([`tracker`]): per-town enemy counts; the only shared state
//! - **Reconciler** ([`reconciler`]): classifies host signals, updates the
//!   tracker exactly once per real presence change, and drives flight
//! - **Guard** ([`guard`]): creates the above from [`config`] and owns their
//!   lifecycle
//!
//! ## Usage
//!
//! ```
//! use std::sync::{Arc, RwLock};
//! use townflight_core::{FlightConfig, FlightGuard, Signal};
//! use townmap::{FlightBoard, PlayerId, PlotCoord, TownMap};
//!
//! let mut map = TownMap::new();
//! let town = map.found_town("Ashford");
//! map.claim(town, PlotCoord::new(0, 0)).unwrap();
//! let raider = PlayerId::new(9);
//! map.outlaw(town, raider).unwrap();
//!
//! let guard = FlightGuard::start(
//!     FlightConfig::default(),
//!     Arc::new(RwLock::new(map)),
//!     Arc::new(FlightBoard::new()),
//!     &[],
//! );
//!
//! guard.dispatch(&Signal::Enter { player: raider, town });
//! assert!(guard.town_is_contested(town));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export townmap for identity types
pub use townmap;

pub mod collaborator;
pub mod config;
pub mod error;
pub mod guard;
pub mod reconciler;
pub mod signal;
pub mod tracker;

pub use collaborator::{FlightControl, Territory};
pub use config::{DisableBy, FlightConfig};
pub use error::{ConfigError, FlightError, TrackerError};
pub use guard::FlightGuard;
pub use reconciler::{Presence, Reconciler};
pub use signal::{FlightAction, Reconciliation, Signal, Transition};
pub use tracker::{DecrementOutcome, EnemyTracker};

#[cfg(test)]
mod tests;
