//! # Townmap
//!
//! In-memory town territory substrate.
//!
//! Townmap models the world the way a town-management layer sees it: towns
//! claim fixed-size plots, players reside in towns, towns join nations, and
//! nations declare each other enemies. It also keeps a reference flight board
//! recording which players may currently fly.
//!
//! Hosts that already have their own territory model only need the identity
//! types from this crate ([`TownId`], [`PlayerId`], [`Location`]).
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec3;
//! use townmap::{Location, PlotCoord, TownMap};
//!
//! let mut map = TownMap::new();
//! let town = map.found_town("Ashford");
//! map.claim(town, PlotCoord::new(0, 0)).unwrap();
//!
//! let inside = Location::new(Vec3::new(3.0, 64.0, 7.0));
//! assert_eq!(map.town_at(inside), Some(town));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod flight;
pub mod map;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use error::ClaimError;
pub use flight::{FlightBlock, FlightBoard, FlightRefusal};
pub use map::{Nation, Town, TownMap};

/// Edge length of a claimable plot, in world units.
pub const PLOT_SIZE: f32 = 16.0;

/// Opaque identity of a town.
///
/// Town IDs are assigned by [`TownMap`] and are only meaningful as map keys.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TownId(u64);

impl TownId {
    /// Creates a `TownId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TownId({})", self.0)
    }
}

impl fmt::Display for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "town#{}", self.0)
    }
}

/// Opaque identity of a player.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(u64);

impl PlayerId {
    /// Creates a `PlayerId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Opaque identity of a nation (a group of allied towns).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NationId(u64);

impl NationId {
    /// Creates a `NationId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// A position in the world.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// World-space position. `y` is height and does not affect claims.
    pub position: Vec3,
}

impl Location {
    /// Creates a location at the given position.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self { position }
    }

    /// Creates a location at ground level from horizontal coordinates.
    #[must_use]
    pub const fn at(x: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, 64.0, z))
    }

    /// Returns the plot this location falls in.
    #[must_use]
    pub fn plot(&self) -> PlotCoord {
        PlotCoord::containing(self.position)
    }
}

/// Integer coordinate of a claimable plot on the horizontal plane.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlotCoord {
    /// Plot column (world `x / PLOT_SIZE`, floored).
    pub x: i32,
    /// Plot row (world `z / PLOT_SIZE`, floored).
    pub z: i32,
}

impl PlotCoord {
    /// Creates a plot coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Returns the plot containing a world position.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(position: Vec3) -> Self {
        Self {
            x: (position.x / PLOT_SIZE).floor() as i32,
            z: (position.z / PLOT_SIZE).floor() as i32,
        }
    }

    /// Returns the location at the centre of this plot.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(self) -> Location {
        Location::at(
            (self.x as f32 + 0.5) * PLOT_SIZE,
            (self.z as f32 + 0.5) * PLOT_SIZE,
        )
    }
}
