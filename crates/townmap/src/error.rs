//! Errors raised while editing the town map.

use thiserror::Error;

use crate::{NationId, PlotCoord, TownId};

/// Failure to apply a territory change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// The plot already belongs to a town.
    #[error("plot ({}, {}) is already claimed by {owner}", plot.x, plot.z)]
    PlotAlreadyClaimed {
        /// The contested plot.
        plot: PlotCoord,
        /// Its current owner.
        owner: TownId,
    },

    /// The plot is not claimed by the given town.
    #[error("plot ({}, {}) is not claimed by {town}", plot.x, plot.z)]
    NotClaimed {
        /// The plot that was to be released.
        plot: PlotCoord,
        /// The town that tried to release it.
        town: TownId,
    },

    /// No town with this ID exists.
    #[error("unknown town: {0}")]
    UnknownTown(TownId),

    /// No nation with this ID exists.
    #[error("unknown nation: {0:?}")]
    UnknownNation(NationId),
}
