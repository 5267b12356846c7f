//! Error types for the enemy-presence core.
//!
//! None of these are fatal. Tracker and flight errors are logged by the
//! reconciler and the event is dropped for the affected player/town pair;
//! configuration errors are returned to the host, which decides whether to run
//! with the feature disabled.

use std::path::PathBuf;

use thiserror::Error;
use townmap::{FlightRefusal, PlayerId, TownId};

/// Invariant violations detected by the [`EnemyTracker`](crate::tracker::EnemyTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// A decrement was requested for a town that was never incremented.
    #[error("tried to decrement enemies in {0}, which has no tracked enemies")]
    UntrackedTown(TownId),
}

/// Failure reported by a [`FlightControl`](crate::collaborator::FlightControl) collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightError {
    /// The player is not connected.
    #[error("{0} is offline")]
    Offline(PlayerId),
    /// The collaborator refused the change.
    #[error("flight change refused for {player}: {reason}")]
    Refused {
        /// Affected player.
        player: PlayerId,
        /// Collaborator-supplied reason.
        reason: String,
    },
}

impl From<FlightRefusal> for FlightError {
    fn from(refusal: FlightRefusal) -> Self {
        match refusal {
            FlightRefusal::Offline(player) => Self::Offline(player),
            FlightRefusal::Rejected(player) => Self::Refused {
                player,
                reason: refusal.to_string(),
            },
        }
    }
}

/// Failure to load a [`FlightConfig`](crate::config::FlightConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config text is not valid.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
