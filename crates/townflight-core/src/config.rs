//! Configuration for enemy-presence flight suspension.
//!
//! The host loads a TOML document such as:
//!
//! ```toml
//! flight_disable_by = "ENEMY_PRESENCE"
//! ```
//!
//! `"NONE"` turns the feature off: the [`FlightGuard`](crate::guard::FlightGuard)
//! then never creates a tracker or reconciler. A missing key keeps the feature
//! on.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What, if anything, suspends flight inside towns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisableBy {
    /// Flight is never suspended by this system.
    None,
    /// Flight is suspended while enemies are inside the town.
    #[default]
    EnemyPresence,
}

/// Settings consumed by the flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Suspension trigger.
    pub flight_disable_by: DisableBy,
}

impl FlightConfig {
    /// Config with enemy-presence suspension switched off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            flight_disable_by: DisableBy::None,
        }
    }

    /// Returns true if enemy presence should suspend flight.
    #[must_use]
    pub const fn suspends_on_enemies(&self) -> bool {
        matches!(self.flight_disable_by, DisableBy::EnemyPresence)
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its contents are invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
