//! Session tuning
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::share::SHARE_PARAM;

const DEFAULT_CONFIG_DATA: &str = include_str!("../assets/config.json");

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("initial_count must be at least 1")]
    NoInitialEvents,
    #[error("share_param must not be empty")]
    EmptyShareParam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Events drawn when a session starts without a share link.
    #[serde(default = "GameConfig::default_initial_count")]
    pub initial_count: usize,
    /// Events drawn by a single "add more" request.
    #[serde(default = "GameConfig::default_add_more_count")]
    pub add_more_count: usize,
    #[serde(default = "GameConfig::default_share_param")]
    pub share_param: String,
}

impl GameConfig {
    const fn default_initial_count() -> usize {
        10
    }

    const fn default_add_more_count() -> usize {
        5
    }

    fn default_share_param() -> String {
        SHARE_PARAM.to_string()
    }

    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_CONFIG_DATA).unwrap_or_default()
    }

    /// Load from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_count == 0 {
            return Err(ConfigError::NoInitialEvents);
        }
        if self.share_param.trim().is_empty() {
            return Err(ConfigError::EmptyShareParam);
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_count: Self::default_initial_count(),
            add_more_count: Self::default_add_more_count(),
            share_param: Self::default_share_param(),
        }
    }
}
