//! Persisted on/off preferences.
//!
//! The engine itself only consults [`PreferenceKey::ShowDate`]; the other
//! keys belong to the presentation layer and are listed so every frontend
//! stores them under the same names.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

use crate::PreferenceStore;
use crate::event::{GameEvent, PlacementState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreferenceKey {
    Theme,
    EditMode,
    DebugMode,
    ShowDate,
}

impl PreferenceKey {
    pub const ALL: [Self; 4] = [Self::Theme, Self::EditMode, Self::DebugMode, Self::ShowDate];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::EditMode => "edit-mode",
            Self::DebugMode => "debug-mode",
            Self::ShowDate => "show-date",
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of every flag, missing keys read as off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Preferences {
    pub dark_theme: bool,
    pub edit_mode: bool,
    pub debug_mode: bool,
    pub show_date: bool,
}

impl Preferences {
    /// Read all flags from a store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if any read fails.
    pub fn load<S: PreferenceStore>(store: &S) -> Result<Self, S::Error> {
        let flag = |key| store.get_flag(key).map(|v| v.unwrap_or(false));
        Ok(Self {
            dark_theme: flag(PreferenceKey::Theme)?,
            edit_mode: flag(PreferenceKey::EditMode)?,
            debug_mode: flag(PreferenceKey::DebugMode)?,
            show_date: flag(PreferenceKey::ShowDate)?,
        })
    }

    #[must_use]
    pub const fn get(&self, key: PreferenceKey) -> bool {
        match key {
            PreferenceKey::Theme => self.dark_theme,
            PreferenceKey::EditMode => self.edit_mode,
            PreferenceKey::DebugMode => self.debug_mode,
            PreferenceKey::ShowDate => self.show_date,
        }
    }

    /// Date to display for an event: only placed events, and only with `show-date` on.
    #[must_use]
    pub fn revealed_date<'a>(&self, event: &'a GameEvent) -> Option<&'a str> {
        (self.show_date && event.placement() == PlacementState::Placed)
            .then(|| event.date().as_str())
    }
}

/// In-memory store, useful for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    flags: RefCell<HashMap<PreferenceKey, bool>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn with_flags(flags: &[(PreferenceKey, bool)]) -> Self {
        Self {
            flags: RefCell::new(flags.iter().copied().collect()),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    type Error = Infallible;

    fn get_flag(&self, key: PreferenceKey) -> Result<Option<bool>, Self::Error> {
        Ok(self.flags.borrow().get(&key).copied())
    }

    fn set_flag(&self, key: PreferenceKey, value: bool) -> Result<(), Self::Error> {
        self.flags.borrow_mut().insert(key, value);
        Ok(())
    }
}
