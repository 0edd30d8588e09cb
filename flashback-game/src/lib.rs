//! Flashback Game Engine
//!
//! Platform-agnostic core logic for the Flashback chronology quiz: players
//! place historical events on a timeline one at a time and are judged on
//! each placement. This crate has no UI or platform-specific dependencies.

pub mod catalog;
pub mod config;
pub mod event;
pub mod placement;
pub mod pool;
pub mod preferences;
pub mod score;
pub mod session;
pub mod share;
pub mod state;

use std::sync::Arc;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError};
pub use config::{ConfigError, GameConfig};
pub use event::{Event, EventDate, EventError, EventId, GameEvent, PlacementState, Verdict};
pub use placement::{InsertionSlot, PlacementError, PlacementOutcome, SelectOutcome, Selection};
pub use pool::{PoolDraw, in_play_dates, sample};
pub use preferences::{MemoryPreferences, PreferenceKey, Preferences};
pub use score::ScoreTracker;
pub use session::{GameSession, Progress, SessionNotice, SessionOrigin};
pub use share::{CorruptReason, EMPTY_TOKEN, SHARE_PARAM, ShareError};
pub use state::{GameState, StateError};

/// Source of the event catalog.
/// Platform-specific implementations should provide this
pub trait CatalogSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the full event catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched or fails validation.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;
}

/// Key-value persistence for on/off preferences
pub trait PreferenceStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read a flag; `None` when it was never stored
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_flag(&self, key: PreferenceKey) -> Result<Option<bool>, Self::Error>;

    /// Persist a flag
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_flag(&self, key: PreferenceKey, value: bool) -> Result<(), Self::Error>;
}

/// Catalog bundled with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl CatalogSource for StaticCatalog {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Catalog::load_from_static()
    }
}

/// Main game engine for creating sessions
pub struct GameEngine<C, P>
where
    C: CatalogSource,
    P: PreferenceStore,
{
    catalog_source: C,
    preferences: P,
    config: GameConfig,
}

impl<C, P> GameEngine<C, P>
where
    C: CatalogSource,
    P: PreferenceStore,
{
    /// Create an engine with the default configuration
    pub fn new(catalog_source: C, preferences: P) -> Self {
        Self::with_config(catalog_source, preferences, GameConfig::load_from_static())
    }

    pub const fn with_config(catalog_source: C, preferences: P, config: GameConfig) -> Self {
        Self {
            catalog_source,
            preferences,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Load the catalog and start a session from a random sample
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded. No session exists in that case.
    pub fn create_session(&self, seed: u64) -> Result<GameSession, C::Error> {
        let catalog = self.load_catalog()?;
        Ok(GameSession::new(catalog, self.config.clone(), seed))
    }

    /// Load the catalog and start a session from a page URL that may carry a share link.
    /// Returns the session and the URL with the share parameter stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn open_url(&self, seed: u64, url: &str) -> Result<(GameSession, String), C::Error> {
        let catalog = self.load_catalog()?;
        Ok(GameSession::from_url(catalog, self.config.clone(), seed, url))
    }

    fn load_catalog(&self) -> Result<Arc<Catalog>, C::Error> {
        self.catalog_source
            .load_catalog()
            .map(Arc::new)
            .inspect_err(|e| log::error!("catalog load failed: {e}"))
    }

    /// Current preference flags
    ///
    /// # Errors
    ///
    /// Returns an error if the preference store cannot be read.
    pub fn preferences(&self) -> Result<Preferences, P::Error> {
        Preferences::load(&self.preferences)
    }

    /// Persist a preference flag
    ///
    /// # Errors
    ///
    /// Returns an error if the preference store cannot be written.
    pub fn set_preference(&self, key: PreferenceKey, value: bool) -> Result<(), P::Error> {
        self.preferences.set_flag(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("offline")]
    struct Offline;

    struct FailingSource;

    impl CatalogSource for FailingSource {
        type Error = Offline;

        fn load_catalog(&self) -> Result<Catalog, Self::Error> {
            Err(Offline)
        }
    }

    #[test]
    fn engine_creates_sessions_from_static_catalog() {
        let engine = GameEngine::new(StaticCatalog, MemoryPreferences::default());
        let session = engine.create_session(0xABCD).unwrap();
        assert_eq!(session.progress().total, engine.config().initial_count);
        assert_eq!(session.seed(), 0xABCD);
    }

    #[test]
    fn catalog_failure_yields_no_session() {
        let engine = GameEngine::new(FailingSource, MemoryPreferences::default());
        assert!(engine.create_session(1).is_err());
        assert!(engine.open_url(1, "https://example.org/").is_err());
    }

    #[test]
    fn engine_opens_share_links() {
        let engine = GameEngine::new(StaticCatalog, MemoryPreferences::default());
        let original = engine.create_session(3).unwrap();
        let url = original.share_url("https://example.org/");
        let (session, cleaned) = engine.open_url(77, &url).unwrap();
        assert_eq!(cleaned, "https://example.org/");
        assert_eq!(session.origin(), SessionOrigin::ShareLink);
        assert_eq!(session.state().share_events(), original.state().share_events());
    }

    #[test]
    fn engine_round_trips_preferences() {
        let engine = GameEngine::new(StaticCatalog, MemoryPreferences::default());
        assert!(!engine.preferences().unwrap().show_date);
        engine.set_preference(PreferenceKey::ShowDate, true).unwrap();
        assert!(engine.preferences().unwrap().show_date);
    }
}
