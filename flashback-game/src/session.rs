use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::event::{Event, EventError, EventId};
use crate::placement::{InsertionSlot, PlacementError, PlacementOutcome, SelectOutcome};
use crate::pool::{self, PoolDraw};
use crate::share::{self, CorruptReason, ShareError};
use crate::state::GameState;

/// User-visible situations the presentation layer should surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionNotice {
    /// Fewer events were available than requested.
    PoolExhausted { requested: usize, drawn: usize },
    /// The shared link was discarded in favour of a random sample.
    CorruptShareLink(CorruptReason),
    /// A placed event cannot be removed.
    RemovePlacedDenied(EventId),
}

impl SessionNotice {
    /// Notices that should interrupt the player rather than show passively.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Self::RemovePlacedDenied(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOrigin {
    RandomSample,
    ShareLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub placed: usize,
    pub total: usize,
    pub score: u32,
    pub max_score: u32,
}

impl Progress {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total > 0 && self.placed == self.total
    }
}

/// One player's game: the state plus the catalog, config and RNG that feed it.
#[derive(Debug, Clone)]
pub struct GameSession {
    catalog: Arc<Catalog>,
    config: GameConfig,
    seed: u64,
    rng: ChaCha20Rng,
    state: GameState,
    origin: SessionOrigin,
    notices: VecDeque<SessionNotice>,
}

impl GameSession {
    /// Start a session with a fresh random sample of `config.initial_count` events.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: GameConfig, seed: u64) -> Self {
        let mut session = Self::empty(catalog, config, seed);
        session.draw_initial();
        log::info!(
            "session {seed:#x} started with {} events",
            session.state.total_in_play()
        );
        session
    }

    /// Start from a share token, falling back to a random sample when it is corrupt.
    #[must_use]
    pub fn from_share_token(
        catalog: Arc<Catalog>,
        config: GameConfig,
        seed: u64,
        token: &str,
    ) -> Self {
        let mut session = Self::empty(catalog, config, seed);
        match share::decode(token) {
            Ok(events) => {
                log::info!(
                    "session {seed:#x} restored {} events from share link",
                    events.len()
                );
                session.state = GameState::with_events(events);
                session.origin = SessionOrigin::ShareLink;
            }
            Err(ShareError::Corrupt(reason)) => {
                log::warn!("discarding share link: {reason}");
                session.notices.push_back(SessionNotice::CorruptShareLink(reason));
                session.draw_initial();
            }
        }
        session
    }

    /// Start from a page URL. Returns the session and the URL with the share
    /// parameter stripped, so reloading does not apply the link again.
    #[must_use]
    pub fn from_url(
        catalog: Arc<Catalog>,
        config: GameConfig,
        seed: u64,
        url: &str,
    ) -> (Self, String) {
        let param = config.share_param.clone();
        match share::query_value(url, &param) {
            Some(token) => {
                let session = Self::from_share_token(catalog, config, seed, &token);
                (session, share::strip_param(url, &param))
            }
            None => (Self::new(catalog, config, seed), url.to_string()),
        }
    }

    fn empty(catalog: Arc<Catalog>, config: GameConfig, seed: u64) -> Self {
        Self {
            catalog,
            config,
            seed,
            rng: ChaCha20Rng::seed_from_u64(seed),
            state: GameState::new(),
            origin: SessionOrigin::RandomSample,
            notices: VecDeque::new(),
        }
    }

    fn draw_initial(&mut self) {
        let count = self.config.initial_count;
        self.draw_into_state(count);
    }

    fn draw_into_state(&mut self, count: usize) -> usize {
        let excluded = self.state.in_play_dates();
        let draw = pool::sample(&self.catalog, &excluded, count, &mut self.rng);
        self.note_exhaustion(&draw);
        let drawn = draw.events.len();
        self.state.extend_unplaced(draw.events);
        drawn
    }

    fn note_exhaustion(&mut self, draw: &PoolDraw) {
        if draw.is_exhausted() {
            self.notices.push_back(SessionNotice::PoolExhausted {
                requested: draw.requested,
                drawn: draw.events.len(),
            });
        }
    }

    /// Draw `config.add_more_count` more events. Returns how many were added.
    pub fn add_more(&mut self) -> usize {
        let count = self.config.add_more_count;
        self.add_more_n(count)
    }

    /// Draw up to `count` more events whose dates are not already in play.
    pub fn add_more_n(&mut self, count: usize) -> usize {
        let drawn = self.draw_into_state(count);
        log::debug!("added {drawn} events (requested {count})");
        drawn
    }

    /// Throw away every event and score, then draw a fresh initial sample.
    pub fn resample(&mut self) {
        self.state.clear();
        self.origin = SessionOrigin::RandomSample;
        self.draw_initial();
        log::info!("session resampled with {} events", self.state.total_in_play());
    }

    pub fn reset_to_unsorted(&mut self) {
        self.state.reset_to_unsorted();
    }

    /// Manually add an event, bypassing date de-duplication.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or date is invalid.
    pub fn add_event(&mut self, name: &str, date: &str) -> Result<EventId, EventError> {
        let event = Event::new(name, date)?;
        Ok(self.state.add_event(event))
    }

    /// Remove an unplaced event. Refusing a placed event also queues a blocking notice.
    ///
    /// # Errors
    ///
    /// See [`GameState::remove_event`].
    pub fn remove_event(&mut self, id: EventId) -> Result<Event, PlacementError> {
        let result = self.state.remove_event(id);
        if let Err(PlacementError::PermissionDenied(id)) = result {
            self.notices.push_back(SessionNotice::RemovePlacedDenied(id));
        }
        result
    }

    /// # Errors
    ///
    /// See [`GameState::select`].
    pub fn select(&mut self, id: EventId) -> Result<SelectOutcome, PlacementError> {
        self.state.select(id)
    }

    pub fn deselect(&mut self) {
        self.state.deselect();
    }

    #[must_use]
    pub fn insertion_slots(&self) -> Vec<InsertionSlot> {
        self.state.insertion_slots()
    }

    /// # Errors
    ///
    /// See [`GameState::commit_at`].
    pub fn commit_at(&mut self, slot_index: usize) -> Result<PlacementOutcome, PlacementError> {
        self.state.commit_at(slot_index)
    }

    /// Select `id` and commit it in one step.
    ///
    /// # Errors
    ///
    /// Fails without changing state if `id` is not unplaced.
    pub fn place(
        &mut self,
        id: EventId,
        slot_index: usize,
    ) -> Result<PlacementOutcome, PlacementError> {
        if self.state.selection().selected() != Some(id) {
            self.state.select(id)?;
        }
        self.state.commit_at(slot_index)
    }

    #[must_use]
    pub fn share_token(&self) -> String {
        share::encode(&self.state.share_events())
    }

    #[must_use]
    pub fn share_url(&self, base_url: &str) -> String {
        share::share_url(base_url, &self.config.share_param, &self.state.share_events())
    }

    /// Take every pending notice, oldest first.
    pub fn drain_notices(&mut self) -> Vec<SessionNotice> {
        self.notices.drain(..).collect()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            placed: self.state.ordered().len(),
            total: self.state.total_in_play(),
            score: self.state.current_score(),
            max_score: self.state.max_score(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Consume the session, returning the underlying game state.
    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_events(vec![
                Event::new("A", "2000-01-01").unwrap(),
                Event::new("B", "1990-01-01").unwrap(),
                Event::new("C", "2010-01-01").unwrap(),
            ])
            .unwrap(),
        )
    }

    fn config(initial: usize, more: usize) -> GameConfig {
        GameConfig {
            initial_count: initial,
            add_more_count: more,
            ..GameConfig::default()
        }
    }

    #[test]
    fn same_seed_draws_same_events() {
        let catalog = Arc::new(Catalog::load_from_static().unwrap());
        let a = GameSession::new(Arc::clone(&catalog), GameConfig::default(), 99);
        let b = GameSession::new(catalog, GameConfig::default(), 99);
        assert_eq!(a.state().share_events(), b.state().share_events());
        assert_eq!(a.state().total_in_play(), 10);
        assert_eq!(a.state().max_score(), 9);
    }

    #[test]
    fn add_more_reports_exhaustion() {
        let mut session = GameSession::new(small_catalog(), config(2, 5), 1);
        assert!(session.drain_notices().is_empty());
        assert_eq!(session.add_more(), 1);
        assert_eq!(
            session.drain_notices(),
            [SessionNotice::PoolExhausted {
                requested: 5,
                drawn: 1
            }]
        );
        assert_eq!(session.add_more(), 0);
        assert_eq!(session.progress().total, 3);
        assert_eq!(session.state().in_play_dates().len(), 3);
    }

    #[test]
    fn remove_placed_queues_blocking_notice() {
        let mut session = GameSession::new(small_catalog(), config(3, 1), 5);
        let id = session.state().unplaced()[0].id();
        session.place(id, 0).unwrap();
        assert!(session.remove_event(id).is_err());
        let notices = session.drain_notices();
        assert_eq!(notices, [SessionNotice::RemovePlacedDenied(id)]);
        assert!(notices[0].is_blocking());
    }

    #[test]
    fn corrupt_token_falls_back_to_random_sample() {
        let mut session =
            GameSession::from_share_token(small_catalog(), config(2, 1), 3, "%%broken%%");
        assert_eq!(session.origin(), SessionOrigin::RandomSample);
        assert_eq!(session.state().total_in_play(), 2);
        assert!(matches!(
            session.drain_notices().as_slice(),
            [SessionNotice::CorruptShareLink(_)]
        ));
    }

    #[test]
    fn share_token_restores_placed_then_unplaced() {
        let mut session = GameSession::new(small_catalog(), config(3, 1), 8);
        let id = session.state().unplaced()[1].id();
        session.place(id, 0).unwrap();
        let expected = session.state().share_events();
        let restored =
            GameSession::from_share_token(small_catalog(), config(3, 1), 9, &session.share_token());
        assert_eq!(restored.origin(), SessionOrigin::ShareLink);
        assert!(restored.state().ordered().is_empty());
        assert_eq!(restored.state().share_events(), expected);
    }

    #[test]
    fn empty_token_restores_empty_game() {
        let session = GameSession::from_share_token(small_catalog(), config(3, 1), 1, "EMPTY");
        assert_eq!(session.origin(), SessionOrigin::ShareLink);
        assert_eq!(session.progress().total, 0);
        assert_eq!(session.progress().max_score, 0);
    }

    #[test]
    fn from_url_strips_parameter() {
        let source = GameSession::new(small_catalog(), config(3, 1), 2);
        let url = source.share_url("https://example.org/play?lang=en");
        let (session, cleaned) = GameSession::from_url(small_catalog(), config(1, 1), 4, &url);
        assert_eq!(cleaned, "https://example.org/play?lang=en");
        assert_eq!(session.state().share_events(), source.state().share_events());

        let (plain, unchanged) =
            GameSession::from_url(small_catalog(), config(1, 1), 4, "https://example.org/");
        assert_eq!(unchanged, "https://example.org/");
        assert_eq!(plain.origin(), SessionOrigin::RandomSample);
    }

    #[test]
    fn resample_discards_progress() {
        let mut session = GameSession::new(small_catalog(), config(3, 1), 6);
        let id = session.state().unplaced()[0].id();
        session.place(id, 0).unwrap();
        session.resample();
        let progress = session.progress();
        assert_eq!(progress.placed, 0);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.score, 0);
    }

    #[test]
    fn manual_add_validates_input() {
        let mut session = GameSession::new(small_catalog(), config(1, 1), 6);
        assert!(session.add_event("", "2000-01-01").is_err());
        assert!(session.add_event("Y2K", "2000-13-01").is_err());
        let id = session.add_event("Y2K", "2000-01-01").unwrap();
        assert_eq!(session.state().get(id).unwrap().name(), "Y2K");
        assert_eq!(session.progress().total, 2);
    }
}
