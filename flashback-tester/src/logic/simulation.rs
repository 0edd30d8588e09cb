use anyhow::Result;
use std::convert::Infallible;
use std::sync::Arc;

use flashback_game::share;
use flashback_game::{
    Catalog, CatalogSource, GameConfig, GameEngine, GameSession, MemoryPreferences, PreferenceKey,
    Preferences, Progress, SessionNotice, SessionOrigin, Verdict,
};

use super::policy::GameplayStrategy;

/// How a simulated session comes into being.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEntry {
    /// A fresh random sample.
    RandomSample,
    /// Build a session, share it, then reopen the link under a different seed.
    RoundTripLink,
    /// Open an arbitrary page URL, which may or may not carry a share token.
    Url(String),
}

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub config: GameConfig,
    pub entry: SessionEntry,
    /// Reset the timeline to unsorted once this many placements have been made.
    pub reset_after: Option<usize>,
    pub setup: Option<fn(&mut GameSession)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            config: GameConfig::default(),
            entry: SessionEntry::RandomSample,
            reset_after: None,
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_entry(mut self, entry: SessionEntry) -> Self {
        self.entry = entry;
        self
    }

    #[must_use]
    pub const fn with_reset_after(mut self, placements: usize) -> Self {
        self.reset_after = Some(placements);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut GameSession)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Everything a finished simulation reports back.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub origin: SessionOrigin,
    pub catalog_size: usize,
    pub initial_total: usize,
    pub placements: usize,
    pub corrections: usize,
    pub resets: usize,
    pub final_progress: Progress,
    pub notices: Vec<SessionNotice>,
    /// Invariant breaches observed during play, in order.
    pub violations: Vec<String>,
    pub share_round_trip: bool,
    /// Final timeline as `name (date)`, dates hidden unless `show-date` is on.
    pub timeline: Vec<String>,
}

impl SimulationSummary {
    #[must_use]
    pub fn completed(&self) -> bool {
        self.final_progress.total == 0 || self.final_progress.is_complete()
    }

    #[must_use]
    pub fn perfect(&self) -> bool {
        self.final_progress.score == self.final_progress.max_score
    }
}

/// Hands the tester's preloaded catalog to the engine.
#[derive(Debug, Clone)]
struct PreloadedCatalog(Arc<Catalog>);

impl CatalogSource for PreloadedCatalog {
    type Error = Infallible;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Ok(Catalog::clone(&self.0))
    }
}

const BASE_URL: &str = "https://flashback.example/play";

#[derive(Debug, Clone)]
pub struct GameTester {
    catalog: Arc<Catalog>,
    show_dates: bool,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(catalog: Arc<Catalog>, show_dates: bool, verbose: bool) -> Self {
        Self {
            catalog,
            show_dates,
            verbose,
        }
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    fn engine(&self, config: GameConfig) -> GameEngine<PreloadedCatalog, MemoryPreferences> {
        let preferences =
            MemoryPreferences::with_flags(&[(PreferenceKey::ShowDate, self.show_dates)]);
        GameEngine::with_config(
            PreloadedCatalog(Arc::clone(&self.catalog)),
            preferences,
            config,
        )
    }

    fn open_session(
        engine: &GameEngine<PreloadedCatalog, MemoryPreferences>,
        entry: &SessionEntry,
        seed: u64,
    ) -> Result<GameSession, Infallible> {
        match entry {
            SessionEntry::RandomSample => engine.create_session(seed),
            SessionEntry::RoundTripLink => {
                let source = engine.create_session(seed)?;
                let url = source.share_url(BASE_URL);
                engine.open_url(seed.wrapping_add(1), &url).map(|(session, _)| session)
            }
            SessionEntry::Url(url) => engine.open_url(seed, url).map(|(session, _)| session),
        }
    }

    /// Play one session to completion under `plan`, checking invariants after every step.
    #[must_use]
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let engine = self.engine(plan.config.clone());
        let preferences = engine.preferences().unwrap_or_else(|never| match never {});
        let mut session = Self::open_session(&engine, &plan.entry, seed)
            .unwrap_or_else(|never| match never {});
        if let Some(setup) = plan.setup {
            setup(&mut session);
        }

        let mut policy = plan.strategy.create_policy(seed);
        let mut run = RunLog::new(&session);
        let step_limit = run.initial_total * 2 + 2;

        for _ in 0..step_limit {
            let Some(decision) = policy.decide(session.state()) else {
                break;
            };
            let before = session.progress();
            match session.place(decision.event, decision.slot) {
                Ok(outcome) => {
                    run.placements += 1;
                    if outcome.was_corrected() {
                        run.corrections += 1;
                    }
                    if !outcome.verdict.is_judged() {
                        run.violate(format!("{} left unjudged", outcome.event));
                    }
                    if outcome.first_placement && outcome.verdict != Verdict::Correct {
                        run.violate("first placement judged incorrect".to_string());
                    }
                    check_step(&mut run, &session, before, outcome.scored, outcome.first_placement);
                }
                Err(e) => run.violate(format!("{} rejected: {e}", policy.name())),
            }

            if plan.reset_after == Some(run.placements) && run.resets == 0 {
                session.reset_to_unsorted();
                run.resets += 1;
                let progress = session.progress();
                if progress.placed != 0 || progress.score != 0 {
                    run.violate("reset left placed events or score behind".to_string());
                }
                if progress.total != before.total {
                    run.violate("reset changed the number of events".to_string());
                }
            }
        }

        if !session.state().is_chronological() {
            run.violate("final timeline is out of order".to_string());
        }

        let share_round_trip = share::decode(&session.share_token())
            .is_ok_and(|events| events == session.state().share_events());

        let summary = SimulationSummary {
            seed,
            strategy: plan.strategy,
            origin: session.origin(),
            catalog_size: self.catalog.len(),
            initial_total: run.initial_total,
            placements: run.placements,
            corrections: run.corrections,
            resets: run.resets,
            final_progress: session.progress(),
            notices: session.drain_notices(),
            violations: run.violations,
            share_round_trip,
            timeline: render_timeline(&session, &preferences),
        };

        if self.verbose {
            log::debug!(
                "seed {seed} {}: {}/{} placed, score {}/{}",
                plan.strategy,
                summary.final_progress.placed,
                summary.final_progress.total,
                summary.final_progress.score,
                summary.final_progress.max_score
            );
        }

        summary
    }
}

struct RunLog {
    initial_total: usize,
    placements: usize,
    corrections: usize,
    resets: usize,
    violations: Vec<String>,
}

impl RunLog {
    fn new(session: &GameSession) -> Self {
        Self {
            initial_total: session.progress().total,
            placements: 0,
            corrections: 0,
            resets: 0,
            violations: Vec::new(),
        }
    }

    fn violate(&mut self, message: String) {
        log::warn!("invariant violated after {} placements: {message}", self.placements);
        self.violations.push(message);
    }
}

fn check_step(
    run: &mut RunLog,
    session: &GameSession,
    before: Progress,
    scored: bool,
    first_placement: bool,
) {
    let after = session.progress();
    if !session.state().is_chronological() {
        run.violate(format!("timeline out of order after placement {}", run.placements));
    }
    if after.score > after.max_score {
        run.violate(format!("score {} exceeds max {}", after.score, after.max_score));
    }
    if after.total != before.total {
        run.violate("placing changed the number of events".to_string());
    }
    if after.placed != before.placed + 1 {
        run.violate("placement did not move exactly one event".to_string());
    }
    if first_placement && after.score != before.score {
        run.violate("first placement changed the score".to_string());
    }
    let expected = before.score + u32::from(scored);
    if after.score != expected {
        run.violate(format!("score {} expected {expected}", after.score));
    }
}

fn render_timeline(session: &GameSession, preferences: &Preferences) -> Vec<String> {
    session
        .state()
        .ordered()
        .iter()
        .map(|event| match preferences.revealed_date(event) {
            Some(date) => format!("{} ({date})", event.name()),
            None => event.name().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester(show_dates: bool) -> GameTester {
        GameTester::new(
            Arc::new(Catalog::load_from_static().unwrap()),
            show_dates,
            false,
        )
    }

    #[test]
    fn every_strategy_finishes_cleanly() {
        let tester = tester(false);
        for strategy in GameplayStrategy::ALL {
            let summary = tester.run_plan(&SimulationPlan::new(strategy), 7);
            assert!(summary.violations.is_empty(), "{strategy}: {:?}", summary.violations);
            assert!(summary.completed(), "{strategy}");
            assert!(summary.share_round_trip);
            assert_eq!(summary.placements, summary.initial_total);
        }
    }

    #[test]
    fn historian_is_perfect() {
        let summary = tester(false).run_plan(&SimulationPlan::new(GameplayStrategy::Historian), 11);
        assert!(summary.perfect());
        assert_eq!(summary.corrections, 0);
        assert_eq!(summary.final_progress.max_score, 9);
    }

    #[test]
    fn reset_replays_the_same_events() {
        let plan = SimulationPlan::new(GameplayStrategy::Historian).with_reset_after(4);
        let summary = tester(false).run_plan(&plan, 5);
        assert_eq!(summary.resets, 1);
        assert_eq!(summary.placements, summary.initial_total + 4);
        assert!(summary.perfect());
        assert!(summary.violations.is_empty());
    }

    #[test]
    fn round_trip_link_reopens_as_share_link() {
        let plan =
            SimulationPlan::new(GameplayStrategy::Appender).with_entry(SessionEntry::RoundTripLink);
        let summary = tester(false).run_plan(&plan, 21);
        assert_eq!(summary.origin, SessionOrigin::ShareLink);
        assert_eq!(summary.initial_total, 10);
    }

    #[test]
    fn timeline_reveals_dates_only_when_enabled() {
        let plan = SimulationPlan::new(GameplayStrategy::Historian);
        let hidden = tester(false).run_plan(&plan, 3);
        let shown = tester(true).run_plan(&plan, 3);
        assert!(hidden.timeline.iter().all(|line| !line.contains('(')));
        assert!(shown.timeline.iter().all(|line| line.ends_with(')')));
    }
}
