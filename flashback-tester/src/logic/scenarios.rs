use anyhow::{bail, ensure};
use flashback_game::{GameConfig, GameSession, SessionNotice, SessionOrigin};

use super::policy::GameplayStrategy;
use super::simulation::{SessionEntry, SimulationPlan, SimulationSummary};

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    fn new(name: &str, description: &str, plan: SimulationPlan) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            plan,
        }
    }
}

const SCENARIOS: &[(&str, &str)] = &[
    ("smoke", "Random guesses on a fresh sample finish in order"),
    ("perfect-score", "Correct play earns exactly the maximum score"),
    ("convergence", "Always inserting at the front still ends sorted"),
    ("add-more", "Drawing more events mid-game keeps dates unique"),
    ("share-roundtrip", "A shared link reopens the same events unplaced"),
    ("corrupt-link", "A damaged link falls back to a random sample"),
    ("pool-exhaustion", "Asking for more events than exist reports a shortfall"),
    ("reset", "Resetting to unsorted zeroes the score and replays"),
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.to_vec()
}

/// Every scenario name, in listing order.
#[must_use]
pub fn all_scenario_names() -> Vec<String> {
    SCENARIOS.iter().map(|(name, _)| (*name).to_string()).collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let (key, description) = SCENARIOS.iter().find(|(key, _)| *key == name)?;
    let plan = match *key {
        "smoke" => smoke(),
        "perfect-score" => perfect_score(),
        "convergence" => convergence(),
        "add-more" => add_more(),
        "share-roundtrip" => share_roundtrip(),
        "corrupt-link" => corrupt_link(),
        "pool-exhaustion" => pool_exhaustion(),
        "reset" => reset(),
        _ => return None,
    };
    Some(TestScenario::new(key, description, plan))
}

fn clean_run(summary: &SimulationSummary) -> anyhow::Result<()> {
    if let Some(first) = summary.violations.first() {
        bail!("{} invariant violations, first: {first}", summary.violations.len());
    }
    ensure!(summary.completed(), "game did not finish");
    ensure!(summary.share_round_trip, "share token did not round-trip");
    Ok(())
}

fn smoke() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Guesser)
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.initial_total == summary.final_progress.total,
                "expected {} events, found {}",
                summary.initial_total,
                summary.final_progress.total
            );
            Ok(())
        })
}

fn perfect_score() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Historian)
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.perfect(),
                "score {} of {}",
                summary.final_progress.score,
                summary.final_progress.max_score
            );
            ensure!(summary.corrections == 0, "{} corrections", summary.corrections);
            Ok(())
        })
}

fn convergence() -> SimulationPlan {
    let config = GameConfig {
        initial_count: 20,
        ..GameConfig::default()
    };
    SimulationPlan::new(GameplayStrategy::Contrarian)
        .with_config(config)
        .with_expectation(clean_run)
}

fn add_more() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Appender)
        .with_setup(|session: &mut GameSession| {
            session.add_more();
            session.add_more();
        })
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            let config = GameConfig::default();
            let expected = config.initial_count + 2 * config.add_more_count;
            ensure!(
                summary.initial_total == expected,
                "expected {expected} events after drawing more, found {}",
                summary.initial_total
            );
            Ok(())
        })
}

fn share_roundtrip() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Historian)
        .with_entry(SessionEntry::RoundTripLink)
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.origin == SessionOrigin::ShareLink,
                "session came from {:?}",
                summary.origin
            );
            ensure!(summary.notices.is_empty(), "unexpected notices {:?}", summary.notices);
            Ok(())
        })
}

fn corrupt_link() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Guesser)
        .with_entry(SessionEntry::Url(
            "https://flashback.example/play?events=N4Ig%%broken".to_string(),
        ))
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.origin == SessionOrigin::RandomSample,
                "corrupt link was accepted"
            );
            ensure!(
                summary
                    .notices
                    .iter()
                    .any(|notice| matches!(notice, SessionNotice::CorruptShareLink(_))),
                "no corrupt-link notice was raised"
            );
            Ok(())
        })
}

fn pool_exhaustion() -> SimulationPlan {
    let config = GameConfig {
        initial_count: 1000,
        ..GameConfig::default()
    };
    SimulationPlan::new(GameplayStrategy::Historian)
        .with_config(config)
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.initial_total == summary.catalog_size,
                "drew {} of {} catalog events",
                summary.initial_total,
                summary.catalog_size
            );
            ensure!(
                summary
                    .notices
                    .iter()
                    .any(|notice| matches!(notice, SessionNotice::PoolExhausted { .. })),
                "no pool-exhaustion notice was raised"
            );
            Ok(())
        })
}

fn reset() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Historian)
        .with_reset_after(5)
        .with_expectation(clean_run)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(summary.resets == 1, "expected one reset, saw {}", summary.resets);
            ensure!(
                summary.placements == summary.initial_total + 5,
                "expected {} placements, saw {}",
                summary.initial_total + 5,
                summary.placements
            );
            ensure!(summary.perfect(), "score did not recover after reset");
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for name in all_scenario_names() {
            let scenario = get_scenario(&name).unwrap();
            assert_eq!(scenario.name, name);
            assert!(!scenario.plan.expectations.is_empty());
        }
        assert!(get_scenario("does-not-exist").is_none());
    }
}
