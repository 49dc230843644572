//! Built-in verification scenarios run against an in-memory store.
use anyhow::{Context, Result, bail, ensure};
use chrono::NaiveDate;
use colored::Colorize;
use fiber_vitality::{
    ActivityKind, ActivityOutcome, MemoryStore, RecoveryOutcome, StreakRecord, VitalityTracker,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const USER: &str = "scenario-user";

type ScenarioFn = fn(u64) -> Result<()>;

pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "recovery-idempotence",
        description: "Daily recovery lands once, within range, clamped to max health",
        run: recovery_idempotence,
    },
    Scenario {
        name: "activity-idempotence",
        description: "The same activity category damages at most once per day",
        run: activity_idempotence,
    },
    Scenario {
        name: "streak-bonus",
        description: "Three consecutive days earn a bonus; a missed day resets the streak",
        run: streak_bonus,
    },
    Scenario {
        name: "retirement-walkthrough",
        description: "5 -> -5 -> -28 -> -53 retires the monster into exactly one tomb",
        run: retirement_walkthrough,
    },
    Scenario {
        name: "fresh-after-retirement",
        description: "A retired monster can be replaced by a fresh one at full health",
        run: fresh_after_retirement,
    },
];

#[must_use]
pub fn find_scenario(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

pub struct ScenarioRunner {
    verbose: bool,
}

impl ScenarioRunner {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run(&self, scenario: &Scenario, seed: u64, iterations: usize) -> ScenarioResult {
        if self.verbose {
            println!(
                "🧪 Testing scenario: {} (seed: {seed})",
                scenario.name.bright_white()
            );
        }

        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let start_time = Instant::now();
            match (scenario.run)(iteration_seed) {
                Ok(()) => successes += 1,
                Err(err) => failures.push(format!(
                    "Iteration {} (seed {iteration_seed}): {err:#}",
                    i + 1
                )),
            }
            performance_data.push(start_time.elapsed());
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
        }
    }
}

fn day(offset: i64) -> Result<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).context("base date")?;
    base.checked_add_signed(chrono::Duration::days(offset))
        .context("date overflow")
}

fn fresh_tracker(seed: u64) -> Result<VitalityTracker<MemoryStore>> {
    let mut tracker = VitalityTracker::seeded(MemoryStore::new(), seed);
    tracker.create_monster(USER, "Scenario", "img://scenario", day(0)?)?;
    Ok(tracker)
}

fn force_health(tracker: &VitalityTracker<MemoryStore>, health: f64) -> Result<()> {
    let mut entry = tracker.store().entry(USER).context("scenario user missing")?;
    let monster = entry.doc.monster.as_mut().context("monster missing")?;
    monster.health = health;
    tracker.store().put_entry(USER, entry);
    Ok(())
}

fn recovery_idempotence(seed: u64) -> Result<()> {
    let mut tracker = fresh_tracker(seed)?;
    force_health(&tracker, 40.0)?;

    let RecoveryOutcome::Applied { rolled, health, .. } =
        tracker.apply_daily_recovery(USER, day(1)?)?
    else {
        bail!("recovery did not apply on a new day");
    };
    ensure!((10..=20).contains(&rolled), "rolled {rolled} outside 10..=20");
    ensure!(
        (health - 40.0 - f64::from(rolled)).abs() < 1e-9,
        "health {health} != 40 + {rolled}"
    );

    let repeat = tracker.apply_daily_recovery(USER, day(1)?)?;
    ensure!(
        repeat == RecoveryOutcome::AlreadyRecovered { health },
        "second recovery changed state: {repeat:?}"
    );

    force_health(&tracker, 95.0)?;
    let outcome = tracker.apply_daily_recovery(USER, day(2)?)?;
    ensure!(
        matches!(outcome, RecoveryOutcome::Applied { health, .. } if (health - 100.0).abs() < 1e-9),
        "recovery exceeded max health: {outcome:?}"
    );
    Ok(())
}

fn activity_idempotence(seed: u64) -> Result<()> {
    let mut tracker = fresh_tracker(seed)?;
    let first = tracker.complete_activity_with_base(USER, ActivityKind::FoodGrade, 2.0, day(0)?)?;
    ensure!(first.health() == Some(98.0), "unexpected health {first:?}");
    let second = tracker.complete_activity_with_base(USER, ActivityKind::FoodGrade, 2.0, day(0)?)?;
    ensure!(
        matches!(second, ActivityOutcome::AlreadyCompleted { health, .. } if (health - 98.0).abs() < 1e-9),
        "second completion applied damage: {second:?}"
    );
    Ok(())
}

fn streak_bonus(seed: u64) -> Result<()> {
    let mut tracker = fresh_tracker(seed)?;
    let mut last = None;
    for offset in 0..3 {
        last = Some(tracker.complete_activity_with_base(
            USER,
            ActivityKind::KindnessTask,
            0.0,
            day(offset)?,
        )?);
    }
    let Some(ActivityOutcome::Damaged { streak, damage, .. }) = last else {
        bail!("streak run ended unexpectedly: {last:?}");
    };
    ensure!(streak.count == 3, "count {} after three days", streak.count);
    ensure!(damage.bonus == 1, "bonus {} after three days", damage.bonus);

    let after_gap =
        tracker.complete_activity_with_base(USER, ActivityKind::KindnessTask, 0.0, day(4)?)?;
    let ActivityOutcome::Damaged { streak, .. } = after_gap else {
        bail!("gap completion did not land: {after_gap:?}");
    };
    ensure!(
        streak == StreakRecord::start(day(4)?),
        "streak not reset after gap: {streak:?}"
    );
    Ok(())
}

fn retirement_walkthrough(seed: u64) -> Result<()> {
    let mut tracker = fresh_tracker(seed)?;
    force_health(&tracker, 5.0)?;
    let mut entry = tracker.store().entry(USER).context("scenario user missing")?;
    entry.doc.streaks.insert(
        ActivityKind::ThoughtReframe,
        StreakRecord {
            count: 5,
            date: day(9)?,
        },
    );
    entry.doc.streaks.insert(
        ActivityKind::RiddleSolved,
        StreakRecord {
            count: 8,
            date: day(9)?,
        },
    );
    tracker.store().put_entry(USER, entry);

    let today = day(10)?;
    let first = tracker.complete_activity_with_base(USER, ActivityKind::ThoughtReframe, 8.0, today)?;
    ensure!(first.health() == Some(-5.0), "expected -5, got {first:?}");
    let second = tracker.complete_activity_with_base(USER, ActivityKind::RiddleSolved, 20.0, today)?;
    ensure!(second.health() == Some(-28.0), "expected -28, got {second:?}");
    let third = tracker.complete_activity_with_base(USER, ActivityKind::DietPlan, 25.0, today)?;
    ensure!(third.is_retired(), "expected retirement, got {third:?}");

    ensure!(
        tracker.active_monster(USER)?.is_none(),
        "active monster survived retirement"
    );
    let tombs = tracker.tombs(USER)?;
    ensure!(tombs.len() == 1, "expected one tomb, found {}", tombs.len());
    Ok(())
}

fn fresh_after_retirement(seed: u64) -> Result<()> {
    let mut tracker = fresh_tracker(seed)?;
    tracker.retire_monster(USER, "scenario reset")?;
    ensure!(tracker.active_monster(USER)?.is_none(), "monster not cleared");
    let fresh = tracker.create_monster(USER, "Second", "img://second", day(1)?)?;
    ensure!(
        (fresh.health - 100.0).abs() < 1e-9,
        "fresh monster at {}",
        fresh.health
    );
    ensure!(tracker.tombs(USER)?.len() == 1, "tomb archive changed");
    Ok(())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
