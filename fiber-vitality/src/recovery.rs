//! Passive once-per-day regeneration.
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::VitalityConfig;
use crate::monster::MonsterRecord;

/// Result of ticking recovery on an in-memory record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryTick {
    Applied {
        /// Amount drawn from the recovery range.
        rolled: u32,
        /// Health actually gained after clamping to the ceiling.
        gained: f64,
        health: f64,
    },
    AlreadyRecovered,
    /// Health is at or below the death threshold; nothing regenerates.
    BelowThreshold,
}

/// Regenerate `monster` for `today` unless it already did.
///
/// The RNG is only consulted when regeneration actually happens, so a
/// same-day repeat never advances the random stream.
pub fn tick_recovery<R: Rng + ?Sized>(
    monster: &mut MonsterRecord,
    today: NaiveDate,
    cfg: &VitalityConfig,
    rng: &mut R,
) -> RecoveryTick {
    if monster.last_recovery_date == today {
        return RecoveryTick::AlreadyRecovered;
    }
    if monster.is_at_or_below_threshold(cfg) {
        return RecoveryTick::BelowThreshold;
    }

    let rolled = rng.gen_range(cfg.recovery_min..=cfg.recovery_max);
    let before = monster.health;
    monster.health = (before + f64::from(rolled)).min(cfg.max_health);
    monster.last_recovery_date = today;

    RecoveryTick::Applied {
        rolled,
        gained: monster.health - before,
        health: monster.health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn monster(health: f64) -> MonsterRecord {
        MonsterRecord::new("Gloop", "img", health, day("2024-05-01"))
    }

    #[test]
    fn recovery_adds_amount_in_range() {
        let cfg = VitalityConfig::default();
        for seed in 0..64 {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let mut record = monster(10.0);
            let tick = tick_recovery(&mut record, day("2024-05-02"), &cfg, &mut rng);
            let RecoveryTick::Applied {
                rolled,
                gained,
                health,
            } = tick
            else {
                panic!("expected recovery, got {tick:?}");
            };
            assert!((10..=20).contains(&rolled));
            assert!((gained - f64::from(rolled)).abs() < f64::EPSILON);
            assert!((health - 10.0 - f64::from(rolled)).abs() < f64::EPSILON);
            assert_eq!(record.last_recovery_date, day("2024-05-02"));
        }
    }

    #[test]
    fn recovery_clamps_to_max_health() {
        let cfg = VitalityConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut record = monster(95.0);
        let tick = tick_recovery(&mut record, day("2024-05-02"), &cfg, &mut rng);
        assert!(matches!(tick, RecoveryTick::Applied { gained, .. } if (gained - 5.0).abs() < f64::EPSILON));
        assert!((record.health - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn second_same_day_tick_is_noop() {
        let cfg = VitalityConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut record = monster(0.0);
        let _ = tick_recovery(&mut record, day("2024-05-02"), &cfg, &mut rng);
        let after_first = record.clone();
        let tick = tick_recovery(&mut record, day("2024-05-02"), &cfg, &mut rng);
        assert_eq!(tick, RecoveryTick::AlreadyRecovered);
        assert_eq!(record, after_first);
    }

    #[test]
    fn below_threshold_does_not_regenerate() {
        let cfg = VitalityConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut record = monster(-60.0);
        let tick = tick_recovery(&mut record, day("2024-05-02"), &cfg, &mut rng);
        assert_eq!(tick, RecoveryTick::BelowThreshold);
        assert!((record.health + 60.0).abs() < f64::EPSILON);
        assert_eq!(record.last_recovery_date, day("2024-05-01"));
    }
}
