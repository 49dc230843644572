//! Activity damage arithmetic.
use serde::{Deserialize, Serialize};

use crate::config::VitalityConfig;
use crate::monster::MonsterRecord;

/// How a single completion changed the monster's health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    pub base: f64,
    pub bonus: u32,
    pub total: f64,
    pub health_before: f64,
    pub health_after: f64,
}

/// Apply `base + bonus` damage.
///
/// Only the ceiling is clamped. Health may fall arbitrarily far below the
/// death threshold; the caller runs the retirement check afterwards.
pub fn apply_damage(
    monster: &mut MonsterRecord,
    base: f64,
    bonus: u32,
    cfg: &VitalityConfig,
) -> DamageBreakdown {
    let total = base + f64::from(bonus);
    let health_before = monster.health;
    monster.health = (health_before - total).min(cfg.max_health);
    DamageBreakdown {
        base,
        bonus,
        total,
        health_before,
        health_after: monster.health,
    }
}
