//! Monster, tomb and per-user vitality records.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::activity::ActivityKind;
use crate::config::VitalityConfig;
use crate::streak::StreakRecord;

/// The user's single active monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterRecord {
    pub name: String,
    /// Opaque URL of the generated monster image.
    pub image_ref: String,
    pub health: f64,
    /// Local calendar day of the last passive regeneration.
    pub last_recovery_date: NaiveDate,
    #[serde(default = "default_generated")]
    pub generated: bool,
    pub created_on: NaiveDate,
}

const fn default_generated() -> bool {
    true
}

impl MonsterRecord {
    /// A freshly generated monster. Creation day counts as already recovered.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        image_ref: impl Into<String>,
        health: f64,
        today: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            image_ref: image_ref.into(),
            health,
            last_recovery_date: today,
            generated: true,
            created_on: today,
        }
    }

    /// Classify the record against the alive range `(death_threshold, max_health]`.
    #[must_use]
    pub fn status(&self, cfg: &VitalityConfig) -> VitalityStatus {
        if cfg.is_alive_health(self.health) {
            VitalityStatus::Alive
        } else {
            VitalityStatus::Retiring
        }
    }

    #[must_use]
    pub fn is_at_or_below_threshold(&self, cfg: &VitalityConfig) -> bool {
        self.health <= cfg.death_threshold
    }
}

/// Lifecycle of a monster instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalityStatus {
    Alive,
    /// Health is at or below the death threshold; the next mutation retires it.
    Retiring,
    /// Archived in the tomb. Terminal for that instance.
    Retired,
}

impl VitalityStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Retiring => "retiring",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for VitalityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only archive entry for a retired monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TombRecord {
    pub name: String,
    pub image_ref: String,
    pub final_health: f64,
    pub cause: String,
    pub died_at: DateTime<Utc>,
}

impl TombRecord {
    #[must_use]
    pub fn from_monster(
        monster: &MonsterRecord,
        cause: impl Into<String>,
        died_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: monster.name.clone(),
            image_ref: monster.image_ref.clone(),
            final_health: monster.health,
            cause: cause.into(),
            died_at,
        }
    }
}

/// Everything the tracker persists for one user, written as a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserVitality {
    #[serde(default)]
    pub monster: Option<MonsterRecord>,
    #[serde(default)]
    pub streaks: BTreeMap<ActivityKind, StreakRecord>,
    /// Last day each activity category damaged the monster.
    #[serde(default)]
    pub completions: BTreeMap<ActivityKind, NaiveDate>,
}

impl UserVitality {
    #[must_use]
    pub fn completed_on(&self, kind: ActivityKind, day: NaiveDate) -> bool {
        self.completions.get(&kind) == Some(&day)
    }

    #[must_use]
    pub fn streak(&self, kind: ActivityKind) -> Option<&StreakRecord> {
        self.streaks.get(&kind)
    }
}
