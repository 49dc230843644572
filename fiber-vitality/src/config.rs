//! Tunable vitality configuration.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::activity::ActivityKind;
use crate::constants::{
    DEATH_THRESHOLD, MAX_HEALTH, RECOVERY_MAX, RECOVERY_MIN, STARTING_HEALTH, STREAK_BONUS_CAP,
    STREAK_BONUS_DIVISOR,
};

/// Errors raised when vitality configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("config could not be parsed: {0}")]
    Parse(String),
    #[error("{field} must be finite (got {value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("death threshold {threshold:.2} must be below max health {max:.2}")]
    ThresholdAboveMax { threshold: f64, max: f64 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("recovery minimum {min} exceeds maximum {max}")]
    RecoveryMinExceedsMax { min: u32, max: u32 },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u32,
        value: u32,
    },
    #[error("base damage for {activity} must be finite (got {value})")]
    NonFiniteDamage { activity: ActivityKind, value: f64 },
}

/// Health bounds, recovery range, streak bonus tuning and per-activity damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalityConfig {
    #[serde(default = "VitalityConfig::default_max_health")]
    pub max_health: f64,
    #[serde(default = "VitalityConfig::default_death_threshold")]
    pub death_threshold: f64,
    #[serde(default = "VitalityConfig::default_starting_health")]
    pub starting_health: f64,
    /// Inclusive lower bound of the daily passive regeneration.
    #[serde(default = "VitalityConfig::default_recovery_min")]
    pub recovery_min: u32,
    /// Inclusive upper bound of the daily passive regeneration.
    #[serde(default = "VitalityConfig::default_recovery_max")]
    pub recovery_max: u32,
    #[serde(default = "VitalityConfig::default_streak_bonus_divisor")]
    pub streak_bonus_divisor: u32,
    #[serde(default = "VitalityConfig::default_streak_bonus_cap")]
    pub streak_bonus_cap: u32,
    /// Overrides for [`ActivityKind::default_base_damage`].
    #[serde(default)]
    pub base_damage: BTreeMap<ActivityKind, f64>,
}

impl VitalityConfig {
    const fn default_max_health() -> f64 {
        MAX_HEALTH
    }

    const fn default_death_threshold() -> f64 {
        DEATH_THRESHOLD
    }

    const fn default_starting_health() -> f64 {
        STARTING_HEALTH
    }

    const fn default_recovery_min() -> u32 {
        RECOVERY_MIN
    }

    const fn default_recovery_max() -> u32 {
        RECOVERY_MAX
    }

    const fn default_streak_bonus_divisor() -> u32 {
        STREAK_BONUS_DIVISOR
    }

    const fn default_streak_bonus_cap() -> u32 {
        STREAK_BONUS_CAP
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// invariant violation reported by [`VitalityConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_health", self.max_health),
            ("death_threshold", self.death_threshold),
            ("starting_health", self.starting_health),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        if self.death_threshold >= self.max_health {
            return Err(ConfigError::ThresholdAboveMax {
                threshold: self.death_threshold,
                max: self.max_health,
            });
        }
        if self.starting_health <= self.death_threshold || self.starting_health > self.max_health {
            return Err(ConfigError::RangeViolation {
                field: "starting_health",
                min: self.death_threshold,
                max: self.max_health,
                value: self.starting_health,
            });
        }
        if self.recovery_min > self.recovery_max {
            return Err(ConfigError::RecoveryMinExceedsMax {
                min: self.recovery_min,
                max: self.recovery_max,
            });
        }
        if self.streak_bonus_divisor == 0 {
            return Err(ConfigError::MinViolation {
                field: "streak_bonus_divisor",
                min: 1,
                value: 0,
            });
        }
        if let Some((&activity, &value)) = self.base_damage.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFiniteDamage { activity, value });
        }
        Ok(())
    }

    /// Base damage applied when `kind` is completed.
    #[must_use]
    pub fn base_damage(&self, kind: ActivityKind) -> f64 {
        self.base_damage
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_base_damage())
    }

    /// Whether `health` lies in the alive range `(death_threshold, max_health]`.
    #[must_use]
    pub fn is_alive_health(&self, health: f64) -> bool {
        health > self.death_threshold && health <= self.max_health
    }
}

impl Default for VitalityConfig {
    fn default() -> Self {
        Self {
            max_health: Self::default_max_health(),
            death_threshold: Self::default_death_threshold(),
            starting_health: Self::default_starting_health(),
            recovery_min: Self::default_recovery_min(),
            recovery_max: Self::default_recovery_max(),
            streak_bonus_divisor: Self::default_streak_bonus_divisor(),
            streak_bonus_cap: Self::default_streak_bonus_cap(),
            base_damage: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = VitalityConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.max_health - 100.0).abs() < f64::EPSILON);
        assert!((cfg.death_threshold + 50.0).abs() < f64::EPSILON);
        assert_eq!((cfg.recovery_min, cfg.recovery_max), (10, 20));
        assert_eq!((cfg.streak_bonus_divisor, cfg.streak_bonus_cap), (3, 3));
    }

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = VitalityConfig::from_json("{}").unwrap();
        assert_eq!(cfg, VitalityConfig::default());
    }

    #[test]
    fn base_damage_overrides_take_precedence() {
        let cfg = VitalityConfig::from_json(r#"{"base_damage": {"food-grade": 4.5}}"#).unwrap();
        assert!((cfg.base_damage(ActivityKind::FoodGrade) - 4.5).abs() < f64::EPSILON);
        assert!(
            (cfg.base_damage(ActivityKind::RiddleSolved)
                - ActivityKind::RiddleSolved.default_base_damage())
            .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let cfg = VitalityConfig {
            death_threshold: 120.0,
            ..VitalityConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ThresholdAboveMax { .. })
        ));

        let cfg = VitalityConfig {
            recovery_min: 30,
            ..VitalityConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::RecoveryMinExceedsMax { min: 30, max: 20 })
        );

        let cfg = VitalityConfig {
            streak_bonus_divisor: 0,
            ..VitalityConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::MinViolation { .. })));
    }

    #[test]
    fn validate_rejects_starting_health_outside_alive_range() {
        let cfg = VitalityConfig {
            starting_health: -50.0,
            ..VitalityConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation {
                field: "starting_health",
                ..
            })
        ));
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        assert!(matches!(
            VitalityConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn alive_range_is_half_open() {
        let cfg = VitalityConfig::default();
        assert!(cfg.is_alive_health(100.0));
        assert!(cfg.is_alive_health(-49.5));
        assert!(!cfg.is_alive_health(-50.0));
        assert!(!cfg.is_alive_health(100.5));
    }
}
