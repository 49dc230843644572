//! Centralized balance constants for monster vitality.
//!
//! These are the defaults behind [`crate::config::VitalityConfig`]. Deployments
//! may override them through configuration, but the numbers below are the
//! tuning the app ships with.

// Notice keys ---------------------------------------------------------------
pub(crate) const NOTICE_MONSTER_CREATED: &str = "notice.monster.created";
pub(crate) const NOTICE_RECOVERY_APPLIED: &str = "notice.recovery.applied";
pub(crate) const NOTICE_RECOVERY_ALREADY: &str = "notice.recovery.already";
pub(crate) const NOTICE_ACTIVITY_DAMAGE: &str = "notice.activity.damage";
pub(crate) const NOTICE_ACTIVITY_ALREADY: &str = "notice.activity.already";
pub(crate) const NOTICE_MONSTER_RETIRED: &str = "notice.monster.retired";

// Health bounds -------------------------------------------------------------
pub(crate) const MAX_HEALTH: f64 = 100.0;
pub(crate) const DEATH_THRESHOLD: f64 = -50.0;
pub(crate) const STARTING_HEALTH: f64 = MAX_HEALTH;

// Recovery ------------------------------------------------------------------
pub(crate) const RECOVERY_MIN: u32 = 10;
pub(crate) const RECOVERY_MAX: u32 = 20;

// Streaks -------------------------------------------------------------------
pub(crate) const STREAK_BONUS_DIVISOR: u32 = 3;
pub(crate) const STREAK_BONUS_CAP: u32 = 3;

// Base damage per activity ----------------------------------------------------
pub(crate) const DAMAGE_FOOD_GRADE: f64 = 2.0;
pub(crate) const DAMAGE_EXERCISE_GRADE: f64 = 5.0;
pub(crate) const DAMAGE_KINDNESS_TASK: f64 = 8.0;
pub(crate) const DAMAGE_THOUGHT_REFRAME: f64 = 8.0;
pub(crate) const DAMAGE_RIDDLE_SOLVED: f64 = 10.0;
pub(crate) const DAMAGE_SYMPTOM_LOG: f64 = 1.0;
pub(crate) const DAMAGE_PRODUCT_REVIEW: f64 = 2.0;
pub(crate) const DAMAGE_DIET_PLAN: f64 = 5.0;

// Retirement causes -----------------------------------------------------------
pub(crate) const CAUSE_FOUND_BELOW_THRESHOLD: &str =
    "health was already at or below the death threshold";
pub(crate) const CAUSE_FOUND_ABOVE_MAX: &str = "health was found above the maximum";
