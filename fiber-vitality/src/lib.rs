//! Fiber Friends Vitality Engine
//!
//! Platform-agnostic monster vitality logic for the Fiber Friends app.
//! Recovery, activity damage, streaks and retirement live here so every
//! feature page shares one implementation instead of repeating the arithmetic.

pub mod activity;
pub mod cache;
pub mod config;
pub mod constants;
pub mod damage;
pub mod monster;
pub mod recovery;
pub mod store;
pub mod streak;
pub mod tracker;

// Re-export commonly used types
pub use activity::{ActivityKind, UnknownActivity};
pub use cache::CachedStore;
pub use config::{ConfigError, VitalityConfig};
pub use damage::{DamageBreakdown, apply_damage};
pub use monster::{MonsterRecord, TombRecord, UserVitality, VitalityStatus};
pub use recovery::{RecoveryTick, tick_recovery};
pub use store::{MemoryStore, StoredVitality, UserEntry, VitalityStore, WriteOutcome, next_revision};
pub use streak::{StreakRecord, advance_streak, streak_bonus};
pub use tracker::{
    ActivityOutcome, RecoveryOutcome, VitalityError, VitalityResult, VitalityTracker,
    creation_notice_key,
};
