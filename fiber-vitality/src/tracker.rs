//! The vitality tracker: every feature that touches monster health goes through here.
//!
//! Each mutating operation loads the user's document once, computes the new
//! state in memory, and persists it with a single conditional write. When the
//! resulting health is at or below the death threshold, that single write is
//! the store's atomic retirement (archive insert plus active-record clear), so
//! the retirement check always runs last and exactly once per mutation.
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activity::ActivityKind;
use crate::config::{ConfigError, VitalityConfig};
use crate::constants::{
    CAUSE_FOUND_ABOVE_MAX, CAUSE_FOUND_BELOW_THRESHOLD, NOTICE_ACTIVITY_ALREADY,
    NOTICE_ACTIVITY_DAMAGE, NOTICE_MONSTER_CREATED, NOTICE_MONSTER_RETIRED,
    NOTICE_RECOVERY_ALREADY, NOTICE_RECOVERY_APPLIED,
};
use crate::damage::{DamageBreakdown, apply_damage};
use crate::monster::{MonsterRecord, TombRecord, UserVitality, VitalityStatus};
use crate::recovery::{RecoveryTick, tick_recovery};
use crate::store::{StoredVitality, VitalityStore, WriteOutcome};
use crate::streak::{StreakRecord, advance_streak, streak_bonus};

/// Failures surfaced to the calling feature.
#[derive(Debug, Error)]
pub enum VitalityError<E>
where
    E: std::error::Error + 'static,
{
    #[error("vitality store failed: {0}")]
    Store(#[source] E),
    #[error("user '{user_id}' has no active monster")]
    NoActiveMonster { user_id: String },
    #[error("user '{user_id}' already has an active monster")]
    MonsterAlreadyActive { user_id: String },
    #[error("vitality record for '{user_id}' changed concurrently; reload and retry")]
    Conflict { user_id: String },
    /// Tuning input rejected, including a non-finite caller-supplied base damage.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

pub type VitalityResult<T, E> = Result<T, VitalityError<E>>;

/// What [`VitalityTracker::apply_daily_recovery`] did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Applied { rolled: u32, gained: f64, health: f64 },
    AlreadyRecovered { health: f64 },
    Retired { tomb: TombRecord },
}

impl RecoveryOutcome {
    #[must_use]
    pub const fn notice_key(&self) -> &'static str {
        match self {
            Self::Applied { .. } => NOTICE_RECOVERY_APPLIED,
            Self::AlreadyRecovered { .. } => NOTICE_RECOVERY_ALREADY,
            Self::Retired { .. } => NOTICE_MONSTER_RETIRED,
        }
    }
}

/// What a completed activity did to the monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityOutcome {
    Damaged {
        activity: ActivityKind,
        damage: DamageBreakdown,
        streak: StreakRecord,
    },
    /// The category already damaged the monster today; nothing changed.
    AlreadyCompleted { activity: ActivityKind, health: f64 },
    /// The monster was retired. `damage` is `None` when it was already at or
    /// below the threshold before this activity and no damage was applied.
    Retired {
        activity: ActivityKind,
        damage: Option<DamageBreakdown>,
        streak: Option<StreakRecord>,
        tomb: TombRecord,
    },
}

impl ActivityOutcome {
    #[must_use]
    pub const fn notice_key(&self) -> &'static str {
        match self {
            Self::Damaged { .. } => NOTICE_ACTIVITY_DAMAGE,
            Self::AlreadyCompleted { .. } => NOTICE_ACTIVITY_ALREADY,
            Self::Retired { .. } => NOTICE_MONSTER_RETIRED,
        }
    }

    #[must_use]
    pub const fn is_retired(&self) -> bool {
        matches!(self, Self::Retired { .. })
    }

    /// Health after the activity, or `None` once the monster is gone.
    #[must_use]
    pub const fn health(&self) -> Option<f64> {
        match self {
            Self::Damaged { damage, .. } => Some(damage.health_after),
            Self::AlreadyCompleted { health, .. } => Some(*health),
            Self::Retired { .. } => None,
        }
    }
}

/// Notice key for a newly created monster.
#[must_use]
pub const fn creation_notice_key() -> &'static str {
    NOTICE_MONSTER_CREATED
}

/// Consolidated recovery, damage, streak and retirement logic over a store.
pub struct VitalityTracker<S, R = ChaCha20Rng>
where
    S: VitalityStore,
    R: Rng,
{
    store: S,
    rng: R,
    cfg: VitalityConfig,
    clock: fn() -> DateTime<Utc>,
}

impl<S: VitalityStore> VitalityTracker<S, ChaCha20Rng> {
    /// Tracker with default tuning and a deterministic recovery stream.
    pub fn seeded(store: S, seed: u64) -> Self {
        Self::new(store, ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<S, R> VitalityTracker<S, R>
where
    S: VitalityStore,
    R: Rng,
{
    /// Create a tracker with the default configuration.
    pub fn new(store: S, rng: R) -> Self {
        Self {
            store,
            rng,
            cfg: VitalityConfig::default(),
            clock: Utc::now,
        }
    }

    /// Create a tracker with custom tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration violates its invariants.
    pub fn with_config(store: S, rng: R, cfg: VitalityConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            store,
            rng,
            cfg,
            clock: Utc::now,
        })
    }

    /// Override the clock used to stamp tomb records.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn config(&self) -> &VitalityConfig {
        &self.cfg
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Generate the user's monster.
    ///
    /// A leftover record outside the alive range is retired first; a living
    /// one blocks creation.
    ///
    /// # Errors
    ///
    /// Returns [`VitalityError::MonsterAlreadyActive`] when a living monster
    /// exists, [`VitalityError::Conflict`] on a concurrent write, or a store error.
    pub fn create_monster(
        &mut self,
        user_id: &str,
        name: &str,
        image_ref: &str,
        today: NaiveDate,
    ) -> VitalityResult<MonsterRecord, S::Error> {
        let mut stored = self.store.load(user_id).map_err(VitalityError::Store)?;

        if let Some(current) = stored.as_ref()
            && let Some(monster) = current.doc.monster.clone()
        {
            let Some(cause) = self.out_of_range_cause(&monster) else {
                return Err(VitalityError::MonsterAlreadyActive {
                    user_id: user_id.to_string(),
                });
            };
            let revision = current.revision;
            let doc = current.doc.clone();
            let (revision, doc, _) = self.retire_with(user_id, doc, &monster, cause, revision)?;
            stored = Some(StoredVitality { revision, doc });
        }

        let monster = MonsterRecord::new(name, image_ref, self.cfg.starting_health, today);
        let (mut doc, expected) = match stored {
            Some(StoredVitality { revision, doc }) => (doc, Some(revision)),
            None => (UserVitality::default(), None),
        };
        doc.monster = Some(monster.clone());
        self.commit(user_id, &doc, expected)?;
        info!(
            "created monster '{}' for {user_id} at {:.1} health",
            monster.name, monster.health
        );
        Ok(monster)
    }

    /// The user's active monster, if any. Read-only: never retires.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn active_monster(&self, user_id: &str) -> VitalityResult<Option<MonsterRecord>, S::Error> {
        Ok(self
            .store
            .load(user_id)
            .map_err(VitalityError::Store)?
            .and_then(|stored| stored.doc.monster))
    }

    /// Lifecycle classification, `None` when the user never had a monster.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn status(&self, user_id: &str) -> VitalityResult<Option<VitalityStatus>, S::Error> {
        if let Some(monster) = self.active_monster(user_id)? {
            return Ok(Some(monster.status(&self.cfg)));
        }
        let tombs = self.tombs(user_id)?;
        Ok((!tombs.is_empty()).then_some(VitalityStatus::Retired))
    }

    /// Current streak for one activity category.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn streak(
        &self,
        user_id: &str,
        activity: ActivityKind,
    ) -> VitalityResult<Option<StreakRecord>, S::Error> {
        Ok(self
            .store
            .load(user_id)
            .map_err(VitalityError::Store)?
            .and_then(|stored| stored.doc.streak(activity).copied()))
    }

    /// The user's retired monsters, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn tombs(&self, user_id: &str) -> VitalityResult<Vec<TombRecord>, S::Error> {
        self.store.tombs(user_id).map_err(VitalityError::Store)
    }

    /// Apply the once-per-day passive regeneration.
    ///
    /// # Errors
    ///
    /// Returns [`VitalityError::NoActiveMonster`] when the user has no monster,
    /// [`VitalityError::Conflict`] on a concurrent write, or a store error.
    pub fn apply_daily_recovery(
        &mut self,
        user_id: &str,
        today: NaiveDate,
    ) -> VitalityResult<RecoveryOutcome, S::Error> {
        let (stored, mut monster) = self.load_active(user_id)?;

        if let Some(cause) = self.out_of_range_cause(&monster) {
            warn!(
                "monster for {user_id} found at {:.1} health; retiring before recovery",
                monster.health
            );
            let (_, _, tomb) =
                self.retire_with(user_id, stored.doc, &monster, cause, stored.revision)?;
            return Ok(RecoveryOutcome::Retired { tomb });
        }

        match tick_recovery(&mut monster, today, &self.cfg, &mut self.rng) {
            RecoveryTick::Applied {
                rolled,
                gained,
                health,
            } => {
                let mut doc = stored.doc;
                doc.monster = Some(monster);
                self.commit(user_id, &doc, Some(stored.revision))?;
                info!("recovered {gained:.1} (rolled {rolled}) for {user_id}; health {health:.1}");
                Ok(RecoveryOutcome::Applied {
                    rolled,
                    gained,
                    health,
                })
            }
            RecoveryTick::AlreadyRecovered => {
                debug!("recovery already applied for {user_id} on {today}");
                Ok(RecoveryOutcome::AlreadyRecovered {
                    health: monster.health,
                })
            }
            RecoveryTick::BelowThreshold => {
                let (_, _, tomb) = self.retire_with(
                    user_id,
                    stored.doc,
                    &monster,
                    CAUSE_FOUND_BELOW_THRESHOLD,
                    stored.revision,
                )?;
                Ok(RecoveryOutcome::Retired { tomb })
            }
        }
    }

    /// Damage the monster with the configured base damage for `activity`.
    ///
    /// # Errors
    ///
    /// See [`VitalityTracker::complete_activity_with_base`].
    pub fn complete_activity(
        &mut self,
        user_id: &str,
        activity: ActivityKind,
        today: NaiveDate,
    ) -> VitalityResult<ActivityOutcome, S::Error> {
        let base = self.cfg.base_damage(activity);
        self.complete_activity_with_base(user_id, activity, base, today)
    }

    /// Damage the monster with a caller-supplied base for `activity`.
    ///
    /// Idempotent per category and calendar day. The streak bonus uses the
    /// count after today's completion is counted.
    ///
    /// # Errors
    ///
    /// Returns [`VitalityError::InvalidConfig`] when `base` is not finite,
    /// [`VitalityError::NoActiveMonster`] when the user has no monster,
    /// [`VitalityError::Conflict`] on a concurrent write, or a store error.
    pub fn complete_activity_with_base(
        &mut self,
        user_id: &str,
        activity: ActivityKind,
        base: f64,
        today: NaiveDate,
    ) -> VitalityResult<ActivityOutcome, S::Error> {
        if !base.is_finite() {
            return Err(ConfigError::NonFiniteDamage {
                activity,
                value: base,
            }
            .into());
        }
        let (stored, mut monster) = self.load_active(user_id)?;
        let StoredVitality { revision, mut doc } = stored;

        if let Some(cause) = self.out_of_range_cause(&monster) {
            warn!(
                "monster for {user_id} found at {:.1} health; retiring instead of applying {activity}",
                monster.health
            );
            let (_, _, tomb) = self.retire_with(user_id, doc, &monster, cause, revision)?;
            return Ok(ActivityOutcome::Retired {
                activity,
                damage: None,
                streak: None,
                tomb,
            });
        }

        if doc.completed_on(activity, today) {
            debug!("{activity} already completed by {user_id} on {today}");
            return Ok(ActivityOutcome::AlreadyCompleted {
                activity,
                health: monster.health,
            });
        }

        let streak = advance_streak(doc.streak(activity).copied(), today);
        let bonus = streak_bonus(streak.count, &self.cfg);
        let damage = apply_damage(&mut monster, base, bonus, &self.cfg);
        doc.streaks.insert(activity, streak);
        doc.completions.insert(activity, today);

        if monster.is_at_or_below_threshold(&self.cfg) {
            let cause = format!(
                "{activity} dealt {:.1} damage (base {:.1}, streak bonus {bonus})",
                damage.total, damage.base
            );
            let (_, _, tomb) = self.retire_with(user_id, doc, &monster, &cause, revision)?;
            return Ok(ActivityOutcome::Retired {
                activity,
                damage: Some(damage),
                streak: Some(streak),
                tomb,
            });
        }

        doc.monster = Some(monster);
        self.commit(user_id, &doc, Some(revision))?;
        info!(
            "{activity} by {user_id}: {:.1} damage (bonus {bonus}, streak {}); health {:.1}",
            damage.total, streak.count, damage.health_after
        );
        Ok(ActivityOutcome::Damaged {
            activity,
            damage,
            streak,
        })
    }

    /// Retire the active monster regardless of its health.
    ///
    /// # Errors
    ///
    /// Returns [`VitalityError::NoActiveMonster`] when the user has no monster,
    /// [`VitalityError::Conflict`] on a concurrent write, or a store error.
    pub fn retire_monster(
        &mut self,
        user_id: &str,
        cause: &str,
    ) -> VitalityResult<TombRecord, S::Error> {
        let (stored, monster) = self.load_active(user_id)?;
        let (_, _, tomb) = self.retire_with(user_id, stored.doc, &monster, cause, stored.revision)?;
        Ok(tomb)
    }

    fn load_active(
        &self,
        user_id: &str,
    ) -> VitalityResult<(StoredVitality, MonsterRecord), S::Error> {
        let stored = self.store.load(user_id).map_err(VitalityError::Store)?;
        match stored {
            Some(stored) => match stored.doc.monster.clone() {
                Some(monster) => Ok((stored, monster)),
                None => Err(VitalityError::NoActiveMonster {
                    user_id: user_id.to_string(),
                }),
            },
            None => Err(VitalityError::NoActiveMonster {
                user_id: user_id.to_string(),
            }),
        }
    }

    /// Retirement cause for a record observed outside `(death_threshold, max_health]`.
    fn out_of_range_cause(&self, monster: &MonsterRecord) -> Option<&'static str> {
        if self.cfg.is_alive_health(monster.health) {
            None
        } else if monster.health > self.cfg.max_health {
            Some(CAUSE_FOUND_ABOVE_MAX)
        } else {
            Some(CAUSE_FOUND_BELOW_THRESHOLD)
        }
    }

    fn commit(
        &self,
        user_id: &str,
        doc: &UserVitality,
        expected: Option<u64>,
    ) -> VitalityResult<u64, S::Error> {
        match self
            .store
            .save(user_id, doc, expected)
            .map_err(VitalityError::Store)?
        {
            WriteOutcome::Committed { revision } => Ok(revision),
            WriteOutcome::Conflict { current } => {
                warn!("conflicting write for {user_id}: expected {expected:?}, found {current:?}");
                Err(VitalityError::Conflict {
                    user_id: user_id.to_string(),
                })
            }
        }
    }

    fn retire_with(
        &self,
        user_id: &str,
        mut doc: UserVitality,
        monster: &MonsterRecord,
        cause: &str,
        expected: u64,
    ) -> VitalityResult<(u64, UserVitality, TombRecord), S::Error> {
        let tomb = TombRecord::from_monster(monster, cause, (self.clock)());
        doc.monster = None;
        match self
            .store
            .retire(user_id, &doc, &tomb, expected)
            .map_err(VitalityError::Store)?
        {
            WriteOutcome::Committed { revision } => {
                info!(
                    "retired monster '{}' for {user_id} at {:.1} health: {cause}",
                    tomb.name, tomb.final_health
                );
                Ok((revision, doc, tomb))
            }
            WriteOutcome::Conflict { current } => {
                warn!(
                    "conflicting retirement for {user_id}: expected {expected}, found {current:?}"
                );
                Err(VitalityError::Conflict {
                    user_id: user_id.to_string(),
                })
            }
        }
    }
}
