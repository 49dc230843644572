//! Per-category consecutive-day streaks and the damage bonus they grant.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::VitalityConfig;

/// Consecutive qualifying days for one activity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub count: u32,
    /// Last day counted.
    pub date: NaiveDate,
}

impl StreakRecord {
    #[must_use]
    pub const fn start(today: NaiveDate) -> Self {
        Self {
            count: 1,
            date: today,
        }
    }

    /// Count `today` against the streak.
    ///
    /// The day after `date` extends the streak, `date` itself is already
    /// counted, and anything else (a gap, or a date ahead of `today`) starts over.
    #[must_use]
    pub fn advance(self, today: NaiveDate) -> Self {
        if self.date == today {
            self
        } else if self.date.succ_opt() == Some(today) {
            Self {
                count: self.count.saturating_add(1),
                date: today,
            }
        } else {
            Self::start(today)
        }
    }
}

/// Advance an optional streak; `None` means the category was never logged.
#[must_use]
pub fn advance_streak(existing: Option<StreakRecord>, today: NaiveDate) -> StreakRecord {
    existing.map_or_else(|| StreakRecord::start(today), |streak| streak.advance(today))
}

/// `min(cap, floor(count / divisor))`.
#[must_use]
pub fn streak_bonus(count: u32, cfg: &VitalityConfig) -> u32 {
    let divisor = cfg.streak_bonus_divisor.max(1);
    (count / divisor).min(cfg.streak_bonus_cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn three_consecutive_days_earn_first_bonus() {
        let cfg = VitalityConfig::default();
        let mut streak = advance_streak(None, day("2024-01-01"));
        streak = advance_streak(Some(streak), day("2024-01-02"));
        streak = advance_streak(Some(streak), day("2024-01-03"));
        assert_eq!(streak.count, 3);
        assert_eq!(streak_bonus(streak.count, &cfg), 1);
    }

    #[test]
    fn same_day_leaves_streak_unchanged() {
        let streak = StreakRecord {
            count: 4,
            date: day("2024-01-05"),
        };
        assert_eq!(streak.advance(day("2024-01-05")), streak);
    }

    #[test]
    fn gap_resets_to_one() {
        let streak = StreakRecord {
            count: 7,
            date: day("2024-01-05"),
        };
        let next = streak.advance(day("2024-01-07"));
        assert_eq!(next, StreakRecord::start(day("2024-01-07")));
    }

    #[test]
    fn date_ahead_of_today_resets() {
        let streak = StreakRecord {
            count: 2,
            date: day("2024-01-10"),
        };
        assert_eq!(streak.advance(day("2024-01-09")).count, 1);
    }

    #[test]
    fn streak_spans_month_and_year_boundaries() {
        let streak = StreakRecord {
            count: 5,
            date: day("2023-12-31"),
        };
        assert_eq!(streak.advance(day("2024-01-01")).count, 6);
        let leap = StreakRecord {
            count: 1,
            date: day("2024-02-28"),
        };
        assert_eq!(leap.advance(day("2024-02-29")).count, 2);
    }

    #[test]
    fn bonus_is_capped() {
        let cfg = VitalityConfig::default();
        assert_eq!(streak_bonus(0, &cfg), 0);
        assert_eq!(streak_bonus(2, &cfg), 0);
        assert_eq!(streak_bonus(6, &cfg), 2);
        assert_eq!(streak_bonus(9, &cfg), 3);
        assert_eq!(streak_bonus(40, &cfg), 3);
    }
}
