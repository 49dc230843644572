//! Activity categories that damage the monster.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    DAMAGE_DIET_PLAN, DAMAGE_EXERCISE_GRADE, DAMAGE_FOOD_GRADE, DAMAGE_KINDNESS_TASK,
    DAMAGE_PRODUCT_REVIEW, DAMAGE_RIDDLE_SOLVED, DAMAGE_SYMPTOM_LOG, DAMAGE_THOUGHT_REFRAME,
};

/// A completed user action that feeds the damage applicator.
///
/// Each kind keeps its own streak and its own "completed today" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    FoodGrade,
    ExerciseGrade,
    KindnessTask,
    ThoughtReframe,
    RiddleSolved,
    SymptomLog,
    ProductReview,
    DietPlan,
}

impl ActivityKind {
    pub const ALL: [Self; 8] = [
        Self::FoodGrade,
        Self::ExerciseGrade,
        Self::KindnessTask,
        Self::ThoughtReframe,
        Self::RiddleSolved,
        Self::SymptomLog,
        Self::ProductReview,
        Self::DietPlan,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FoodGrade => "food-grade",
            Self::ExerciseGrade => "exercise-grade",
            Self::KindnessTask => "kindness-task",
            Self::ThoughtReframe => "thought-reframe",
            Self::RiddleSolved => "riddle-solved",
            Self::SymptomLog => "symptom-log",
            Self::ProductReview => "product-review",
            Self::DietPlan => "diet-plan",
        }
    }

    /// Base damage the app ships with for this activity.
    #[must_use]
    pub const fn default_base_damage(self) -> f64 {
        match self {
            Self::FoodGrade => DAMAGE_FOOD_GRADE,
            Self::ExerciseGrade => DAMAGE_EXERCISE_GRADE,
            Self::KindnessTask => DAMAGE_KINDNESS_TASK,
            Self::ThoughtReframe => DAMAGE_THOUGHT_REFRAME,
            Self::RiddleSolved => DAMAGE_RIDDLE_SOLVED,
            Self::SymptomLog => DAMAGE_SYMPTOM_LOG,
            Self::ProductReview => DAMAGE_PRODUCT_REVIEW,
            Self::DietPlan => DAMAGE_DIET_PLAN,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown activity '{0}'")]
pub struct UnknownActivity(pub String);

impl FromStr for ActivityKind {
    type Err = UnknownActivity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| UnknownActivity(s.to_string()))
    }
}

impl From<ActivityKind> for String {
    fn from(value: ActivityKind) -> Self {
        value.as_str().to_string()
    }
}
