use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of weekly progress toward the rate goal.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgressCheckpoint {
    pub id: i64,
    pub weeks_passed: i64,
    pub target_reading_minutes: i64,
    pub achieved_reading_minutes: f64,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInsert {
    pub weeks_passed: i64,
    pub target_reading_minutes: i64,
    pub achieved_reading_minutes: f64,
    pub date_created: DateTime<Utc>,
}

/// What the calculator decided for one run.
#[derive(Debug, Clone, PartialEq)]
pub enum Advancement {
    NotDue(NoAdvancement),
    /// First due run: only the checkpoint log is seeded, the rate stays.
    SeedCheckpoint(CheckpointInsert),
    /// A weekly step: new rate on the profile, overwrite of the latest checkpoint.
    AdvanceRate(RateAdvance),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateAdvance {
    pub checkpoint_id: i64,
    pub weeks_passed: i64,
    pub previous_rate: i64,
    pub new_rate: f64,
    pub new_rate_rounded: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoAdvancement {
    /// Less than a full week since the rate last changed.
    WithinWeek,
    /// No end date, or the end date has passed.
    GoalWindowClosed,
    /// The current rate already sits at or above the end rate.
    GoalReached,
    /// Stored numbers cannot drive the ramp.
    InvalidProfile,
}

impl NoAdvancement {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoAdvancement::WithinWeek => "within_week",
            NoAdvancement::GoalWindowClosed => "goal_window_closed",
            NoAdvancement::GoalReached => "goal_reached",
            NoAdvancement::InvalidProfile => "invalid_profile",
        }
    }
}

impl fmt::Display for NoAdvancement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ProfileMissing,
    StorageReadFailed,
    StorageWriteFailed,
}

/// Result of one full read → compute → write pipeline run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AdvancementOutcome {
    #[serde(rename_all = "camelCase")]
    Seeded { weeks_passed: i64, achieved_reading_minutes: f64 },
    #[serde(rename_all = "camelCase")]
    Advanced {
        previous_rate: i64,
        current_rate: i64,
        weeks_passed: i64,
    },
    NotDue { reason: NoAdvancement },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressHistory {
    pub current_rate_minutes_per_day: i64,
    pub end_rate_goal_minutes_per_day: i64,
    pub end_rate_goal_date: Option<DateTime<Utc>>,
    pub checkpoints: Vec<WeeklyProgressCheckpoint>,
}
