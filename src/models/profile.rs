use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEEKLY_READING_GOAL_MINUTES: i64 = 210;
pub const DEFAULT_INITIAL_RATE_MINUTES: i64 = 30;
pub const DEFAULT_END_RATE_GOAL_MINUTES: i64 = 60;
pub const DEFAULT_CURRENT_RATE_MINUTES: i64 = 30;
pub const DEFAULT_WEEKLY_RATE_INCREASE_MINUTES: i64 = 1;
pub const DEFAULT_WEEKLY_RATE_INCREASE_PERCENTAGE: f64 = 3.33;

pub const MAX_RATE_MINUTES_PER_DAY: i64 = 24 * 60;

/// The user's reading-rate goal. One per installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProfile {
    pub display_name: Option<String>,
    pub weekly_reading_goal_minutes: i64,
    pub initial_rate_minutes_per_day: i64,
    pub end_rate_goal_minutes_per_day: i64,
    pub end_rate_goal_date: Option<DateTime<Utc>>,
    pub current_rate_minutes_per_day: i64,
    pub current_rate_last_updated: Option<DateTime<Utc>>,
    pub weekly_rate_increase_minutes: i64,
    pub weekly_rate_increase_percentage: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GoalProfile {
    /// True once the current rate has caught up with the end-of-year target.
    pub fn goal_reached(&self) -> bool {
        self.current_rate_minutes_per_day >= self.end_rate_goal_minutes_per_day
    }
}

/// Values derived from the two rates the user picks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedGoalFields {
    pub weekly_reading_goal_minutes: i64,
    pub weekly_rate_increase_minutes: i64,
    pub weekly_rate_increase_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingInput {
    pub display_name: Option<String>,
    pub initial_rate_minutes_per_day: i64,
    pub end_rate_goal_minutes_per_day: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateInput {
    pub display_name: Option<String>,
    pub initial_rate_minutes_per_day: i64,
    pub end_rate_goal_minutes_per_day: i64,
}
