use serde::Serialize;

use crate::models::progress::WeeklyProgressCheckpoint;
use crate::models::settings::WeekStart;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyReading {
    pub date: String,
    pub minutes: i64,
    pub goal_minutes: i64,
    pub met_goal: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReadingSummary {
    pub week_start: String,
    pub week_end: String,
    pub week_starts_on: WeekStart,
    pub days: Vec<DailyReading>,
    pub total_minutes: i64,
    pub weekly_goal_minutes: i64,
    pub goal_ratio: f64,
    pub days_goal_met: i64,
    pub sessions_count: i64,
    pub pages_read: i64,
    pub current_streak_days: i64,
    pub books_finished_this_year: i64,
    pub yearly_book_goal: i64,
    pub checkpoints: Vec<WeeklyProgressCheckpoint>,
}
