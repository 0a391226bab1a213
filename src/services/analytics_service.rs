use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, warn};

use crate::db::repositories::book_repository::BookRepository;
use crate::db::repositories::profile_repository::{ProfileRepository, ProfileRow};
use crate::db::repositories::progress_repository::ProgressRepository;
use crate::db::repositories::session_repository::SessionRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::analytics::{DailyReading, WeeklyReadingSummary};
use crate::models::profile::MAX_RATE_MINUTES_PER_DAY;
use crate::models::session::ReadingSessionRecord;
use crate::models::settings::WeekStart;
use crate::services::settings_service::SettingsService;
use crate::utils::time::{format_timestamp, start_of_day};

const DAYS_PER_WEEK: usize = 7;
const STREAK_LOOKBACK_DAYS: usize = 366;
const CHECKPOINT_LIMIT: usize = 12;

pub struct AnalyticsService {
    db: DbPool,
    settings_service: Arc<SettingsService>,
}

impl AnalyticsService {
    pub fn new(db: DbPool, settings_service: Arc<SettingsService>) -> Self {
        Self {
            db,
            settings_service,
        }
    }

    /// Reading for the week containing `reference`, measured against the current daily rate.
    pub fn weekly_summary(&self, reference: NaiveDate) -> AppResult<WeeklyReadingSummary> {
        let settings = self.settings_service.get()?;
        let (week_start, week_end) = week_bounds(reference, settings.week_starts_on);

        let range_start = format_timestamp(&start_of_day(week_start));
        let range_end = format_timestamp(&start_of_day(week_end));
        let streak_end = format_timestamp(&start_of_day(reference + Duration::days(1)));
        let year_start = NaiveDate::from_ymd_opt(reference.year(), 1, 1).unwrap_or(reference);
        let next_year_start =
            NaiveDate::from_ymd_opt(reference.year() + 1, 1, 1).unwrap_or(reference);
        let year_range = (
            format_timestamp(&start_of_day(year_start)),
            format_timestamp(&start_of_day(next_year_start)),
        );

        let (profile, sessions, reading_days, books_finished, checkpoints) =
            self.db.with_connection(|conn| {
                let profile = ProfileRepository::find(conn)?.map(ProfileRow::into_profile);
                let sessions = SessionRepository::list_between(conn, &range_start, &range_end)?;
                let reading_days =
                    SessionRepository::reading_days_before(conn, &streak_end, STREAK_LOOKBACK_DAYS)?;
                let books_finished =
                    BookRepository::count_finished_between(conn, &year_range.0, &year_range.1)?;
                let checkpoints = ProgressRepository::list_recent(conn, CHECKPOINT_LIMIT)?;
                Ok((profile, sessions, reading_days, books_finished, checkpoints))
            })?;

        let daily_goal = profile
            .as_ref()
            .map(|p| daily_goal_minutes(p.current_rate_minutes_per_day))
            .unwrap_or(0);
        let weekly_goal_minutes = daily_goal * DAYS_PER_WEEK as i64;

        let minutes = bucket_daily_minutes(&sessions, week_start);
        let days: Vec<DailyReading> = minutes
            .iter()
            .enumerate()
            .map(|(offset, &minutes)| DailyReading {
                date: (week_start + Duration::days(offset as i64)).to_string(),
                minutes,
                goal_minutes: daily_goal,
                met_goal: daily_goal > 0 && minutes >= daily_goal,
            })
            .collect();

        let total_minutes: i64 = minutes.iter().sum();
        let days_goal_met = days.iter().filter(|d| d.met_goal).count() as i64;
        let pages_read: i64 = sessions.iter().filter_map(|s| s.pages_read).sum();
        let reading_dates: Vec<NaiveDate> = reading_days
            .iter()
            .filter_map(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .collect();

        debug!(
            target: "app::analytics",
            week_start = %week_start,
            sessions = sessions.len(),
            total_minutes,
            "weekly summary computed"
        );

        Ok(WeeklyReadingSummary {
            week_start: week_start.to_string(),
            week_end: (week_end - Duration::days(1)).to_string(),
            week_starts_on: settings.week_starts_on,
            days,
            total_minutes,
            weekly_goal_minutes,
            goal_ratio: goal_ratio(total_minutes, weekly_goal_minutes),
            days_goal_met,
            sessions_count: sessions.len() as i64,
            pages_read,
            current_streak_days: reading_streak(&reading_dates, reference),
            books_finished_this_year: books_finished,
            yearly_book_goal: settings.yearly_book_goal,
            checkpoints,
        })
    }
}

/// Stored rate as a daily target; anything outside `0..=MAX_RATE_MINUTES_PER_DAY` counts as no goal.
fn daily_goal_minutes(current_rate: i64) -> i64 {
    if (0..=MAX_RATE_MINUTES_PER_DAY).contains(&current_rate) {
        return current_rate;
    }
    warn!(target: "app::analytics", current_rate, "ignoring out-of-range daily rate");
    0
}

/// First day of the week holding `reference`, and the first day after it.
pub fn week_bounds(reference: NaiveDate, week_start: WeekStart) -> (NaiveDate, NaiveDate) {
    let offset = match week_start {
        WeekStart::Monday => reference.weekday().num_days_from_monday(),
        WeekStart::Sunday => reference.weekday().num_days_from_sunday(),
    };
    let start = reference - Duration::days(offset as i64);
    (start, start + Duration::days(DAYS_PER_WEEK as i64))
}

/// Minutes per day of the week, bucketed by the UTC date each session started on.
pub fn bucket_daily_minutes(
    sessions: &[ReadingSessionRecord],
    week_start: NaiveDate,
) -> [i64; DAYS_PER_WEEK] {
    let mut buckets = [0_i64; DAYS_PER_WEEK];
    for session in sessions {
        let Some(day) = session
            .started_at
            .get(..10)
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        else {
            continue;
        };
        let offset = (day - week_start).num_days();
        if (0..DAYS_PER_WEEK as i64).contains(&offset) {
            buckets[offset as usize] += session.duration_minutes.max(0);
        }
    }
    buckets
}

/// Consecutive reading days ending on `reference`. `days` may be in any order.
pub fn reading_streak(days: &[NaiveDate], reference: NaiveDate) -> i64 {
    let mut streak = 0;
    let mut cursor = reference;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

fn goal_ratio(total: i64, goal: i64) -> f64 {
    if goal <= 0 {
        return 0.0;
    }
    let ratio = total as f64 / goal as f64;
    (ratio.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}
