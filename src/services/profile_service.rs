use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::repositories::profile_repository::{ProfileRepository, ProfileRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::profile::{
    DerivedGoalFields, GoalProfile, OnboardingInput, ProfileUpdateInput,
    DEFAULT_WEEKLY_RATE_INCREASE_PERCENTAGE, MAX_RATE_MINUTES_PER_DAY,
};
use crate::utils::time::end_of_year;

const WEEKS_PER_YEAR: i64 = 52;
const MAX_DISPLAY_NAME_CHARS: usize = 80;

pub struct ProfileService {
    db: DbPool,
}

impl ProfileService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn get_profile(&self) -> AppResult<Option<GoalProfile>> {
        self.db.with_connection(|conn| {
            Ok(ProfileRepository::find(conn)?.map(ProfileRow::into_profile))
        })
    }

    pub fn onboard(&self, input: OnboardingInput, now: DateTime<Utc>) -> AppResult<GoalProfile> {
        let profile = build_profile(
            input.display_name,
            input.initial_rate_minutes_per_day,
            input.end_rate_goal_minutes_per_day,
            now,
        )?;

        self.db.with_transaction(|tx| {
            if ProfileRepository::exists(tx)? {
                return Err(AppError::conflict("reading profile already exists"));
            }
            ProfileRepository::upsert(tx, &ProfileRow::from_profile(&profile))
        })?;

        info!(
            target: "app::goal",
            initial_rate = profile.initial_rate_minutes_per_day,
            end_rate = profile.end_rate_goal_minutes_per_day,
            "reading profile created"
        );
        Ok(profile)
    }

    /// Overwrites the profile and restarts the ramp from the new initial rate.
    pub fn update_profile(
        &self,
        input: ProfileUpdateInput,
        now: DateTime<Utc>,
    ) -> AppResult<GoalProfile> {
        let mut profile = build_profile(
            input.display_name,
            input.initial_rate_minutes_per_day,
            input.end_rate_goal_minutes_per_day,
            now,
        )?;

        self.db.with_transaction(|tx| {
            let existing = ProfileRepository::find(tx)?.ok_or_else(AppError::not_found)?;
            profile.created_at = existing.into_profile().created_at.or(Some(now));
            ProfileRepository::upsert(tx, &ProfileRow::from_profile(&profile))
        })?;

        info!(
            target: "app::goal",
            initial_rate = profile.initial_rate_minutes_per_day,
            end_rate = profile.end_rate_goal_minutes_per_day,
            "reading profile edited; progression restarted"
        );
        Ok(profile)
    }
}

/// Weekly goal, nominal per-week increase and its percentage of the starting rate.
pub fn derive_goal_fields(initial_rate: i64, end_rate: i64) -> DerivedGoalFields {
    let total_increase = end_rate - initial_rate;
    let weekly_rate_increase_minutes = if total_increase > 0 {
        (total_increase + WEEKS_PER_YEAR - 1) / WEEKS_PER_YEAR
    } else {
        0
    };

    let weekly_rate_increase_percentage = if initial_rate > 0 {
        round_two_places(weekly_rate_increase_minutes as f64 / initial_rate as f64 * 100.0)
    } else {
        DEFAULT_WEEKLY_RATE_INCREASE_PERCENTAGE
    };

    DerivedGoalFields {
        weekly_reading_goal_minutes: initial_rate * 7,
        weekly_rate_increase_minutes,
        weekly_rate_increase_percentage,
    }
}

fn build_profile(
    display_name: Option<String>,
    initial_rate: i64,
    end_rate: i64,
    now: DateTime<Utc>,
) -> AppResult<GoalProfile> {
    ensure_valid_rate("initial rate", initial_rate)?;
    ensure_valid_rate("end rate", end_rate)?;
    let display_name = normalize_display_name(display_name)?;
    let derived = derive_goal_fields(initial_rate, end_rate);

    Ok(GoalProfile {
        display_name,
        weekly_reading_goal_minutes: derived.weekly_reading_goal_minutes,
        initial_rate_minutes_per_day: initial_rate,
        end_rate_goal_minutes_per_day: end_rate,
        end_rate_goal_date: Some(end_of_year(&now)),
        current_rate_minutes_per_day: initial_rate,
        current_rate_last_updated: Some(now),
        weekly_rate_increase_minutes: derived.weekly_rate_increase_minutes,
        weekly_rate_increase_percentage: derived.weekly_rate_increase_percentage,
        created_at: Some(now),
        updated_at: Some(now),
    })
}

fn ensure_valid_rate(label: &str, minutes: i64) -> AppResult<()> {
    if minutes <= 0 || minutes > MAX_RATE_MINUTES_PER_DAY {
        return Err(AppError::validation(format!(
            "{label} must be between 1 and {MAX_RATE_MINUTES_PER_DAY} minutes per day"
        )));
    }
    Ok(())
}

fn normalize_display_name(value: Option<String>) -> AppResult<Option<String>> {
    let Some(name) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(AppError::validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    Ok(Some(name))
}

fn round_two_places(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
