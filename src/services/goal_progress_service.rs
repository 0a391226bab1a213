//! Weekly ramp of the daily reading goal.
//!
//! A run reads the profile and the newest checkpoint, decides whether a full
//! week has elapsed inside the goal window, and then either seeds the
//! checkpoint log or raises the current rate by one percentage step.
//! Failures are logged and absorbed; the next run retries from the same
//! state because `current_rate_last_updated` only moves on a committed write.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::db::repositories::profile_repository::{ProfileRepository, ProfileRow};
use crate::db::repositories::progress_repository::ProgressRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::profile::{GoalProfile, MAX_RATE_MINUTES_PER_DAY};
use crate::models::progress::{
    Advancement, AdvancementOutcome, CheckpointInsert, NoAdvancement, ProgressHistory,
    RateAdvance, SkipReason, WeeklyProgressCheckpoint,
};
use crate::utils::time::whole_days_between;

const DAYS_PER_WEEK: i64 = 7;
const HISTORY_LIMIT: usize = 104;

pub struct GoalProgressService {
    db: DbPool,
}

impl GoalProgressService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// `None` means onboarding has not happened yet.
    pub fn load_goal_profile(&self) -> AppResult<Option<GoalProfile>> {
        self.db.with_connection(|conn| {
            Ok(ProfileRepository::find(conn)?.map(ProfileRow::into_profile))
        })
    }

    pub fn latest_checkpoint(&self) -> AppResult<Option<WeeklyProgressCheckpoint>> {
        self.db.with_connection(ProgressRepository::latest)
    }

    /// Commits the profile update and checkpoint write in one transaction.
    pub fn apply_advancement(&self, advancement: &Advancement) -> AppResult<()> {
        match advancement {
            Advancement::NotDue(_) => Ok(()),
            Advancement::SeedCheckpoint(insert) => self.db.with_transaction(|tx| {
                let id = ProgressRepository::insert(tx, insert)?;
                debug!(target: "app::goal", checkpoint_id = id, "seeded first checkpoint");
                Ok(())
            }),
            Advancement::AdvanceRate(step) => self.db.with_transaction(|tx| {
                let updated =
                    ProfileRepository::update_current_rate(tx, step.new_rate_rounded, &step.updated_at)?;
                if updated == 0 {
                    return Err(AppError::not_found());
                }
                ProgressRepository::update_progress(
                    tx,
                    step.checkpoint_id,
                    step.weeks_passed,
                    step.new_rate,
                )?;
                Ok(())
            }),
        }
    }

    /// Full read → compute → write pipeline. Never fails; problems come back as `Skipped`.
    pub fn run_advancement(&self, now: DateTime<Utc>) -> AdvancementOutcome {
        let profile = match self.load_goal_profile() {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(target: "app::goal", "no reading profile yet; skipping advancement");
                return AdvancementOutcome::Skipped {
                    reason: SkipReason::ProfileMissing,
                };
            }
            Err(err) => {
                error!(target: "app::goal", error = %err, "failed to read reading profile");
                return AdvancementOutcome::Skipped {
                    reason: SkipReason::StorageReadFailed,
                };
            }
        };

        let last_checkpoint = match self.latest_checkpoint() {
            Ok(checkpoint) => checkpoint,
            Err(err) => {
                error!(target: "app::goal", error = %err, "failed to read latest checkpoint");
                return AdvancementOutcome::Skipped {
                    reason: SkipReason::StorageReadFailed,
                };
            }
        };

        let advancement = compute_advancement(&profile, last_checkpoint.as_ref(), now);

        if let Err(err) = self.apply_advancement(&advancement) {
            error!(target: "app::goal", error = %err, "failed to persist advancement");
            return AdvancementOutcome::Skipped {
                reason: SkipReason::StorageWriteFailed,
            };
        }

        let outcome = match advancement {
            Advancement::NotDue(reason) => AdvancementOutcome::NotDue { reason },
            Advancement::SeedCheckpoint(insert) => AdvancementOutcome::Seeded {
                weeks_passed: insert.weeks_passed,
                achieved_reading_minutes: insert.achieved_reading_minutes,
            },
            Advancement::AdvanceRate(step) => AdvancementOutcome::Advanced {
                previous_rate: step.previous_rate,
                current_rate: step.new_rate_rounded,
                weeks_passed: step.weeks_passed,
            },
        };
        info!(target: "app::goal", outcome = ?outcome, "goal advancement run finished");
        outcome
    }

    pub fn progress_history(&self) -> AppResult<Option<ProgressHistory>> {
        let Some(profile) = self.load_goal_profile()? else {
            return Ok(None);
        };
        let checkpoints = self
            .db
            .with_connection(|conn| ProgressRepository::list_recent(conn, HISTORY_LIMIT))?;

        Ok(Some(ProgressHistory {
            current_rate_minutes_per_day: profile.current_rate_minutes_per_day,
            end_rate_goal_minutes_per_day: profile.end_rate_goal_minutes_per_day,
            end_rate_goal_date: profile.end_rate_goal_date,
            checkpoints,
        }))
    }
}

/// Full weeks between two instants, counted in whole calendar days and truncated toward zero.
pub fn weeks_between(since: &DateTime<Utc>, now: &DateTime<Utc>) -> i64 {
    whole_days_between(since, now) / DAYS_PER_WEEK
}

/// Decides what one run should do. Pure; the caller persists the result.
pub fn compute_advancement(
    profile: &GoalProfile,
    last_checkpoint: Option<&WeeklyProgressCheckpoint>,
    now: DateTime<Utc>,
) -> Advancement {
    if validate_profile(profile).is_err() {
        return Advancement::NotDue(NoAdvancement::InvalidProfile);
    }

    let since = profile.current_rate_last_updated.unwrap_or(now);
    let weeks_passed = weeks_between(&since, &now);

    if weeks_passed <= 0 {
        return Advancement::NotDue(NoAdvancement::WithinWeek);
    }

    match profile.end_rate_goal_date {
        Some(end_date) if end_date > now => {}
        _ => return Advancement::NotDue(NoAdvancement::GoalWindowClosed),
    }

    let Some(checkpoint) = last_checkpoint else {
        return Advancement::SeedCheckpoint(CheckpointInsert {
            weeks_passed: 0,
            target_reading_minutes: profile.end_rate_goal_minutes_per_day,
            achieved_reading_minutes: (profile.initial_rate_minutes_per_day as f64).round(),
            date_created: now,
        });
    };

    // The +1 floor below would push a rate that already sits at the goal past it.
    if profile.goal_reached() {
        return Advancement::NotDue(NoAdvancement::GoalReached);
    }

    let current = profile.current_rate_minutes_per_day;
    let new_rate = next_rate(
        current,
        profile.end_rate_goal_minutes_per_day,
        profile.weekly_rate_increase_percentage,
    );

    Advancement::AdvanceRate(RateAdvance {
        checkpoint_id: checkpoint.id,
        weeks_passed,
        previous_rate: current,
        new_rate,
        new_rate_rounded: new_rate.round() as i64,
        updated_at: now,
    })
}

/// One percentage step, capped at the goal and never less than one extra minute.
pub fn next_rate(current: i64, end_rate: i64, percentage: f64) -> f64 {
    let stepped = current as f64 * (1.0 + percentage / 100.0);
    let capped = stepped.min(end_rate as f64);
    capped.max((current + 1) as f64)
}

/// Rates must sit in `1..=MAX_RATE_MINUTES_PER_DAY`; the percentage must be finite and non-negative.
pub fn validate_profile(profile: &GoalProfile) -> AppResult<()> {
    let rates = [
        ("initial rate", profile.initial_rate_minutes_per_day),
        ("current rate", profile.current_rate_minutes_per_day),
        ("end rate", profile.end_rate_goal_minutes_per_day),
    ];
    for (label, minutes) in rates {
        if !(1..=MAX_RATE_MINUTES_PER_DAY).contains(&minutes) {
            return Err(AppError::invalid_profile(format!(
                "{label} must be between 1 and {MAX_RATE_MINUTES_PER_DAY}, got {minutes}"
            )));
        }
    }
    let percentage = profile.weekly_rate_increase_percentage;
    if !percentage.is_finite() || percentage < 0.0 {
        return Err(AppError::invalid_profile(format!(
            "weekly increase percentage is unusable: {percentage}"
        )));
    }
    Ok(())
}
