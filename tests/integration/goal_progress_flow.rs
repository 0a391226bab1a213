//! End-to-end runs of the weekly goal ramp against a real SQLite file.

use chrono::{DateTime, Duration, TimeZone, Utc};
use readpace_app_lib::db::repositories::progress_repository::ProgressRepository;
use readpace_app_lib::db::DbPool;
use readpace_app_lib::models::profile::OnboardingInput;
use readpace_app_lib::models::progress::{AdvancementOutcome, NoAdvancement, SkipReason};
use readpace_app_lib::services::goal_progress_service::GoalProgressService;
use readpace_app_lib::services::profile_service::ProfileService;
use tempfile::{tempdir, TempDir};

fn setup_test_env() -> (DbPool, ProfileService, GoalProgressService, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("goal.db");
    let db = DbPool::new(&db_path).expect("Failed to create test database");
    let profiles = ProfileService::new(db.clone());
    let progress = GoalProgressService::new(db.clone());
    (db, profiles, progress, temp_dir)
}

fn new_year_2024() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn onboard(profiles: &ProfileService, initial: i64, end: i64, now: DateTime<Utc>) {
    profiles
        .onboard(
            OnboardingInput {
                display_name: Some("Reader".to_string()),
                initial_rate_minutes_per_day: initial,
                end_rate_goal_minutes_per_day: end,
            },
            now,
        )
        .expect("onboarding should succeed");
}

fn checkpoint_count(db: &DbPool) -> i64 {
    db.with_connection(ProgressRepository::count).unwrap()
}

#[test]
fn test_first_due_run_seeds_checkpoint_without_touching_rate() {
    let (db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);

    let outcome = progress.run_advancement(t0 + Duration::days(7));
    assert_eq!(
        outcome,
        AdvancementOutcome::Seeded {
            weeks_passed: 0,
            achieved_reading_minutes: 30.0,
        }
    );

    let profile = progress.load_goal_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 30);
    assert_eq!(profile.current_rate_last_updated, Some(t0));

    let checkpoint = progress.latest_checkpoint().unwrap().unwrap();
    assert_eq!(checkpoint.weeks_passed, 0);
    assert_eq!(checkpoint.target_reading_minutes, 60);
    assert_eq!(checkpoint_count(&db), 1);
}

#[test]
fn test_advance_after_seed_raises_rate_by_one_step() {
    let (db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    let week_one = t0 + Duration::days(7);

    progress.run_advancement(week_one);
    let outcome = progress.run_advancement(week_one);
    assert_eq!(
        outcome,
        AdvancementOutcome::Advanced {
            previous_rate: 30,
            current_rate: 31,
            weeks_passed: 1,
        }
    );

    let profile = progress.load_goal_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 31);
    assert_eq!(profile.current_rate_last_updated, Some(week_one));

    // The latest checkpoint is overwritten rather than appended.
    assert_eq!(checkpoint_count(&db), 1);
    let checkpoint = progress.latest_checkpoint().unwrap().unwrap();
    assert_eq!(checkpoint.weeks_passed, 1);
}

#[test]
fn test_repeated_runs_within_a_week_change_nothing() {
    let (_db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    let week_one = t0 + Duration::days(7);
    progress.run_advancement(week_one);
    progress.run_advancement(week_one);

    let before = progress.load_goal_profile().unwrap().unwrap();
    for hours in [0, 1, 48, 6 * 24] {
        let outcome = progress.run_advancement(week_one + Duration::hours(hours));
        assert_eq!(
            outcome,
            AdvancementOutcome::NotDue {
                reason: NoAdvancement::WithinWeek
            }
        );
    }
    let after = progress.load_goal_profile().unwrap().unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_checkpoint_keeps_unrounded_rate() {
    let (_db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    progress.run_advancement(t0 + Duration::days(7));
    progress.run_advancement(t0 + Duration::days(7));

    let outcome = progress.run_advancement(t0 + Duration::days(14));
    assert_eq!(
        outcome,
        AdvancementOutcome::Advanced {
            previous_rate: 31,
            current_rate: 32,
            weeks_passed: 1,
        }
    );

    let checkpoint = progress.latest_checkpoint().unwrap().unwrap();
    let expected = 31.0 * 1.0333;
    assert!(
        (checkpoint.achieved_reading_minutes - expected).abs() < 1e-9,
        "checkpoint stored {}",
        checkpoint.achieved_reading_minutes
    );
    let profile = progress.load_goal_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 32);
}

#[test]
fn test_weeks_passed_counts_whole_weeks_since_last_update() {
    let (_db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    progress.run_advancement(t0 + Duration::days(7));

    // 2024-01-01 to 2024-01-20 is 19 days.
    let outcome = progress.run_advancement(Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap());
    assert_eq!(
        outcome,
        AdvancementOutcome::Advanced {
            previous_rate: 30,
            current_rate: 31,
            weeks_passed: 2,
        }
    );
}

#[test]
fn test_rate_stops_at_end_goal() {
    let (db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 59, 60, t0);
    db.with_connection(|conn| {
        conn.execute(
            "UPDATE reading_profile SET weekly_rate_increase_percentage = 3.33 WHERE id = 1",
            [],
        )?;
        Ok(())
    })
    .unwrap();

    let week_one = t0 + Duration::days(7);
    progress.run_advancement(week_one);
    let outcome = progress.run_advancement(week_one);
    assert_eq!(
        outcome,
        AdvancementOutcome::Advanced {
            previous_rate: 59,
            current_rate: 60,
            weeks_passed: 1,
        }
    );

    let outcome = progress.run_advancement(t0 + Duration::days(14));
    assert_eq!(
        outcome,
        AdvancementOutcome::NotDue {
            reason: NoAdvancement::GoalReached
        }
    );
    let profile = progress.load_goal_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 60);
}

#[test]
fn test_nothing_moves_after_goal_date() {
    let (_db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    progress.run_advancement(t0 + Duration::days(7));

    let next_year = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
    for offset in [0, 7, 70] {
        let outcome = progress.run_advancement(next_year + Duration::days(offset));
        assert_eq!(
            outcome,
            AdvancementOutcome::NotDue {
                reason: NoAdvancement::GoalWindowClosed
            }
        );
    }
    let profile = progress.load_goal_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 30);
}

#[test]
fn test_missing_profile_is_skipped() {
    let (db, _profiles, progress, _temp_dir) = setup_test_env();
    let outcome = progress.run_advancement(new_year_2024());
    assert_eq!(
        outcome,
        AdvancementOutcome::Skipped {
            reason: SkipReason::ProfileMissing
        }
    );
    assert_eq!(checkpoint_count(&db), 0);
}

#[test]
fn test_invalid_stored_profile_is_not_advanced() {
    let (db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    db.with_connection(|conn| {
        conn.execute(
            "UPDATE reading_profile SET initial_rate_minutes_per_day = 0 WHERE id = 1",
            [],
        )?;
        Ok(())
    })
    .unwrap();

    let outcome = progress.run_advancement(t0 + Duration::days(7));
    assert_eq!(
        outcome,
        AdvancementOutcome::NotDue {
            reason: NoAdvancement::InvalidProfile
        }
    );
    assert_eq!(checkpoint_count(&db), 0);
}

#[test]
fn test_profile_edit_restarts_progression() {
    let (_db, profiles, progress, _temp_dir) = setup_test_env();
    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    progress.run_advancement(t0 + Duration::days(7));
    progress.run_advancement(t0 + Duration::days(7));

    let edited_at = t0 + Duration::days(10);
    let edited = profiles
        .update_profile(
            readpace_app_lib::models::profile::ProfileUpdateInput {
                display_name: None,
                initial_rate_minutes_per_day: 20,
                end_rate_goal_minutes_per_day: 45,
            },
            edited_at,
        )
        .unwrap();
    assert_eq!(edited.current_rate_minutes_per_day, 20);
    assert_eq!(edited.created_at, Some(t0));

    assert_eq!(
        progress.run_advancement(edited_at + Duration::days(3)),
        AdvancementOutcome::NotDue {
            reason: NoAdvancement::WithinWeek
        }
    );
    let outcome = progress.run_advancement(edited_at + Duration::days(7));
    assert!(matches!(
        outcome,
        AdvancementOutcome::Advanced {
            previous_rate: 20,
            current_rate: 21,
            ..
        }
    ));
}

#[test]
fn test_history_lists_checkpoints() {
    let (_db, profiles, progress, _temp_dir) = setup_test_env();
    assert!(progress.progress_history().unwrap().is_none());

    let t0 = new_year_2024();
    onboard(&profiles, 30, 60, t0);
    progress.run_advancement(t0 + Duration::days(7));

    let history = progress.progress_history().unwrap().unwrap();
    assert_eq!(history.current_rate_minutes_per_day, 30);
    assert_eq!(history.end_rate_goal_minutes_per_day, 60);
    assert_eq!(history.checkpoints.len(), 1);
    assert_eq!(
        history.end_rate_goal_date,
        Some(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap())
    );
}
