//! Failure paths: storage faults during advancement and error mapping at the command edge.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use readpace_app_lib::commands::books::{books_create, books_search, books_update, BooksListPayload};
use readpace_app_lib::commands::profile::{goal_progress_history, profile_update};
use readpace_app_lib::commands::sessions::{sessions_list, sessions_log, SessionsListPayload};
use readpace_app_lib::commands::settings::{settings_update, SettingsUpdatePayload};
use readpace_app_lib::commands::AppState;
use readpace_app_lib::db::DbPool;
use readpace_app_lib::error::AppError;
use readpace_app_lib::models::book::{BookCreateInput, BookUpdateInput};
use readpace_app_lib::models::profile::{OnboardingInput, ProfileUpdateInput};
use readpace_app_lib::models::progress::{AdvancementOutcome, NoAdvancement, SkipReason};
use readpace_app_lib::models::session::SessionLogInput;
use tempfile::{tempdir, TempDir};

fn setup_state() -> (AppState, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db = DbPool::new(temp_dir.path().join("errors.db")).expect("Failed to create test database");
    (AppState::new(db), temp_dir)
}

fn onboarded_at(state: &AppState, now: DateTime<Utc>) {
    state
        .profile()
        .onboard(
            OnboardingInput {
                display_name: None,
                initial_rate_minutes_per_day: 30,
                end_rate_goal_minutes_per_day: 60,
            },
            now,
        )
        .expect("onboarding should succeed");
}

#[test]
fn test_failed_checkpoint_write_leaves_rate_untouched() {
    let (state, _temp_dir) = setup_state();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    onboarded_at(&state, t0);
    let week_one = t0 + Duration::days(7);
    state.on_app_start(week_one);

    state
        .db()
        .with_connection(|conn| {
            conn.execute_batch(
                r#"
                CREATE TRIGGER block_progress_update
                BEFORE UPDATE ON weekly_progress
                BEGIN
                    SELECT RAISE(ABORT, 'progress is read-only');
                END;
                "#,
            )?;
            Ok(())
        })
        .unwrap();

    let outcome = state.on_app_start(week_one);
    assert_eq!(
        outcome,
        AdvancementOutcome::Skipped {
            reason: SkipReason::StorageWriteFailed
        }
    );

    let profile = state.goal_progress().load_goal_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 30);
    assert_eq!(profile.current_rate_last_updated, Some(t0));

    state
        .db()
        .with_connection(|conn| {
            conn.execute_batch("DROP TRIGGER block_progress_update;")?;
            Ok(())
        })
        .unwrap();
    let retried = state.on_app_start(week_one);
    assert!(matches!(
        retried,
        AdvancementOutcome::Advanced {
            current_rate: 31,
            ..
        }
    ));
}

#[test]
fn test_unreadable_checkpoint_store_is_skipped() {
    let (state, _temp_dir) = setup_state();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    onboarded_at(&state, t0);

    state
        .db()
        .with_connection(|conn| {
            conn.execute_batch("DROP TABLE weekly_progress;")?;
            Ok(())
        })
        .unwrap();

    let outcome = state.on_app_start(t0 + Duration::days(7));
    assert_eq!(
        outcome,
        AdvancementOutcome::Skipped {
            reason: SkipReason::StorageReadFailed
        }
    );

    let err = goal_progress_history(&state).unwrap_err();
    assert_eq!(err.code, "STORAGE_ERROR");
}

#[test]
fn test_non_numeric_profile_values_fall_back_to_defaults() {
    let (state, _temp_dir) = setup_state();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    onboarded_at(&state, t0);

    state
        .db()
        .with_connection(|conn| {
            conn.execute(
                "UPDATE reading_profile SET current_rate_minutes_per_day = 'lots', weekly_rate_increase_percentage = 'n/a' WHERE id = 1",
                [],
            )?;
            Ok(())
        })
        .unwrap();

    let profile = state.profile().get_profile().unwrap().unwrap();
    assert_eq!(profile.current_rate_minutes_per_day, 30);
    assert!((profile.weekly_rate_increase_percentage - 3.33).abs() < 1e-9);
}

#[test]
fn test_out_of_range_stored_rate_is_ignored() {
    let (state, _temp_dir) = setup_state();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    onboarded_at(&state, t0);
    state.on_app_start(t0 + Duration::days(7));

    state
        .db()
        .with_connection(|conn| {
            conn.execute(
                "UPDATE reading_profile SET current_rate_minutes_per_day = '1e30' WHERE id = 1",
                [],
            )?;
            Ok(())
        })
        .unwrap();

    let summary = state
        .analytics()
        .weekly_summary(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        .unwrap();
    assert_eq!(summary.weekly_goal_minutes, 0);
    assert!(summary.days.iter().all(|day| day.goal_minutes == 0));

    let outcome = state.on_app_start(t0 + Duration::days(14));
    assert_eq!(
        outcome,
        AdvancementOutcome::NotDue {
            reason: NoAdvancement::InvalidProfile
        }
    );
}

#[test]
fn test_timestamps_are_stored_at_second_precision() {
    let (state, _temp_dir) = setup_state();
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 15).unwrap() + Duration::milliseconds(250);
    onboarded_at(&state, t0);
    state.on_app_start(t0 + Duration::days(7));

    let (last_updated, checkpoint_created): (String, String) = state
        .db()
        .with_connection(|conn| {
            let last_updated = conn.query_row(
                "SELECT current_rate_last_updated FROM reading_profile WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            let created = conn.query_row(
                "SELECT date_created FROM weekly_progress ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )?;
            Ok((last_updated, created))
        })
        .unwrap();
    assert_eq!(last_updated, "2024-01-01T08:30:15+00:00");
    assert_eq!(checkpoint_created, "2024-01-08T08:30:15+00:00");
}

#[test]
fn test_profile_validation_errors() {
    let (state, _temp_dir) = setup_state();

    let err = state
        .profile()
        .onboard(
            OnboardingInput {
                display_name: None,
                initial_rate_minutes_per_day: 0,
                end_rate_goal_minutes_per_day: 60,
            },
            Utc::now(),
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = profile_update(
        &state,
        ProfileUpdateInput {
            display_name: None,
            initial_rate_minutes_per_day: 30,
            end_rate_goal_minutes_per_day: 60,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "NOT_FOUND");
}

#[test]
fn test_command_validation_errors() {
    let (state, _temp_dir) = setup_state();

    let err = books_create(
        &state,
        BookCreateInput {
            title: "   ".to_string(),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");

    let err = books_search(&state, " ".to_string()).unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");

    let err = books_update(&state, "missing".to_string(), BookUpdateInput::default()).unwrap_err();
    assert_eq!(err.code, "NOT_FOUND");

    let err = readpace_app_lib::commands::books::books_list(
        &state,
        BooksListPayload {
            status: Some("shelved".to_string()),
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");

    let err = sessions_log(
        &state,
        SessionLogInput {
            started_at: "2024-05-13T08:00:00Z".to_string(),
            ended_at: "2024-05-13T07:00:00Z".to_string(),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");

    let err = sessions_log(
        &state,
        SessionLogInput {
            book_id: Some("missing".to_string()),
            started_at: "2024-05-13T07:00:00Z".to_string(),
            ended_at: "2024-05-13T08:00:00Z".to_string(),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "NOT_FOUND");

    let err = sessions_list(
        &state,
        SessionsListPayload {
            book_id: None,
            start: Some("yesterday".to_string()),
            end: None,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");

    let err = settings_update(
        &state,
        SettingsUpdatePayload {
            yearly_book_goal: Some(-1),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");
}
