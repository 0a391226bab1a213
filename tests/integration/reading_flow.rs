//! Shelf, sessions and weekly analytics driven through the command layer.

use readpace_app_lib::commands::analytics::analytics_weekly_fetch;
use readpace_app_lib::commands::books::{
    books_create, books_delete, books_import, books_list, books_search, books_update,
    BooksListPayload,
};
use readpace_app_lib::commands::profile::{profile_get, profile_onboard};
use readpace_app_lib::commands::sessions::{
    sessions_delete, sessions_list, sessions_log, SessionsListPayload,
};
use readpace_app_lib::commands::settings::{settings_get, settings_update, SettingsUpdatePayload};
use readpace_app_lib::commands::AppState;
use readpace_app_lib::config::AppConfig;
use readpace_app_lib::models::book::{
    BookCreateInput, BookImportInput, BookStatus, BookUpdateInput,
};
use readpace_app_lib::models::profile::OnboardingInput;
use readpace_app_lib::models::session::SessionLogInput;
use readpace_app_lib::models::settings::WeekStart;
use tempfile::{tempdir, TempDir};

fn setup_state() -> (AppState, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let config = AppConfig::new(temp_dir.path().join("data"));
    let state = readpace_app_lib::start_core(&config).expect("core should start");
    (state, temp_dir)
}

fn create_book(state: &AppState, title: &str, pages: i64) -> String {
    books_create(
        state,
        BookCreateInput {
            title: title.to_string(),
            author: Some("Frank Herbert".to_string()),
            page_count: Some(pages),
            ..Default::default()
        },
    )
    .expect("book should be created")
    .id
}

fn log(state: &AppState, book_id: Option<&str>, start: &str, end: &str, end_page: Option<i64>) {
    sessions_log(
        state,
        SessionLogInput {
            book_id: book_id.map(str::to_string),
            started_at: start.to_string(),
            ended_at: end.to_string(),
            end_page,
            ..Default::default()
        },
    )
    .expect("session should be logged");
}

#[test]
fn test_onboarding_through_commands() {
    let (state, _temp_dir) = setup_state();
    assert!(profile_get(&state).unwrap().is_none());

    let profile = profile_onboard(
        &state,
        OnboardingInput {
            display_name: Some("  Ada ".to_string()),
            initial_rate_minutes_per_day: 30,
            end_rate_goal_minutes_per_day: 60,
        },
    )
    .unwrap();
    assert_eq!(profile.display_name.as_deref(), Some("Ada"));
    assert_eq!(profile.weekly_reading_goal_minutes, 210);
    assert_eq!(profile.weekly_rate_increase_minutes, 1);
    assert!((profile.weekly_rate_increase_percentage - 3.33).abs() < 1e-9);

    let err = profile_onboard(
        &state,
        OnboardingInput {
            display_name: None,
            initial_rate_minutes_per_day: 10,
            end_rate_goal_minutes_per_day: 20,
        },
    )
    .unwrap_err();
    assert_eq!(err.code, "CONFLICT");
}

#[test]
fn test_sessions_move_bookmark_and_status() {
    let (state, _temp_dir) = setup_state();
    let book_id = create_book(&state, "Dune", 412);

    log(
        &state,
        Some(&book_id),
        "2024-05-13T07:00:00Z",
        "2024-05-13T07:40:00Z",
        Some(50),
    );
    log(
        &state,
        Some(&book_id),
        "2024-05-14T20:00:00Z",
        "2024-05-14T20:30:00Z",
        Some(80),
    );

    let reading = books_list(
        &state,
        BooksListPayload {
            status: Some("reading".to_string()),
        },
    )
    .unwrap();
    assert_eq!(reading.len(), 1);
    assert_eq!(reading[0].current_page, 80);
    assert_eq!(reading[0].started_at.as_deref(), Some("2024-05-13T07:00:00+00:00"));

    let sessions = sessions_list(
        &state,
        SessionsListPayload {
            book_id: Some(book_id.clone()),
            start: None,
            end: None,
        },
    )
    .unwrap();
    assert_eq!(sessions.len(), 2);
    let pages: i64 = sessions.iter().filter_map(|s| s.pages_read).sum();
    assert_eq!(pages, 80);

    let in_range = sessions_list(
        &state,
        SessionsListPayload {
            book_id: None,
            start: Some("2024-05-14T00:00:00Z".to_string()),
            end: Some("2024-05-15T00:00:00Z".to_string()),
        },
    )
    .unwrap();
    assert_eq!(in_range.len(), 1);
    assert_eq!(in_range[0].duration_minutes, 30);

    sessions_delete(&state, in_range[0].id.clone()).unwrap();
    let err = sessions_delete(&state, in_range[0].id.clone()).unwrap_err();
    assert_eq!(err.code, "NOT_FOUND");
}

#[test]
fn test_session_end_page_is_clamped_to_book_length() {
    let (state, _temp_dir) = setup_state();
    let book_id = create_book(&state, "Novella", 120);

    log(
        &state,
        Some(&book_id),
        "2024-05-13T07:00:00Z",
        "2024-05-13T07:45:00Z",
        Some(500),
    );

    let sessions = sessions_list(
        &state,
        SessionsListPayload {
            book_id: Some(book_id.clone()),
            start: None,
            end: None,
        },
    )
    .unwrap();
    assert_eq!(sessions[0].end_page, Some(120));
    assert_eq!(sessions[0].pages_read, Some(120));

    let books = books_list(&state, BooksListPayload::default()).unwrap();
    assert_eq!(books[0].current_page, 120);
}

#[test]
fn test_weekly_summary_measures_against_current_rate() {
    let (state, _temp_dir) = setup_state();
    profile_onboard(
        &state,
        OnboardingInput {
            display_name: None,
            initial_rate_minutes_per_day: 30,
            end_rate_goal_minutes_per_day: 60,
        },
    )
    .unwrap();
    let book_id = create_book(&state, "Dune", 412);

    log(
        &state,
        Some(&book_id),
        "2024-05-13T07:00:00Z",
        "2024-05-13T07:40:00Z",
        Some(50),
    );
    log(
        &state,
        None,
        "2024-05-14T20:00:00Z",
        "2024-05-14T20:20:00Z",
        None,
    );

    let summary = analytics_weekly_fetch(&state, Some("2024-05-14".to_string())).unwrap();
    assert_eq!(summary.week_start, "2024-05-13");
    assert_eq!(summary.week_end, "2024-05-19");
    assert_eq!(summary.week_starts_on, WeekStart::Monday);
    assert_eq!(summary.days.len(), 7);
    assert_eq!(summary.days[0].minutes, 40);
    assert!(summary.days[0].met_goal);
    assert_eq!(summary.days[1].minutes, 20);
    assert!(!summary.days[1].met_goal);
    assert_eq!(summary.total_minutes, 60);
    assert_eq!(summary.weekly_goal_minutes, 210);
    assert_eq!(summary.days_goal_met, 1);
    assert_eq!(summary.sessions_count, 2);
    assert_eq!(summary.pages_read, 50);
    assert_eq!(summary.current_streak_days, 2);
    assert_eq!(summary.yearly_book_goal, 12);
    assert!((summary.goal_ratio - 0.286).abs() < 1e-9);

    let err = analytics_weekly_fetch(&state, Some("14/05/2024".to_string())).unwrap_err();
    assert_eq!(err.code, "VALIDATION_ERROR");
}

#[test]
fn test_week_start_setting_shifts_summary_window() {
    let (state, _temp_dir) = setup_state();
    let defaults = settings_get(&state).unwrap();
    assert_eq!(defaults.week_starts_on, WeekStart::Monday);

    let updated = settings_update(
        &state,
        SettingsUpdatePayload {
            week_starts_on: Some("sunday".to_string()),
            yearly_book_goal: Some(30),
            reset: None,
        },
    )
    .unwrap();
    assert_eq!(updated.week_starts_on, WeekStart::Sunday);

    let summary = analytics_weekly_fetch(&state, Some("2024-05-14".to_string())).unwrap();
    assert_eq!(summary.week_start, "2024-05-12");
    assert_eq!(summary.yearly_book_goal, 30);
    assert_eq!(summary.weekly_goal_minutes, 0);

    let reset = settings_update(
        &state,
        SettingsUpdatePayload {
            reset: Some(true),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(reset.week_starts_on, WeekStart::Monday);
    assert_eq!(reset.yearly_book_goal, 12);
}

#[test]
fn test_import_search_and_delete() {
    let (state, _temp_dir) = setup_state();
    let imported = books_import(
        &state,
        BookImportInput {
            title: "The Left Hand of Darkness".to_string(),
            authors: vec!["Ursula K. Le Guin".to_string(), " ".to_string()],
            isbn: Some("978-0-441-47812-5".to_string()),
            page_count: Some(304),
            cover_url: None,
        },
    )
    .unwrap();
    assert_eq!(imported.author.as_deref(), Some("Ursula K. Le Guin"));
    assert_eq!(imported.isbn.as_deref(), Some("9780441478125"));

    let duplicate = books_import(
        &state,
        BookImportInput {
            title: "Left Hand (reprint)".to_string(),
            isbn: Some("9780441478125".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(duplicate.code, "CONFLICT");

    create_book(&state, "Dune", 412);
    let hits = books_search(&state, "left hand".to_string()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, imported.id);
    let hits = books_search(&state, "100%".to_string()).unwrap();
    assert!(hits.is_empty());

    let finished = books_update(
        &state,
        imported.id.clone(),
        BookUpdateInput {
            status: Some(BookStatus::Finished),
            rating: Some(Some(5)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(finished.current_page, 304);
    assert!(finished.finished_at.is_some());

    books_delete(&state, imported.id.clone()).unwrap();
    let remaining = books_list(&state, BooksListPayload::default()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].title, "Dune");
}

#[test]
fn test_deleting_book_keeps_its_sessions() {
    let (state, _temp_dir) = setup_state();
    let book_id = create_book(&state, "Dune", 412);
    log(
        &state,
        Some(&book_id),
        "2024-05-13T07:00:00Z",
        "2024-05-13T07:40:00Z",
        Some(20),
    );

    books_delete(&state, book_id).unwrap();
    let sessions = sessions_list(
        &state,
        SessionsListPayload {
            book_id: None,
            start: Some("2024-05-13T00:00:00Z".to_string()),
            end: Some("2024-05-14T00:00:00Z".to_string()),
        },
    )
    .unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].book_id.is_none());
}
