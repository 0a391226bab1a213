pub mod analytics_service;
pub mod book_service;
pub mod goal_progress_service;
pub mod profile_service;
pub mod session_service;
pub mod settings_service;
