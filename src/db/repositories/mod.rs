pub mod book_repository;
pub mod profile_repository;
pub mod progress_repository;
pub mod session_repository;
pub mod settings_repository;
