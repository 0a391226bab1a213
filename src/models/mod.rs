pub mod analytics;
pub mod book;
pub mod profile;
pub mod progress;
pub mod session;
pub mod settings;
