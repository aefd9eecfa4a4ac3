// Public API - what other modules can use
pub use handlers::{create_score, delete_score, get_score, list_scores, score_history};
pub use service::ScoreService;

// Internal modules
mod handlers;
pub mod history;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;
pub mod types;
