pub mod requests;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use requests::{delete, get, post_json, read_json};
pub use setup::TestApp;
