//! DesaSurat - village population records and administrative letters
//!
//! Residents, numbered letters generated from templates, and PDF/DOCX export,
//! stored in a local SQLite database.

pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-exports
pub use db::Database;
pub use models::*;
pub use utils::error::{AppError, AppResult};
