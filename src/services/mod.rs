//! Services for DesaSurat
//!
//! Business logic that belongs neither in the models nor in the database layer.

pub mod docx;
pub mod export;
pub mod letter_service;
pub mod placeholder;

pub use export::{ExportFormat, ExportResult, ExportService, LetterDocument};
pub use letter_service::LetterService;
pub use placeholder::{substitute, unresolved_placeholders, PLACEHOLDERS};
