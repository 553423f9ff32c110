pub mod schema;
pub mod migrations;
pub mod resident_repo;
pub mod letter_repo;
pub mod template_repo;
pub mod custom_field_repo;
pub mod village_repo;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::utils::error::{AppError, AppResult};

pub use resident_repo::ResidentRepository;
pub use letter_repo::{LetterRepository, LetterStatistics};
pub use template_repo::TemplateRepository;
pub use custom_field_repo::CustomFieldRepository;
pub use village_repo::VillageRepository;

/// Shared connection handle used by every repository
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Take the connection lock. Every multi-step invariant runs while
/// this guard is held.
pub(crate) fn lock(conn: &SharedConnection) -> AppResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| AppError::LockPoisoned)
}

/// Row value that does not map onto a model type
pub(crate) fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(AppError::Other(message)),
    )
}

/// Parse a stored letter type tag
pub(crate) fn letter_type_column(
    row: &rusqlite::Row,
    column: usize,
) -> rusqlite::Result<crate::models::LetterType> {
    let raw: String = row.get(column)?;
    crate::models::LetterType::from_db_str(&raw)
        .ok_or_else(|| conversion_error(column, format!("Unknown letter type '{}'", raw)))
}

/// Main database wrapper with thread-safe access
pub struct Database {
    conn: SharedConnection,
}

impl Database {
    /// Open or create a database file
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests)
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    pub fn migrate(&self) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        migrations::run_migrations(&conn)
    }

    pub fn residents(&self) -> ResidentRepository {
        ResidentRepository::new(Arc::clone(&self.conn))
    }

    pub fn letters(&self) -> LetterRepository {
        LetterRepository::new(Arc::clone(&self.conn))
    }

    pub fn templates(&self) -> TemplateRepository {
        TemplateRepository::new(Arc::clone(&self.conn))
    }

    pub fn custom_fields(&self) -> CustomFieldRepository {
        CustomFieldRepository::new(Arc::clone(&self.conn))
    }

    pub fn village(&self) -> VillageRepository {
        VillageRepository::new(Arc::clone(&self.conn))
    }

    /// Direct access to the connection (for advanced operations)
    pub fn with_connection<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = lock(&self.conn)?;
        f(&conn)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
