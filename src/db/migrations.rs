use rusqlite::{params, Connection};
use tracing::info;

use super::schema::{CREATE_TABLES, SCHEMA_VERSION};
use crate::models::LetterTemplate;
use crate::utils::date::timestamp_now;
use crate::utils::error::AppResult;

/// Run every pending migration
pub fn run_migrations(conn: &Connection) -> AppResult<()> {
    let current_version = get_current_version(conn)?;

    if current_version == 0 {
        // Fresh database
        info!("Creating new database with schema version {}", SCHEMA_VERSION);
        initial_setup(conn)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database from version {} to {}",
            current_version, SCHEMA_VERSION
        );
        migrate_from(conn, current_version)?;
    } else {
        info!("Database is up to date (version {})", current_version);
    }

    Ok(())
}

pub fn get_current_version(conn: &Connection) -> AppResult<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;

    Ok(version.unwrap_or(0))
}

fn initial_setup(conn: &Connection) -> AppResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(CREATE_TABLES)?;
    // Singleton row, filled in from the settings screen
    tx.execute("INSERT OR IGNORE INTO village_info (id) VALUES (1)", [])?;
    insert_default_templates(&tx)?;
    tx.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    tx.commit()?;
    info!("Initial setup complete");
    Ok(())
}

fn insert_default_templates(conn: &Connection) -> AppResult<()> {
    let now = timestamp_now();
    let mut stmt = conn.prepare(
        "INSERT INTO letter_templates (letter_type, name, content, is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )?;

    let templates = LetterTemplate::default_templates();
    for template in &templates {
        stmt.execute(params![
            template.letter_type.as_str(),
            template.name,
            template.content,
            template.is_default,
            now,
        ])?;
    }

    info!("Installed {} default letter templates", templates.len());
    Ok(())
}

fn migrate_from(conn: &Connection, from_version: i32) -> AppResult<()> {
    // One transaction per version step
    for version in (from_version + 1)..=SCHEMA_VERSION {
        let tx = conn.unchecked_transaction()?;
        tx.execute("INSERT INTO schema_migrations (version) VALUES (?)", [version])?;
        tx.commit()?;

        info!("Migrated to version {}", version);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_initial_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = table_names(&conn);
        assert!(tables.contains(&"residents".to_string()));
        assert!(tables.contains(&"letters".to_string()));
        assert!(tables.contains(&"letter_templates".to_string()));
        assert!(tables.contains(&"resident_custom_fields".to_string()));

        let defaults: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM letter_templates WHERE is_default = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(defaults as usize, crate::models::LetterType::ALL.len());
    }

    #[test]
    fn test_idempotent_migration() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let templates: i64 = conn
            .query_row("SELECT COUNT(*) FROM letter_templates", [], |row| row.get(0))
            .unwrap();
        assert_eq!(templates as usize, crate::models::LetterType::ALL.len());
    }
}
