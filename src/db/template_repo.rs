//! Letter templates and the default-template authority.
//!
//! Every change to `is_default` goes through [`TemplateRepository::claim_default`]
//! inside the transaction of the operation that needs it, so readers never
//! see two defaults for one letter type. The partial unique index
//! `idx_templates_single_default` backs this up at the store level.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{letter_type_column, lock, SharedConnection};
use crate::models::{LetterTemplate, LetterType, TemplateUpdate};
use crate::utils::date::timestamp_now;
use crate::utils::error::{AppError, AppResult};

const SELECT_COLUMNS: &str = "SELECT id, letter_type, name, content, is_default, created_at, updated_at
 FROM letter_templates";

pub struct TemplateRepository {
    conn: SharedConnection,
}

impl TemplateRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Make `owner` the only default of `letter_type`
    fn claim_default(conn: &Connection, letter_type: LetterType, owner: i64) -> AppResult<()> {
        let now = timestamp_now();

        let cleared = conn.execute(
            "UPDATE letter_templates SET is_default = 0, updated_at = ?1
             WHERE letter_type = ?2 AND is_default = 1 AND id != ?3",
            params![now, letter_type.as_str(), owner],
        )?;
        conn.execute(
            "UPDATE letter_templates SET is_default = 1 WHERE id = ?1",
            [owner],
        )?;

        if cleared > 0 {
            info!(
                "Template {} is now the default for {} ({} previous default cleared)",
                owner, letter_type, cleared
            );
        }
        Ok(())
    }

    /// Lowest-id template of `letter_type` other than `exclude_id`
    fn first_sibling(
        conn: &Connection,
        letter_type: LetterType,
        exclude_id: i64,
    ) -> AppResult<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM letter_templates WHERE letter_type = ?1 AND id != ?2
                 ORDER BY id LIMIT 1",
                params![letter_type.as_str(), exclude_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn count_in(conn: &Connection, letter_type: LetterType) -> AppResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM letter_templates WHERE letter_type = ?",
            [letter_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Add a template. A new default replaces the type's current default.
    pub fn create(&self, template: &mut LetterTemplate) -> AppResult<i64> {
        if template.name.trim().is_empty() {
            template.name = template.letter_type.display_name().to_string();
        }

        let now = timestamp_now();
        template.created_at = Some(now.clone());
        template.updated_at = Some(now);

        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO letter_templates (letter_type, name, content, is_default, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5)",
            params![
                template.letter_type.as_str(),
                template.name,
                template.content,
                template.created_at,
                template.updated_at,
            ],
        )?;
        let id = tx.last_insert_rowid();

        if template.is_default {
            Self::claim_default(&tx, template.letter_type, id)?;
        }

        tx.commit()?;

        template.id = Some(id);
        Ok(id)
    }

    /// Merge the given fields into the stored template.
    ///
    /// Moving a template to another letter type is refused when it is the
    /// last template of its old type; a moved default hands its role to
    /// the first remaining sibling.
    pub fn update(&self, id: i64, update: TemplateUpdate) -> AppResult<LetterTemplate> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        let mut template = Self::find_in(&tx, id)?
            .ok_or_else(|| AppError::not_found(format!("Template with ID {}", id)))?;
        let old_type = template.letter_type;
        let was_default = template.is_default;

        update.apply_to(&mut template);
        if template.name.trim().is_empty() {
            template.name = template.letter_type.display_name().to_string();
        }
        template.updated_at = Some(timestamp_now());

        let type_changed = template.letter_type != old_type;
        if type_changed && Self::count_in(&tx, old_type)? <= 1 {
            return Err(AppError::LastTemplate {
                letter_type: old_type,
            });
        }

        // Flag is restored below, after the old default of the new type is cleared
        tx.execute(
            "UPDATE letter_templates SET
                letter_type = ?1, name = ?2, content = ?3, is_default = 0, updated_at = ?4
             WHERE id = ?5",
            params![
                template.letter_type.as_str(),
                template.name,
                template.content,
                template.updated_at,
                id,
            ],
        )?;

        if template.is_default {
            Self::claim_default(&tx, template.letter_type, id)?;
        }
        if type_changed && was_default {
            if let Some(sibling) = Self::first_sibling(&tx, old_type, id)? {
                Self::claim_default(&tx, old_type, sibling)?;
            }
        }

        tx.commit()?;
        Ok(template)
    }

    /// Make the template the default of its type
    pub fn set_default(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        let template = Self::find_in(&tx, id)?
            .ok_or_else(|| AppError::not_found(format!("Template with ID {}", id)))?;
        Self::claim_default(&tx, template.letter_type, id)?;

        tx.commit()?;
        Ok(())
    }

    /// Delete a template. The last template of a type cannot be deleted;
    /// deleting a default promotes the first remaining sibling.
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        let template = Self::find_in(&tx, id)?
            .ok_or_else(|| AppError::not_found(format!("Template with ID {}", id)))?;

        if Self::count_in(&tx, template.letter_type)? <= 1 {
            return Err(AppError::LastTemplate {
                letter_type: template.letter_type,
            });
        }

        // Hand over the default before the row disappears
        if template.is_default {
            if let Some(sibling) = Self::first_sibling(&tx, template.letter_type, id)? {
                Self::claim_default(&tx, template.letter_type, sibling)?;
            }
        }

        tx.execute("DELETE FROM letter_templates WHERE id = ?", [id])?;
        tx.commit()?;

        info!("Deleted template {} ({})", id, template.letter_type);
        Ok(())
    }

    /// The default template of a type. `None` is a valid state.
    pub fn find_default_by_type(
        &self,
        letter_type: LetterType,
    ) -> AppResult<Option<LetterTemplate>> {
        let conn = lock(&self.conn)?;
        let template = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE letter_type = ? AND is_default = 1"),
                [letter_type.as_str()],
                Self::row_to_template,
            )
            .optional()?;
        Ok(template)
    }

    pub fn find_by_id(&self, id: i64) -> AppResult<Option<LetterTemplate>> {
        let conn = lock(&self.conn)?;
        Self::find_in(&conn, id)
    }

    pub fn find_all(&self) -> AppResult<Vec<LetterTemplate>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY letter_type, id"))?;
        let templates = stmt
            .query_map([], Self::row_to_template)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    pub fn find_by_type(&self, letter_type: LetterType) -> AppResult<Vec<LetterTemplate>> {
        let conn = lock(&self.conn)?;
        let mut stmt =
            conn.prepare(&format!("{SELECT_COLUMNS} WHERE letter_type = ? ORDER BY id"))?;
        let templates = stmt
            .query_map([letter_type.as_str()], Self::row_to_template)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    pub fn count_by_type(&self, letter_type: LetterType) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        Self::count_in(&conn, letter_type)
    }

    fn find_in(conn: &Connection, id: i64) -> AppResult<Option<LetterTemplate>> {
        let template = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?"),
                [id],
                Self::row_to_template,
            )
            .optional()?;
        Ok(template)
    }

    fn row_to_template(row: &Row) -> rusqlite::Result<LetterTemplate> {
        Ok(LetterTemplate {
            id: row.get(0)?,
            letter_type: letter_type_column(row, 1)?,
            name: row.get(2)?,
            content: row.get(3)?,
            is_default: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn defaults_of(db: &Database, letter_type: LetterType) -> Vec<LetterTemplate> {
        db.templates()
            .find_by_type(letter_type)
            .unwrap()
            .into_iter()
            .filter(|t| t.is_default)
            .collect()
    }

    fn add(db: &Database, letter_type: LetterType, content: &str, is_default: bool) -> i64 {
        let mut template = LetterTemplate::new(letter_type, content);
        template.is_default = is_default;
        db.templates().create(&mut template).unwrap()
    }

    #[test]
    fn test_seeded_defaults() {
        let db = setup_db();
        for letter_type in LetterType::ALL {
            assert_eq!(defaults_of(&db, *letter_type).len(), 1);
            assert!(db
                .templates()
                .find_default_by_type(*letter_type)
                .unwrap()
                .is_some());
        }
    }

    #[test]
    fn test_new_default_replaces_old() {
        let db = setup_db();

        add(&db, LetterType::Domicile, "kedua", true);
        let third = add(&db, LetterType::Domicile, "ketiga", true);
        add(&db, LetterType::Domicile, "keempat", false);

        let defaults = defaults_of(&db, LetterType::Domicile);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, Some(third));

        // other types are untouched
        assert_eq!(defaults_of(&db, LetterType::Poverty).len(), 1);
    }

    #[test]
    fn test_update_default_keeps_single_default() {
        let db = setup_db();
        let repo = db.templates();

        let id = add(&db, LetterType::Business, "usaha", false);
        let updated = repo
            .update(
                id,
                TemplateUpdate {
                    is_default: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.is_default);

        // updating the default while it stays default changes nothing else
        repo.update(
            id,
            TemplateUpdate {
                content: Some("usaha baru".into()),
                is_default: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let defaults = defaults_of(&db, LetterType::Business);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, Some(id));
        assert_eq!(defaults[0].content, "usaha baru");
    }

    #[test]
    fn test_delete_last_template_is_rejected() {
        let db = setup_db();
        let repo = db.templates();

        let only = repo.find_by_type(LetterType::Birth).unwrap();
        assert_eq!(only.len(), 1);

        let err = repo.delete(only[0].id.unwrap()).unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(
            err,
            AppError::LastTemplate {
                letter_type: LetterType::Birth
            }
        ));
        assert_eq!(repo.count_by_type(LetterType::Birth).unwrap(), 1);
    }

    #[test]
    fn test_delete_non_default_keeps_default() {
        let db = setup_db();
        let repo = db.templates();

        let default_id = repo
            .find_default_by_type(LetterType::Poverty)
            .unwrap()
            .unwrap()
            .id
            .unwrap();
        let extra = add(&db, LetterType::Poverty, "cadangan", false);

        repo.delete(extra).unwrap();

        let defaults = defaults_of(&db, LetterType::Poverty);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, Some(default_id));
    }

    #[test]
    fn test_delete_default_promotes_sibling() {
        let db = setup_db();
        let repo = db.templates();

        let seeded = repo
            .find_default_by_type(LetterType::Keramaian)
            .unwrap()
            .unwrap()
            .id
            .unwrap();
        let second = add(&db, LetterType::Keramaian, "b", false);
        let third = add(&db, LetterType::Keramaian, "c", false);

        repo.delete(seeded).unwrap();

        let defaults = defaults_of(&db, LetterType::Keramaian);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, Some(second));
        assert!(repo.find_by_id(third).unwrap().is_some());
        assert!(repo.find_by_id(seeded).unwrap().is_none());
    }

    #[test]
    fn test_set_default() {
        let db = setup_db();
        let repo = db.templates();

        let id = add(&db, LetterType::WaliNikah, "wali", false);
        repo.set_default(id).unwrap();

        let default = repo.find_default_by_type(LetterType::WaliNikah).unwrap().unwrap();
        assert_eq!(default.id, Some(id));
        assert_eq!(defaults_of(&db, LetterType::WaliNikah).len(), 1);
        assert!(repo.set_default(9999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_no_default_is_valid() {
        let db = setup_db();
        let repo = db.templates();

        let seeded = repo.find_default_by_type(LetterType::Custom).unwrap().unwrap();
        repo.update(
            seeded.id.unwrap(),
            TemplateUpdate {
                is_default: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(repo.find_default_by_type(LetterType::Custom).unwrap().is_none());
    }

    #[test]
    fn test_type_change_moves_default_role() {
        let db = setup_db();
        let repo = db.templates();

        let seeded = repo.find_default_by_type(LetterType::Introduction).unwrap().unwrap();
        let sibling = add(&db, LetterType::Introduction, "pengantar 2", false);

        let moved = repo
            .update(
                seeded.id.unwrap(),
                TemplateUpdate {
                    letter_type: Some(LetterType::Custom),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(moved.letter_type, LetterType::Custom);

        let intro_default = repo.find_default_by_type(LetterType::Introduction).unwrap().unwrap();
        assert_eq!(intro_default.id, Some(sibling));
        assert_eq!(defaults_of(&db, LetterType::Custom).len(), 1);
        assert_eq!(
            repo.find_default_by_type(LetterType::Custom).unwrap().unwrap().id,
            seeded.id
        );
    }

    #[test]
    fn test_type_change_of_last_template_is_rejected() {
        let db = setup_db();
        let repo = db.templates();

        let only = repo.find_default_by_type(LetterType::Birth).unwrap().unwrap();
        let err = repo
            .update(
                only.id.unwrap(),
                TemplateUpdate {
                    letter_type: Some(LetterType::Custom),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.count_by_type(LetterType::Birth).unwrap(), 1);
    }

    #[test]
    fn test_delete_missing_template() {
        let db = setup_db();
        assert!(db.templates().delete(404).unwrap_err().is_not_found());
    }

    #[test]
    fn test_concurrent_defaults_leave_one() {
        let db = setup_db();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let mut template =
                        LetterTemplate::new(LetterType::Keramaian, format!("Isi {}", i));
                    template.is_default = true;
                    db.templates().create(&mut template).unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Seeded template plus eight new ones, exactly one default
        assert_eq!(db.templates().count_by_type(LetterType::Keramaian).unwrap(), 9);
        assert_eq!(defaults_of(&db, LetterType::Keramaian).len(), 1);
    }
}
