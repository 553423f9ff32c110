//! Repository for administrator-defined resident fields

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{lock, SharedConnection};
use crate::models::{CustomField, CustomFieldType, ResidentCustomField};
use crate::utils::date::timestamp_now;
use crate::utils::error::{AppError, AppResult};

pub struct CustomFieldRepository {
    conn: SharedConnection,
}

impl CustomFieldRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    // === Field schema ===

    pub fn list_fields(&self) -> AppResult<Vec<CustomField>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, name, field_type, options, required, created_at, updated_at
             FROM custom_fields ORDER BY name",
        )?;

        let fields = stmt
            .query_map([], Self::row_to_field)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(fields)
    }

    pub fn find_field(&self, id: i64) -> AppResult<Option<CustomField>> {
        let conn = lock(&self.conn)?;
        Self::find_field_in(&conn, id)
    }

    pub fn create_field(&self, field: &mut CustomField) -> AppResult<i64> {
        field.validate()?;

        let now = timestamp_now();
        field.created_at = Some(now.clone());
        field.updated_at = Some(now);

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO custom_fields (name, field_type, options, required, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                field.name.trim(),
                field.field_type.to_string(),
                field.options,
                field.required,
                field.created_at,
                field.updated_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        field.id = Some(id);
        Ok(id)
    }

    pub fn update_field(&self, field: &mut CustomField) -> AppResult<()> {
        let id = field
            .id
            .ok_or_else(|| AppError::validation("Custom field has no ID"))?;
        field.validate()?;
        field.updated_at = Some(timestamp_now());

        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE custom_fields SET
                name = ?1, field_type = ?2, options = ?3, required = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                field.name.trim(),
                field.field_type.to_string(),
                field.options,
                field.required,
                field.updated_at,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Custom field with ID {}", id)));
        }
        Ok(())
    }

    /// Delete a field together with every resident value for it
    pub fn delete_field(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM custom_fields WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Custom field with ID {}", id)));
        }
        Ok(())
    }

    // === Resident values ===

    pub fn values_for_resident(&self, resident_id: i64) -> AppResult<Vec<ResidentCustomField>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT v.id, v.resident_id, v.custom_field_id, v.value, v.created_at, v.updated_at
             FROM resident_custom_fields v
             INNER JOIN custom_fields f ON f.id = v.custom_field_id
             WHERE v.resident_id = ?
             ORDER BY f.name",
        )?;

        let values = stmt
            .query_map([resident_id], Self::row_to_value)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values)
    }

    pub fn get_value(
        &self,
        resident_id: i64,
        custom_field_id: i64,
    ) -> AppResult<Option<ResidentCustomField>> {
        let conn = lock(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT id, resident_id, custom_field_id, value, created_at, updated_at
                 FROM resident_custom_fields
                 WHERE resident_id = ?1 AND custom_field_id = ?2",
                params![resident_id, custom_field_id],
                Self::row_to_value,
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value of one field for one resident
    pub fn set_value(
        &self,
        resident_id: i64,
        custom_field_id: i64,
        value: &str,
    ) -> AppResult<ResidentCustomField> {
        let conn = lock(&self.conn)?;

        let resident_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM residents WHERE id = ?)",
            [resident_id],
            |row| row.get(0),
        )?;
        if !resident_exists {
            return Err(AppError::not_found(format!("Resident with ID {}", resident_id)));
        }

        let field = Self::find_field_in(&conn, custom_field_id)?.ok_or_else(|| {
            AppError::not_found(format!("Custom field with ID {}", custom_field_id))
        })?;
        field.validate_value(value)?;

        let now = timestamp_now();
        conn.execute(
            "INSERT INTO resident_custom_fields (resident_id, custom_field_id, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (resident_id, custom_field_id)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![resident_id, custom_field_id, value.trim(), now],
        )?;

        let stored = conn.query_row(
            "SELECT id, resident_id, custom_field_id, value, created_at, updated_at
             FROM resident_custom_fields
             WHERE resident_id = ?1 AND custom_field_id = ?2",
            params![resident_id, custom_field_id],
            Self::row_to_value,
        )?;
        Ok(stored)
    }

    pub fn delete_value(&self, resident_id: i64, custom_field_id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "DELETE FROM resident_custom_fields WHERE resident_id = ?1 AND custom_field_id = ?2",
            params![resident_id, custom_field_id],
        )?;
        Ok(())
    }

    fn find_field_in(conn: &Connection, id: i64) -> AppResult<Option<CustomField>> {
        let field = conn
            .query_row(
                "SELECT id, name, field_type, options, required, created_at, updated_at
                 FROM custom_fields WHERE id = ?",
                [id],
                Self::row_to_field,
            )
            .optional()?;
        Ok(field)
    }

    fn row_to_field(row: &Row) -> rusqlite::Result<CustomField> {
        Ok(CustomField {
            id: row.get(0)?,
            name: row.get(1)?,
            field_type: CustomFieldType::from_db_str(&row.get::<_, String>(2)?),
            options: row.get(3)?,
            required: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn row_to_value(row: &Row) -> rusqlite::Result<ResidentCustomField> {
        Ok(ResidentCustomField {
            id: row.get(0)?,
            resident_id: row.get(1)?,
            custom_field_id: row.get(2)?,
            value: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}
