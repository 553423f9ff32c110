use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::{lock, SharedConnection};
use crate::models::{Gender, Resident, ResidentUpdate};
use crate::utils::date::{format_db_date, parse_db_date, timestamp_now};
use crate::utils::error::{AppError, AppResult};

const SELECT_COLUMNS: &str = "SELECT id, kk_number, nik, name, birth_place, birth_date, gender,
        address, rt, rw, family_status, religion, occupation, marital_status, education,
        blood_type, disability, father_name, mother_name, photo_path,
        has_ektp, has_birth_certificate, birth_certificate_number,
        has_marriage_certificate, marriage_certificate_number,
        has_divorce_certificate, divorce_certificate_number,
        created_at, updated_at
 FROM residents";

// `id` is ?29 in both statements; binding NULL on insert lets SQLite assign it.
const INSERT_SQL: &str = "INSERT INTO residents (
        kk_number, nik, name, birth_place, birth_date, gender,
        address, rt, rw, family_status, religion, occupation, marital_status, education,
        blood_type, disability, father_name, mother_name, photo_path,
        has_ektp, has_birth_certificate, birth_certificate_number,
        has_marriage_certificate, marriage_certificate_number,
        has_divorce_certificate, divorce_certificate_number,
        created_at, updated_at, id)
 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
         ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)";

const UPDATE_SQL: &str = "UPDATE residents SET
        kk_number = ?1, nik = ?2, name = ?3, birth_place = ?4, birth_date = ?5, gender = ?6,
        address = ?7, rt = ?8, rw = ?9, family_status = ?10, religion = ?11,
        occupation = ?12, marital_status = ?13, education = ?14,
        blood_type = ?15, disability = ?16, father_name = ?17, mother_name = ?18,
        photo_path = ?19, has_ektp = ?20, has_birth_certificate = ?21,
        birth_certificate_number = ?22, has_marriage_certificate = ?23,
        marriage_certificate_number = ?24, has_divorce_certificate = ?25,
        divorce_certificate_number = ?26, created_at = ?27, updated_at = ?28
 WHERE id = ?29";

pub struct ResidentRepository {
    conn: SharedConnection,
}

impl ResidentRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// All residents ordered by name
    pub fn find_all(&self) -> AppResult<Vec<Resident>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY name, id"))?;

        let residents = stmt
            .query_map([], Self::row_to_resident)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(residents)
    }

    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Resident>> {
        let conn = lock(&self.conn)?;
        Self::find_in(&conn, id)
    }

    /// Residents with the given NIK. NIK is not unique in the store, so
    /// this can return more than one record.
    pub fn find_by_nik(&self, nik: &str) -> AppResult<Vec<Resident>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE nik = ? ORDER BY id"))?;

        let residents = stmt
            .query_map([nik], Self::row_to_resident)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(residents)
    }

    /// Members of one family card
    pub fn find_by_kk(&self, kk_number: &str) -> AppResult<Vec<Resident>> {
        let conn = lock(&self.conn)?;
        let mut stmt =
            conn.prepare(&format!("{SELECT_COLUMNS} WHERE kk_number = ? ORDER BY id"))?;

        let residents = stmt
            .query_map([kk_number], Self::row_to_resident)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(residents)
    }

    /// Case-insensitive substring search on name, substring search on NIK.
    /// An empty query returns everyone.
    pub fn search(&self, query: &str) -> AppResult<Vec<Resident>> {
        let query = query.trim();
        let residents = self.find_all()?;
        if query.is_empty() {
            return Ok(residents);
        }

        let needle = query.to_lowercase();
        Ok(residents
            .into_iter()
            .filter(|r| r.name.to_lowercase().contains(&needle) || r.nik.contains(query))
            .collect())
    }

    /// Add a resident. NIK uniqueness is not checked.
    pub fn create(&self, resident: &mut Resident) -> AppResult<i64> {
        resident.validate()?;

        let now = timestamp_now();
        resident.id = None;
        resident.created_at = Some(now.clone());
        resident.updated_at = Some(now);

        let conn = lock(&self.conn)?;
        Self::write(&conn, INSERT_SQL, resident)?;

        let id = conn.last_insert_rowid();
        resident.id = Some(id);

        info!("Added resident {} ({})", id, resident.name);
        Ok(id)
    }

    /// Merge the given fields into the stored resident
    pub fn update(&self, id: i64, update: ResidentUpdate) -> AppResult<Resident> {
        let conn = lock(&self.conn)?;

        let mut resident = Self::find_in(&conn, id)?
            .ok_or_else(|| AppError::not_found(format!("Resident with ID {}", id)))?;

        update.apply_to(&mut resident);
        resident.validate()?;
        resident.updated_at = Some(timestamp_now());

        Self::write(&conn, UPDATE_SQL, &resident)?;
        Ok(resident)
    }

    /// Delete a resident. Refused while any letter references it.
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM residents WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::not_found(format!("Resident with ID {}", id)));
        }

        // Letters keep their resident for life
        let letters: i64 = tx.query_row(
            "SELECT COUNT(*) FROM letters WHERE resident_id = ?",
            [id],
            |row| row.get(0),
        )?;
        if letters > 0 {
            return Err(AppError::ResidentHasLetters {
                resident_id: id,
                count: letters,
            });
        }

        tx.execute("DELETE FROM residents WHERE id = ?", [id])?;
        tx.commit()?;

        info!("Deleted resident {}", id);
        Ok(())
    }

    pub fn count(&self) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM residents", [], |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn find_in(conn: &Connection, id: i64) -> AppResult<Option<Resident>> {
        let resident = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?"),
                [id],
                Self::row_to_resident,
            )
            .optional()?;
        Ok(resident)
    }

    fn write(conn: &Connection, sql: &str, r: &Resident) -> rusqlite::Result<usize> {
        conn.execute(
            sql,
            params![
                r.kk_number,
                r.nik,
                r.name,
                r.birth_place,
                r.birth_date.map(format_db_date),
                r.gender.to_string(),
                r.address,
                r.rt,
                r.rw,
                r.family_status,
                r.religion,
                r.occupation,
                r.marital_status,
                r.education,
                r.blood_type,
                r.disability,
                r.father_name,
                r.mother_name,
                r.photo_path,
                r.has_ektp,
                r.has_birth_certificate,
                r.birth_certificate_number,
                r.has_marriage_certificate,
                r.marriage_certificate_number,
                r.has_divorce_certificate,
                r.divorce_certificate_number,
                r.created_at,
                r.updated_at,
                r.id,
            ],
        )
    }

    fn row_to_resident(row: &Row) -> rusqlite::Result<Resident> {
        Ok(Resident {
            id: row.get(0)?,
            kk_number: row.get(1)?,
            nik: row.get(2)?,
            name: row.get(3)?,
            birth_place: row.get(4)?,
            birth_date: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| parse_db_date(&s)),
            gender: Gender::from_db_str(&row.get::<_, String>(6)?),
            address: row.get(7)?,
            rt: row.get(8)?,
            rw: row.get(9)?,
            family_status: row.get(10)?,
            religion: row.get(11)?,
            occupation: row.get(12)?,
            marital_status: row.get(13)?,
            education: row.get(14)?,
            blood_type: row.get(15)?,
            disability: row.get(16)?,
            father_name: row.get(17)?,
            mother_name: row.get(18)?,
            photo_path: row.get(19)?,
            has_ektp: row.get(20)?,
            has_birth_certificate: row.get(21)?,
            birth_certificate_number: row.get(22)?,
            has_marriage_certificate: row.get(23)?,
            marriage_certificate_number: row.get(24)?,
            has_divorce_certificate: row.get(25)?,
            divorce_certificate_number: row.get(26)?,
            created_at: row.get(27)?,
            updated_at: row.get(28)?,
        })
    }
}
