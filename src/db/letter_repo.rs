//! Letters and the letter-numbering authority

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info};

use super::{conversion_error, letter_type_column, lock, SharedConnection};
use crate::models::{format_letter_number, Letter, LetterStatus, LetterType, LetterUpdate};
use crate::utils::date::{format_db_date, parse_db_date, timestamp_now, today};
use crate::utils::error::{AppError, AppResult};

const SELECT_COLUMNS: &str = "SELECT l.id, l.letter_number, l.letter_type, l.resident_id, l.title,
        l.content, l.purpose, l.issued_date, l.status, l.created_at, l.updated_at
 FROM letters l";

const NEWEST_FIRST: &str = "ORDER BY l.issued_date DESC, l.id DESC";

/// Letter counts for the dashboard
#[derive(Debug, Clone, Default, Serialize)]
pub struct LetterStatistics {
    pub total: i64,
    pub by_type: Vec<(LetterType, i64)>,
    pub by_status: Vec<(LetterStatus, i64)>,
}

impl LetterStatistics {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn count_for_type(&self, letter_type: LetterType) -> i64 {
        self.by_type
            .iter()
            .find(|(t, _)| *t == letter_type)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

pub struct LetterRepository {
    conn: SharedConnection,
}

impl LetterRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    // === Numbering ===

    /// Next letter number for `letter_type`, dated by the system clock
    pub fn generate_letter_number(&self, letter_type: LetterType) -> AppResult<String> {
        self.generate_letter_number_on(letter_type, today())
    }

    /// Next letter number for `letter_type` as of `date`.
    ///
    /// The sequence restarts every year (not every month, even though the
    /// month is printed): it is the number of letters of this type issued
    /// in `date`'s year plus one.
    pub fn generate_letter_number_on(
        &self,
        letter_type: LetterType,
        date: NaiveDate,
    ) -> AppResult<String> {
        let conn = lock(&self.conn)?;
        Self::next_number(&conn, letter_type, date)
    }

    /// Must run under the connection lock, in the same transaction as the
    /// insert that consumes the number.
    fn next_number(
        conn: &Connection,
        letter_type: LetterType,
        date: NaiveDate,
    ) -> AppResult<String> {
        let year = date.year();
        let issued = Self::count_in_year(conn, letter_type, year)?;

        // count + 1 only collides when a letter of this year was deleted
        let mut sequence = issued as u32 + 1;
        loop {
            let candidate = format_letter_number(sequence, letter_type, date);
            if !Self::number_taken(conn, letter_type, year, &candidate, None)? {
                debug!("Generated letter number {}", candidate);
                return Ok(candidate);
            }
            sequence += 1;
        }
    }

    fn count_in_year(conn: &Connection, letter_type: LetterType, year: i32) -> AppResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM letters
             WHERE letter_type = ?1 AND substr(issued_date, 1, 4) = ?2",
            params![letter_type.as_str(), format!("{:04}", year)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn number_taken(
        conn: &Connection,
        letter_type: LetterType,
        year: i32,
        letter_number: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<bool> {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM letters
             WHERE letter_type = ?1 AND substr(issued_date, 1, 4) = ?2
               AND letter_number = ?3 AND (?4 IS NULL OR id != ?4))",
            params![letter_type.as_str(), format!("{:04}", year), letter_number, exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn ensure_resident(conn: &Connection, resident_id: i64) -> AppResult<()> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM residents WHERE id = ?)",
            [resident_id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Resident with ID {}", resident_id)))
        }
    }

    /// Assign a number when none is given, otherwise make sure the given
    /// one is free within (type, issued year).
    fn assign_number(conn: &Connection, letter: &mut Letter) -> AppResult<()> {
        let number = letter.letter_number.trim().to_string();

        if number.is_empty() {
            letter.letter_number = Self::next_number(conn, letter.letter_type, letter.issued_date)?;
            info!("Assigned letter number {}", letter.letter_number);
            return Ok(());
        }

        if Self::number_taken(conn, letter.letter_type, letter.issued_year(), &number, letter.id)? {
            return Err(AppError::DuplicateLetterNumber {
                letter_number: number,
            });
        }

        letter.letter_number = number;
        Ok(())
    }

    // === Letters ===

    /// Add a letter. The number is generated against the letter's issued
    /// date when the caller left it empty.
    pub fn create(&self, letter: &mut Letter) -> AppResult<i64> {
        letter.validate()?;

        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        Self::ensure_resident(&tx, letter.resident_id)?;
        // Number is checked and inserted under the same lock
        letter.id = None;
        Self::assign_number(&tx, letter)?;

        let now = timestamp_now();
        letter.created_at = Some(now.clone());
        letter.updated_at = Some(now);

        tx.execute(
            "INSERT INTO letters (letter_number, letter_type, resident_id, title, content,
                                  purpose, issued_date, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                letter.letter_number,
                letter.letter_type.as_str(),
                letter.resident_id,
                letter.title,
                letter.content,
                letter.purpose,
                format_db_date(letter.issued_date),
                letter.status.as_str(),
                letter.created_at,
                letter.updated_at,
            ],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;

        letter.id = Some(id);
        Ok(id)
    }

    /// Merge the given fields into the stored letter
    pub fn update(&self, id: i64, update: LetterUpdate) -> AppResult<Letter> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction()?;

        let mut letter = Self::find_in(&tx, id)?
            .ok_or_else(|| AppError::not_found(format!("Letter with ID {}", id)))?;

        update.apply_to(&mut letter);
        letter.validate()?;
        Self::ensure_resident(&tx, letter.resident_id)?;
        // Cleared number means regenerate
        Self::assign_number(&tx, &mut letter)?;
        letter.updated_at = Some(timestamp_now());

        tx.execute(
            "UPDATE letters SET
                letter_number = ?1, letter_type = ?2, resident_id = ?3, title = ?4,
                content = ?5, purpose = ?6, issued_date = ?7, status = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                letter.letter_number,
                letter.letter_type.as_str(),
                letter.resident_id,
                letter.title,
                letter.content,
                letter.purpose,
                format_db_date(letter.issued_date),
                letter.status.as_str(),
                letter.updated_at,
                id,
            ],
        )?;

        tx.commit()?;
        Ok(letter)
    }

    /// Any status may follow any other
    pub fn set_status(&self, id: i64, status: LetterStatus) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE letters SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), timestamp_now(), id],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Letter with ID {}", id)));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM letters WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Letter with ID {}", id)));
        }

        info!("Deleted letter {}", id);
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Letter>> {
        let conn = lock(&self.conn)?;
        Self::find_in(&conn, id)
    }

    /// Newest first
    pub fn find_all(&self) -> AppResult<Vec<Letter>> {
        self.query(
            &format!("{SELECT_COLUMNS} {NEWEST_FIRST}"),
            &[],
        )
    }

    pub fn find_by_resident(&self, resident_id: i64) -> AppResult<Vec<Letter>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE l.resident_id = ?1 {NEWEST_FIRST}"),
            &[&resident_id],
        )
    }

    pub fn find_by_type(&self, letter_type: LetterType) -> AppResult<Vec<Letter>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE l.letter_type = ?1 {NEWEST_FIRST}"),
            &[&letter_type.as_str()],
        )
    }

    /// Match on letter number, title or resident name
    pub fn search(&self, query: &str) -> AppResult<Vec<Letter>> {
        let query = query.trim();
        if query.is_empty() {
            return self.find_all();
        }

        let pattern = format!("%{}%", query);
        self.query(
            &format!(
                "{SELECT_COLUMNS}
                 INNER JOIN residents r ON r.id = l.resident_id
                 WHERE l.letter_number LIKE ?1 OR l.title LIKE ?1 OR r.name LIKE ?1
                 ORDER BY l.issued_date DESC, l.id DESC"
            ),
            &[&pattern],
        )
    }

    pub fn count(&self) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM letters", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_by_resident(&self, resident_id: i64) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM letters WHERE resident_id = ?",
            [resident_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_by_type_in_year(&self, letter_type: LetterType, year: i32) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        Self::count_in_year(&conn, letter_type, year)
    }

    pub fn statistics(&self) -> AppResult<LetterStatistics> {
        let conn = lock(&self.conn)?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM letters", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT letter_type, COUNT(*) FROM letters GROUP BY letter_type ORDER BY letter_type",
        )?;
        let by_type = stmt
            .query_map([], |row| Ok((letter_type_column(row, 0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM letters GROUP BY status ORDER BY status")?;
        let by_status = stmt
            .query_map([], |row| {
                Ok((LetterStatus::from_db_str(&row.get::<_, String>(0)?), row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LetterStatistics {
            total,
            by_type,
            by_status,
        })
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> AppResult<Vec<Letter>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(sql)?;
        let letters = stmt
            .query_map(params, Self::row_to_letter)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(letters)
    }

    fn find_in(conn: &Connection, id: i64) -> AppResult<Option<Letter>> {
        let letter = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE l.id = ?"),
                [id],
                Self::row_to_letter,
            )
            .optional()?;
        Ok(letter)
    }

    fn row_to_letter(row: &Row) -> rusqlite::Result<Letter> {
        let issued_raw: String = row.get(7)?;
        let issued_date = parse_db_date(&issued_raw)
            .ok_or_else(|| conversion_error(7, format!("Invalid issued date '{}'", issued_raw)))?;

        Ok(Letter {
            id: row.get(0)?,
            letter_number: row.get(1)?,
            letter_type: letter_type_column(row, 2)?,
            resident_id: row.get(3)?,
            title: row.get(4)?,
            content: row.get(5)?,
            purpose: row.get(6)?,
            issued_date,
            status: LetterStatus::from_db_str(&row.get::<_, String>(8)?),
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{parse_sequence, Resident};
    use regex::Regex;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let mut resident = Resident::new("3201010101900001", "3201010101900000", "Budi");
        let id = db.residents().create(&mut resident).unwrap();
        (db, id)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add(
        db: &Database,
        letter_type: LetterType,
        resident_id: i64,
        issued: NaiveDate,
    ) -> Letter {
        let mut letter = Letter::new(letter_type, resident_id, issued);
        db.letters().create(&mut letter).unwrap();
        letter
    }

    #[test]
    fn test_generated_number_format() {
        let (db, resident_id) = setup();
        let pattern = Regex::new(r"^\d{3}/[A-Z-]+/\d{2}/\d{4}$").unwrap();

        for letter_type in LetterType::ALL {
            let letter = add(&db, *letter_type, resident_id, today());
            assert!(
                pattern.is_match(&letter.letter_number),
                "unexpected number {}",
                letter.letter_number
            );
            assert!(letter.letter_number.contains(letter_type.code()));
        }
    }

    #[test]
    fn test_sequence_is_same_type_count_plus_one() {
        let (db, resident_id) = setup();
        let now = today();

        add(&db, LetterType::Domicile, resident_id, now);
        add(&db, LetterType::Domicile, resident_id, now);
        add(&db, LetterType::Poverty, resident_id, now);

        let next = db.letters().generate_letter_number(LetterType::Domicile).unwrap();
        let count = db
            .letters()
            .count_by_type_in_year(LetterType::Domicile, now.year())
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(parse_sequence(&next), Some(3));
        assert_eq!(
            next,
            format!("003/KET-DOM/{:02}/{}", now.month(), now.year())
        );
    }

    #[test]
    fn test_sequential_business_letters_2025() {
        let (db, resident_id) = setup();

        let first = add(&db, LetterType::Business, resident_id, date(2025, 3, 10));
        let second = add(&db, LetterType::Business, resident_id, date(2025, 11, 2));

        assert_eq!(first.letter_number, "001/KET-USAHA/03/2025");
        assert_eq!(second.letter_number, "002/KET-USAHA/11/2025");
        let first_seq = parse_sequence(&first.letter_number).unwrap();
        let second_seq = parse_sequence(&second.letter_number).unwrap();
        assert_eq!(second_seq - first_seq, 1);
    }

    #[test]
    fn test_counter_resets_yearly_not_monthly() {
        let (db, resident_id) = setup();

        add(&db, LetterType::Birth, resident_id, date(2024, 12, 30));
        add(&db, LetterType::Birth, resident_id, date(2025, 1, 5));
        add(&db, LetterType::Birth, resident_id, date(2025, 2, 5));

        let next = db
            .letters()
            .generate_letter_number_on(LetterType::Birth, date(2025, 6, 1))
            .unwrap();
        assert_eq!(next, "003/KET-LAHIR/06/2025");

        let next_year = db
            .letters()
            .generate_letter_number_on(LetterType::Birth, date(2026, 1, 1))
            .unwrap();
        assert_eq!(next_year, "001/KET-LAHIR/01/2026");
    }

    #[test]
    fn test_generation_skips_taken_number_after_delete() {
        let (db, resident_id) = setup();
        let issued = date(2025, 5, 1);

        let first = add(&db, LetterType::Custom, resident_id, issued);
        let _second = add(&db, LetterType::Custom, resident_id, issued);
        db.letters().delete(first.id.unwrap()).unwrap();

        // one letter left, so count + 1 = 2 is already in use
        let third = add(&db, LetterType::Custom, resident_id, issued);
        assert_eq!(third.letter_number, "003/CUSTOM/05/2025");
    }

    #[test]
    fn test_explicit_number_is_kept_and_must_be_unique() {
        let (db, resident_id) = setup();
        let issued = date(2025, 7, 1);

        let mut letter = Letter::new(LetterType::Keramaian, resident_id, issued);
        letter.letter_number = "145/KERAMAIAN/07/2025".into();
        db.letters().create(&mut letter).unwrap();
        assert_eq!(letter.letter_number, "145/KERAMAIAN/07/2025");

        let mut duplicate = Letter::new(LetterType::Keramaian, resident_id, issued);
        duplicate.letter_number = "145/KERAMAIAN/07/2025".into();
        let err = db.letters().create(&mut duplicate).unwrap_err();
        assert!(err.is_conflict());

        // same text under another type is a different number
        let mut other_type = Letter::new(LetterType::Custom, resident_id, issued);
        other_type.letter_number = "145/KERAMAIAN/07/2025".into();
        db.letters().create(&mut other_type).unwrap();
    }

    #[test]
    fn test_create_requires_existing_resident() {
        let (db, resident_id) = setup();
        let mut letter = Letter::new(LetterType::Domicile, resident_id + 50, today());

        let err = db.letters().create(&mut letter).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.letters().count().unwrap(), 0);
    }

    #[test]
    fn test_update_and_status() {
        let (db, resident_id) = setup();
        let letter = add(&db, LetterType::Introduction, resident_id, date(2025, 8, 17));
        let id = letter.id.unwrap();

        let updated = db
            .letters()
            .update(
                id,
                LetterUpdate {
                    content: Some("Isi surat".into()),
                    purpose: Some(Some("Melamar pekerjaan".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.letter_number, letter.letter_number);
        assert_eq!(updated.content, "Isi surat");

        db.letters().set_status(id, LetterStatus::Signed).unwrap();
        db.letters().set_status(id, LetterStatus::Draft).unwrap();
        let stored = db.letters().find_by_id(id).unwrap().unwrap();
        assert_eq!(stored.status, LetterStatus::Draft);
        assert_eq!(stored.purpose.as_deref(), Some("Melamar pekerjaan"));

        assert!(db
            .letters()
            .set_status(id + 1, LetterStatus::Signed)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_update_rejects_number_of_sibling() {
        let (db, resident_id) = setup();
        let a = add(&db, LetterType::Poverty, resident_id, date(2025, 1, 2));
        let b = add(&db, LetterType::Poverty, resident_id, date(2025, 1, 3));

        let err = db
            .letters()
            .update(
                b.id.unwrap(),
                LetterUpdate {
                    letter_number: Some(a.letter_number.clone()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateLetterNumber { .. }));
    }

    #[test]
    fn test_search_and_statistics() {
        let (db, resident_id) = setup();
        let mut siti = Resident::new("3201010101900002", "3201010101900000", "Siti");
        let siti_id = db.residents().create(&mut siti).unwrap();

        add(&db, LetterType::Domicile, resident_id, date(2025, 1, 1));
        add(&db, LetterType::Domicile, siti_id, date(2025, 1, 2));
        let mut signed = add(&db, LetterType::Business, siti_id, date(2025, 1, 3));
        db.letters()
            .set_status(signed.id.unwrap(), LetterStatus::Signed)
            .unwrap();
        signed.status = LetterStatus::Signed;

        assert_eq!(db.letters().search("siti").unwrap().len(), 2);
        assert_eq!(db.letters().search("KET-USAHA").unwrap().len(), 1);
        assert_eq!(db.letters().find_by_resident(resident_id).unwrap().len(), 1);
        assert_eq!(db.letters().find_by_type(LetterType::Domicile).unwrap().len(), 2);

        let stats = db.letters().statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.count_for_type(LetterType::Domicile), 2);
        assert_eq!(stats.count_for_type(LetterType::Birth), 0);
        assert!(stats
            .by_status
            .contains(&(LetterStatus::Signed, 1)));
        assert!(stats.to_json().unwrap().contains("\"domicile\""));
    }

    #[test]
    fn test_concurrent_creation_yields_distinct_numbers() {
        let (db, resident_id) = setup();
        let issued = date(2025, 5, 20);
        const WRITERS: u32 = 8;

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let mut letter = Letter::new(LetterType::Business, resident_id, issued);
                    db.letters().create(&mut letter).unwrap();
                    letter.letter_number
                })
            })
            .collect();

        let mut sequences: Vec<u32> = handles
            .into_iter()
            .map(|h| parse_sequence(&h.join().unwrap()).unwrap())
            .collect();
        sequences.sort_unstable();

        assert_eq!(sequences, (1..=WRITERS).collect::<Vec<_>>());
        assert_eq!(
            db.letters()
                .count_by_type_in_year(LetterType::Business, 2025)
                .unwrap(),
            WRITERS as i64
        );
    }
}
