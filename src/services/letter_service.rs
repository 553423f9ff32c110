//! Letter drafting on top of the repositories

use anyhow::Result;

use crate::db::Database;
use crate::models::{Letter, LetterType, LetterUpdate, Resident};
use crate::services::placeholder::substitute;
use crate::utils::date::today;
use crate::utils::error::AppError;

pub struct LetterService<'a> {
    db: &'a Database,
}

impl<'a> LetterService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Body of the type's default template, empty when the type has none
    pub fn prefill_content(&self, letter_type: LetterType) -> Result<String> {
        let content = self
            .db
            .templates()
            .find_default_by_type(letter_type)?
            .map(|t| t.content)
            .unwrap_or_default();
        Ok(content)
    }

    /// Create and store a draft letter issued today from the default template
    pub fn draft_from_default(
        &self,
        resident_id: i64,
        letter_type: LetterType,
        purpose: Option<&str>,
    ) -> Result<Letter> {
        let mut letter = Letter::new(letter_type, resident_id, today());
        letter.content = self.prefill_content(letter_type)?;
        letter.purpose = purpose
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        self.db.letters().create(&mut letter)?;
        tracing::info!(
            "Drafted {} letter {} for resident {}",
            letter_type,
            letter.letter_number,
            resident_id
        );
        Ok(letter)
    }

    /// Substitute placeholders in a stored letter and save the result
    pub fn apply_placeholders(&self, letter_id: i64) -> Result<Letter> {
        let letter = self
            .db
            .letters()
            .find_by_id(letter_id)?
            .ok_or_else(|| AppError::not_found(format!("Letter with ID {}", letter_id)))?;
        let resident = self.resident(letter.resident_id)?;
        let village = self.db.village().get()?;

        let content = substitute(&letter.content, &resident, &village, letter.purpose_text());
        let updated = self.db.letters().update(
            letter_id,
            LetterUpdate {
                content: Some(content),
                ..Default::default()
            },
        )?;
        Ok(updated)
    }

    /// Substituted default template for a resident, nothing is stored
    pub fn preview(
        &self,
        letter_type: LetterType,
        resident_id: i64,
        purpose: Option<&str>,
    ) -> Result<String> {
        let template = self.prefill_content(letter_type)?;
        let resident = self.resident(resident_id)?;
        let village = self.db.village().get()?;
        Ok(substitute(&template, &resident, &village, purpose))
    }

    fn resident(&self, id: i64) -> Result<Resident> {
        let resident = self
            .db
            .residents()
            .find_by_id(id)?
            .ok_or_else(|| AppError::not_found(format!("Resident with ID {}", id)))?;
        Ok(resident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let mut resident = Resident::new("3201010101010001", "3201010101010000", "Budi");
        let id = db.residents().create(&mut resident).unwrap();

        let mut village = db.village().get().unwrap();
        village.name = "Sukamaju".into();
        village.leader_name = "H. Ahmad".into();
        db.village().save(&mut village).unwrap();

        (db, id)
    }

    #[test]
    fn test_prefill_uses_default_template() {
        let (db, _) = setup();
        let service = LetterService::new(&db);

        let expected = db
            .templates()
            .find_default_by_type(LetterType::Domicile)
            .unwrap()
            .unwrap()
            .content;
        assert_eq!(service.prefill_content(LetterType::Domicile).unwrap(), expected);
    }

    #[test]
    fn test_prefill_empty_without_default() {
        let (db, _) = setup();
        let default = db
            .templates()
            .find_default_by_type(LetterType::Birth)
            .unwrap()
            .unwrap();
        db.templates()
            .update(
                default.id.unwrap(),
                crate::models::TemplateUpdate {
                    is_default: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let service = LetterService::new(&db);
        assert_eq!(service.prefill_content(LetterType::Birth).unwrap(), "");
    }

    #[test]
    fn test_draft_and_apply_placeholders() {
        let (db, resident_id) = setup();
        let service = LetterService::new(&db);

        let draft = service
            .draft_from_default(resident_id, LetterType::Introduction, Some("melamar kerja"))
            .unwrap();
        assert!(draft.id.is_some());
        assert_eq!(draft.title, LetterType::Introduction.title());
        assert!(draft.letter_number.starts_with("001/PENGANTAR/"));
        assert!(draft.content.contains("[RESIDENT_NAME]"));

        let applied = service.apply_placeholders(draft.id.unwrap()).unwrap();
        assert!(applied.content.contains("Budi"));
        assert!(applied.content.contains("melamar kerja"));
        assert!(!applied.content.contains("[RESIDENT_NAME]"));
        assert_eq!(applied.letter_number, draft.letter_number);

        let stored = db.letters().find_by_id(draft.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.content, applied.content);
    }

    #[test]
    fn test_preview_does_not_store() {
        let (db, resident_id) = setup();
        let service = LetterService::new(&db);

        let text = service
            .preview(LetterType::Custom, resident_id, None)
            .unwrap();
        assert!(text.contains("Budi"));
        assert!(text.contains("Kepala Desa Sukamaju"));
        assert!(!text.contains("[RESIDENT_NAME]"));
        // No purpose given, so the token stays for later
        assert!(text.contains("[LETTER_PURPOSE]"));
        assert_eq!(db.letters().count().unwrap(), 0);

        let with_purpose = service
            .preview(LetterType::Custom, resident_id, Some("pengajuan KUR"))
            .unwrap();
        assert!(with_purpose.contains("pengajuan KUR"));
        assert!(!with_purpose.contains("[LETTER_PURPOSE]"));
    }

    #[test]
    fn test_missing_records() {
        let (db, resident_id) = setup();
        let service = LetterService::new(&db);

        let err = service.apply_placeholders(999).unwrap_err();
        assert!(err.downcast_ref::<AppError>().unwrap().is_not_found());

        let err = service.preview(LetterType::Domicile, resident_id + 1, None).unwrap_err();
        assert!(err.downcast_ref::<AppError>().unwrap().is_not_found());

        assert!(service
            .draft_from_default(resident_id + 1, LetterType::Domicile, None)
            .is_err());
    }
}
