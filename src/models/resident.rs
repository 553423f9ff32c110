use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::date::{calculate_age, today};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Male => "Laki-laki",
            Self::Female => "Perempuan",
        }
    }

    /// Single-letter code used on Indonesian civil documents
    pub fn code(&self) -> &'static str {
        match self {
            Self::Male => "L",
            Self::Female => "P",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "P" | "female" | "Perempuan" => Self::Female,
            _ => Self::Male,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    pub id: Option<i64>,
    /// Family card (KK) number
    pub kk_number: String,
    pub nik: String,
    pub name: String,
    pub birth_place: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub address: String,
    pub rt: String,
    pub rw: String,
    /// Position in the family card, e.g. "Kepala Keluarga"
    pub family_status: String,
    pub religion: String,
    pub occupation: String,
    pub marital_status: String,
    pub education: String,
    pub blood_type: Option<String>,
    pub disability: Option<String>,
    pub father_name: String,
    pub mother_name: String,
    pub photo_path: Option<String>,
    pub has_ektp: bool,
    pub has_birth_certificate: bool,
    pub birth_certificate_number: Option<String>,
    pub has_marriage_certificate: bool,
    pub marriage_certificate_number: Option<String>,
    pub has_divorce_certificate: bool,
    pub divorce_certificate_number: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Default for Resident {
    fn default() -> Self {
        Self {
            id: None,
            kk_number: String::new(),
            nik: String::new(),
            name: String::new(),
            birth_place: String::new(),
            birth_date: None,
            gender: Gender::default(),
            address: String::new(),
            rt: String::new(),
            rw: String::new(),
            family_status: String::new(),
            religion: String::new(),
            occupation: String::new(),
            marital_status: String::new(),
            education: String::new(),
            blood_type: None,
            disability: None,
            father_name: String::new(),
            mother_name: String::new(),
            photo_path: None,
            has_ektp: false,
            has_birth_certificate: false,
            birth_certificate_number: None,
            has_marriage_certificate: false,
            marriage_certificate_number: None,
            has_divorce_certificate: false,
            divorce_certificate_number: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Resident {
    pub fn new(
        nik: impl Into<String>,
        kk_number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            nik: nik.into(),
            kk_number: kk_number.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// "Tempat, 17 Agustus 1945"
    pub fn birth_display(&self) -> String {
        let date = self
            .birth_date
            .map(crate::utils::date::format_long_id)
            .unwrap_or_default();

        match (self.birth_place.is_empty(), date.is_empty()) {
            (false, false) => format!("{}, {}", self.birth_place, date),
            (false, true) => self.birth_place.clone(),
            (true, false) => date,
            (true, true) => String::new(),
        }
    }

    /// Address with RT/RW appended when present
    pub fn full_address(&self) -> String {
        if self.rt.is_empty() && self.rw.is_empty() {
            return self.address.clone();
        }
        format!("{} RT {}/RW {}", self.address, self.rt, self.rw)
            .trim()
            .to_string()
    }

    pub fn age(&self) -> Option<i32> {
        self.birth_date.map(|birth| calculate_age(birth, today()))
    }

    pub fn validate(&self) -> Result<(), ResidentValidationError> {
        if self.name.trim().is_empty() {
            return Err(ResidentValidationError::MissingName);
        }
        if self.nik.trim().is_empty() {
            return Err(ResidentValidationError::MissingNik);
        }
        if !self.nik.chars().all(|c| c.is_ascii_digit()) {
            return Err(ResidentValidationError::NonNumericNik);
        }
        if self.kk_number.trim().is_empty() {
            return Err(ResidentValidationError::MissingKkNumber);
        }
        if let Some(birth) = self.birth_date {
            if birth > today() {
                return Err(ResidentValidationError::BirthInFuture);
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResidentValidationError {
    #[error("Name is required")]
    MissingName,
    #[error("NIK is required")]
    MissingNik,
    #[error("NIK may only contain digits")]
    NonNumericNik,
    #[error("Family card number is required")]
    MissingKkNumber,
    #[error("Birth date cannot be in the future")]
    BirthInFuture,
}

impl From<ResidentValidationError> for crate::utils::error::AppError {
    fn from(err: ResidentValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Partial update for a resident. `None` leaves the field untouched;
/// for nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentUpdate {
    pub kk_number: Option<String>,
    pub nik: Option<String>,
    pub name: Option<String>,
    pub birth_place: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub rt: Option<String>,
    pub rw: Option<String>,
    pub family_status: Option<String>,
    pub religion: Option<String>,
    pub occupation: Option<String>,
    pub marital_status: Option<String>,
    pub education: Option<String>,
    pub blood_type: Option<Option<String>>,
    pub disability: Option<Option<String>>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub photo_path: Option<Option<String>>,
    pub has_ektp: Option<bool>,
    pub has_birth_certificate: Option<bool>,
    pub birth_certificate_number: Option<Option<String>>,
    pub has_marriage_certificate: Option<bool>,
    pub marriage_certificate_number: Option<Option<String>>,
    pub has_divorce_certificate: Option<bool>,
    pub divorce_certificate_number: Option<Option<String>>,
}

impl ResidentUpdate {
    pub fn apply_to(self, resident: &mut Resident) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = self.$field {
                        resident.$field = value;
                    }
                )*
            };
        }

        merge!(
            kk_number,
            nik,
            name,
            birth_place,
            birth_date,
            gender,
            address,
            rt,
            rw,
            family_status,
            religion,
            occupation,
            marital_status,
            education,
            blood_type,
            disability,
            father_name,
            mother_name,
            photo_path,
            has_ektp,
            has_birth_certificate,
            birth_certificate_number,
            has_marriage_certificate,
            marriage_certificate_number,
            has_divorce_certificate,
            divorce_certificate_number,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_birth_display() {
        let mut resident = Resident::new("3201010101010001", "3201010101010000", "Budi");
        assert_eq!(resident.birth_display(), "");

        resident.birth_place = "Bogor".into();
        resident.birth_date = NaiveDate::from_ymd_opt(1980, 3, 2);
        assert_eq!(resident.birth_display(), "Bogor, 2 Maret 1980");
    }

    #[test]
    fn test_full_address() {
        let mut resident = Resident::new("1", "2", "Siti");
        resident.address = "Dusun Krajan".into();
        assert_eq!(resident.full_address(), "Dusun Krajan");

        resident.rt = "003".into();
        resident.rw = "001".into();
        assert_eq!(resident.full_address(), "Dusun Krajan RT 003/RW 001");
    }

    #[test]
    fn test_validation() {
        assert!(Resident::new("3201", "3202", "Budi").validate().is_ok());

        assert!(matches!(
            Resident::new("3201", "3202", "  ").validate(),
            Err(ResidentValidationError::MissingName)
        ));
        assert!(matches!(
            Resident::new("32A1", "3202", "Budi").validate(),
            Err(ResidentValidationError::NonNumericNik)
        ));
        assert!(matches!(
            Resident::new("3201", "", "Budi").validate(),
            Err(ResidentValidationError::MissingKkNumber)
        ));
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let mut resident = Resident::new("3201", "3202", "Budi");
        resident.occupation = "Petani".into();
        resident.blood_type = Some("O".into());

        let update = ResidentUpdate {
            name: Some("Budi Santoso".into()),
            blood_type: Some(None),
            ..Default::default()
        };
        update.apply_to(&mut resident);

        assert_eq!(resident.name, "Budi Santoso");
        assert_eq!(resident.occupation, "Petani");
        assert_eq!(resident.blood_type, None);
        assert_eq!(resident.nik, "3201");
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::from_db_str("P"), Gender::Female);
        assert_eq!(Gender::from_db_str("L"), Gender::Male);
        assert_eq!(Gender::Female.display_name(), "Perempuan");
    }
}
