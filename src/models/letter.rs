use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code used for letter types the numbering table does not know
pub const FALLBACK_TYPE_CODE: &str = "SURAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LetterType {
    Domicile,
    Poverty,
    Introduction,
    Business,
    Birth,
    Keramaian,
    Custom,
    WaliNikah,
}

impl LetterType {
    pub const ALL: &'static [Self] = &[
        Self::Domicile,
        Self::Poverty,
        Self::Introduction,
        Self::Business,
        Self::Birth,
        Self::Keramaian,
        Self::Custom,
        Self::WaliNikah,
    ];

    /// Short code in the letter number, e.g. `KET-DOM`
    pub fn code(&self) -> &'static str {
        letter_type_code(self.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domicile => "domicile",
            Self::Poverty => "poverty",
            Self::Introduction => "introduction",
            Self::Business => "business",
            Self::Birth => "birth",
            Self::Keramaian => "keramaian",
            Self::Custom => "custom",
            Self::WaliNikah => "wali-nikah",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Heading printed on the letter
    pub fn title(&self) -> &'static str {
        match self {
            Self::Domicile => "SURAT KETERANGAN DOMISILI",
            Self::Poverty => "SURAT KETERANGAN TIDAK MAMPU",
            Self::Introduction => "SURAT PENGANTAR",
            Self::Business => "SURAT KETERANGAN USAHA",
            Self::Birth => "SURAT KETERANGAN KELAHIRAN",
            Self::Keramaian => "SURAT IZIN KERAMAIAN",
            Self::Custom => "SURAT KETERANGAN",
            Self::WaliNikah => "SURAT KETERANGAN WALI NIKAH",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Domicile => "Keterangan Domisili",
            Self::Poverty => "Keterangan Tidak Mampu",
            Self::Introduction => "Surat Pengantar",
            Self::Business => "Keterangan Usaha",
            Self::Birth => "Keterangan Kelahiran",
            Self::Keramaian => "Izin Keramaian",
            Self::Custom => "Surat Lainnya",
            Self::WaliNikah => "Wali Nikah",
        }
    }
}

impl fmt::Display for LetterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numbering code for a raw letter-type tag
pub fn letter_type_code(raw: &str) -> &'static str {
    match raw {
        "domicile" => "KET-DOM",
        "poverty" => "KET-TDK-MAMPU",
        "introduction" => "PENGANTAR",
        "business" => "KET-USAHA",
        "birth" => "KET-LAHIR",
        "keramaian" => "KERAMAIAN",
        "custom" => "CUSTOM",
        "wali-nikah" => "WN",
        _ => FALLBACK_TYPE_CODE,
    }
}

/// `NNN/CODE/MM/YYYY`
pub fn format_letter_number(sequence: u32, letter_type: LetterType, date: NaiveDate) -> String {
    format!(
        "{:03}/{}/{:02}/{}",
        sequence,
        letter_type.code(),
        date.month(),
        date.year()
    )
}

/// Sequence part of a formatted letter number
pub fn parse_sequence(letter_number: &str) -> Option<u32> {
    letter_number.split('/').next()?.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterStatus {
    #[default]
    Draft,
    Completed,
    Signed,
}

impl LetterStatus {
    pub const ALL: &'static [Self] = &[Self::Draft, Self::Completed, Self::Signed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
            Self::Signed => "signed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Draft => "Draf",
            Self::Completed => "Selesai",
            Self::Signed => "Ditandatangani",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "signed" => Self::Signed,
            _ => Self::Draft,
        }
    }
}

impl fmt::Display for LetterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Letter {
    pub id: Option<i64>,
    /// Empty until the numbering authority assigns one
    pub letter_number: String,
    pub letter_type: LetterType,
    pub resident_id: i64,
    pub title: String,
    pub content: String,
    pub purpose: Option<String>,
    pub issued_date: NaiveDate,
    pub status: LetterStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Letter {
    pub fn new(letter_type: LetterType, resident_id: i64, issued_date: NaiveDate) -> Self {
        Self {
            id: None,
            letter_number: String::new(),
            letter_type,
            resident_id,
            title: letter_type.title().to_string(),
            content: String::new(),
            purpose: None,
            issued_date,
            status: LetterStatus::Draft,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn issued_year(&self) -> i32 {
        self.issued_date.year()
    }

    /// Purpose trimmed, `None` when blank
    pub fn purpose_text(&self) -> Option<&str> {
        self.purpose
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn validate(&self) -> Result<(), crate::utils::error::AppError> {
        use crate::utils::error::AppError;

        if self.title.trim().is_empty() {
            return Err(AppError::validation("Letter title is required"));
        }
        if self.resident_id <= 0 {
            return Err(AppError::validation("Letter must belong to a resident"));
        }
        Ok(())
    }
}

/// Partial update for a letter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LetterUpdate {
    pub letter_number: Option<String>,
    pub letter_type: Option<LetterType>,
    pub resident_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub purpose: Option<Option<String>>,
    pub issued_date: Option<NaiveDate>,
    pub status: Option<LetterStatus>,
}

impl LetterUpdate {
    pub fn apply_to(self, letter: &mut Letter) {
        if let Some(v) = self.letter_number {
            letter.letter_number = v;
        }
        if let Some(v) = self.letter_type {
            letter.letter_type = v;
        }
        if let Some(v) = self.resident_id {
            letter.resident_id = v;
        }
        if let Some(v) = self.title {
            letter.title = v;
        }
        if let Some(v) = self.content {
            letter.content = v;
        }
        if let Some(v) = self.purpose {
            letter.purpose = v;
        }
        if let Some(v) = self.issued_date {
            letter.issued_date = v;
        }
        if let Some(v) = self.status {
            letter.status = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(LetterType::Domicile.code(), "KET-DOM");
        assert_eq!(LetterType::Poverty.code(), "KET-TDK-MAMPU");
        assert_eq!(LetterType::Introduction.code(), "PENGANTAR");
        assert_eq!(LetterType::Business.code(), "KET-USAHA");
        assert_eq!(LetterType::Birth.code(), "KET-LAHIR");
        assert_eq!(LetterType::Keramaian.code(), "KERAMAIAN");
        assert_eq!(LetterType::Custom.code(), "CUSTOM");
        assert_eq!(LetterType::WaliNikah.code(), "WN");
        assert_eq!(letter_type_code("death"), "SURAT");
    }

    #[test]
    fn test_db_str_roundtrip() {
        for letter_type in LetterType::ALL {
            assert_eq!(LetterType::from_db_str(letter_type.as_str()), Some(*letter_type));
        }
        assert_eq!(LetterType::from_db_str("unknown"), None);
    }

    #[test]
    fn test_format_letter_number() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            format_letter_number(7, LetterType::Business, date),
            "007/KET-USAHA/03/2025"
        );
        assert_eq!(
            format_letter_number(1234, LetterType::WaliNikah, date),
            "1234/WN/03/2025"
        );
        assert_eq!(parse_sequence("007/KET-USAHA/03/2025"), Some(7));
        assert_eq!(parse_sequence("abc"), None);
    }

    #[test]
    fn test_purpose_text() {
        let mut letter = Letter::new(
            LetterType::Introduction,
            1,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        assert_eq!(letter.purpose_text(), None);

        letter.purpose = Some("   ".into());
        assert_eq!(letter.purpose_text(), None);

        letter.purpose = Some(" Melamar kerja ".into());
        assert_eq!(letter.purpose_text(), Some("Melamar kerja"));
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_string(&LetterType::WaliNikah).unwrap();
        assert_eq!(json, "\"wali-nikah\"");
        let json = serde_json::to_string(&LetterStatus::Signed).unwrap();
        assert_eq!(json, "\"signed\"");
    }
}
