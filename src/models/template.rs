use serde::{Deserialize, Serialize};

use super::LetterType;

/// Letter body template for one letter type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterTemplate {
    pub id: Option<i64>,
    pub letter_type: LetterType,
    pub name: String,
    pub content: String,
    pub is_default: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl LetterTemplate {
    pub fn new(letter_type: LetterType, content: impl Into<String>) -> Self {
        Self {
            id: None,
            letter_type,
            name: letter_type.display_name().to_string(),
            content: content.into(),
            is_default: false,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Templates installed with a new database, one default per type
    pub fn default_templates() -> Vec<Self> {
        LetterType::ALL
            .iter()
            .map(|t| Self::new(*t, default_body(*t)).as_default())
            .collect()
    }
}

/// Partial update for a template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpdate {
    pub letter_type: Option<LetterType>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub is_default: Option<bool>,
}

impl TemplateUpdate {
    pub fn apply_to(self, template: &mut LetterTemplate) {
        if let Some(v) = self.letter_type {
            template.letter_type = v;
        }
        if let Some(v) = self.name {
            template.name = v;
        }
        if let Some(v) = self.content {
            template.content = v;
        }
        if let Some(v) = self.is_default {
            template.is_default = v;
        }
    }
}

const IDENTITY_BLOCK: &str = "Nama                : [RESIDENT_NAME]
NIK                 : [RESIDENT_NIK]
Tanggal Lahir       : [RESIDENT_BIRTHDATE]
Jenis Kelamin       : [RESIDENT_GENDER]
Agama               : [RESIDENT_RELIGION]
Pekerjaan           : [RESIDENT_OCCUPATION]
Status Perkawinan   : [RESIDENT_MARITAL_STATUS]
Alamat              : [RESIDENT_ADDRESS]";

fn default_body(letter_type: LetterType) -> String {
    let opening = "Yang bertanda tangan di bawah ini [VILLAGE_LEADER_TITLE] [VILLAGE_NAME], \
Kecamatan [VILLAGE_DISTRICT], Kabupaten [VILLAGE_REGENCY], Provinsi [VILLAGE_PROVINCE], \
menerangkan bahwa:";

    let statement = match letter_type {
        LetterType::Domicile => {
            "Orang tersebut di atas benar-benar penduduk yang berdomisili di Desa [VILLAGE_NAME]."
        }
        LetterType::Poverty => {
            "Orang tersebut di atas benar-benar penduduk Desa [VILLAGE_NAME] dan tergolong \
keluarga tidak mampu."
        }
        LetterType::Introduction => {
            "Orang tersebut di atas benar-benar penduduk Desa [VILLAGE_NAME]. Surat pengantar \
ini diberikan untuk keperluan [LETTER_PURPOSE]."
        }
        LetterType::Business => {
            "Orang tersebut di atas benar-benar memiliki usaha yang berlokasi di Desa [VILLAGE_NAME]."
        }
        LetterType::Birth => {
            "Telah lahir seorang anak dari orang tua tersebut di atas di Desa [VILLAGE_NAME]."
        }
        LetterType::Keramaian => {
            "Orang tersebut di atas diberikan izin untuk menyelenggarakan keramaian dalam rangka \
[LETTER_PURPOSE] dengan tetap menjaga ketertiban dan keamanan lingkungan."
        }
        LetterType::Custom => "[LETTER_PURPOSE]",
        LetterType::WaliNikah => {
            "Orang tersebut di atas benar-benar wali nikah yang sah menurut hukum yang berlaku."
        }
    };

    format!(
        "{opening}\n\n{IDENTITY_BLOCK}\n\n{statement}\n\n\
Demikian surat keterangan ini dibuat untuk dapat dipergunakan sebagaimana mestinya."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_cover_every_type() {
        let templates = LetterTemplate::default_templates();
        assert_eq!(templates.len(), LetterType::ALL.len());
        for letter_type in LetterType::ALL {
            let matching: Vec<_> = templates
                .iter()
                .filter(|t| t.letter_type == *letter_type)
                .collect();
            assert_eq!(matching.len(), 1);
            assert!(matching[0].is_default);
            assert!(matching[0].content.contains("[RESIDENT_NAME]"));
        }
    }

    #[test]
    fn test_update_merges() {
        let mut template = LetterTemplate::new(LetterType::Business, "A").as_default();
        TemplateUpdate {
            content: Some("B".into()),
            ..Default::default()
        }
        .apply_to(&mut template);

        assert_eq!(template.content, "B");
        assert!(template.is_default);
        assert_eq!(template.name, "Keterangan Usaha");
    }
}
