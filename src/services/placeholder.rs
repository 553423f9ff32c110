//! Placeholder substitution for letter templates
//!
//! Templates carry bracketed tokens such as `[RESIDENT_NAME]`. Substitution
//! is pure text replacement: every occurrence of a known token is replaced,
//! unknown tokens are left as they are.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Resident, VillageInfo};
use crate::utils::date::format_long_id;

pub const PURPOSE_TOKEN: &str = "[LETTER_PURPOSE]";

/// Supported tokens with the description shown to template editors
pub const PLACEHOLDERS: &[(&str, &str)] = &[
    ("[RESIDENT_NAME]", "Nama lengkap penduduk"),
    ("[RESIDENT_NIK]", "Nomor Induk Kependudukan"),
    ("[RESIDENT_BIRTHDATE]", "Tanggal lahir (contoh: 17 Agustus 1945)"),
    ("[RESIDENT_GENDER]", "Jenis kelamin"),
    ("[RESIDENT_RELIGION]", "Agama"),
    ("[RESIDENT_OCCUPATION]", "Pekerjaan"),
    ("[RESIDENT_MARITAL_STATUS]", "Status perkawinan"),
    ("[RESIDENT_ADDRESS]", "Alamat lengkap dengan RT/RW"),
    ("[VILLAGE_NAME]", "Nama desa"),
    ("[VILLAGE_DISTRICT]", "Nama kecamatan"),
    ("[VILLAGE_REGENCY]", "Nama kabupaten"),
    ("[VILLAGE_PROVINCE]", "Nama provinsi"),
    ("[VILLAGE_LEADER_NAME]", "Nama kepala desa"),
    ("[VILLAGE_LEADER_TITLE]", "Jabatan kepala desa"),
    (PURPOSE_TOKEN, "Keperluan surat"),
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[[A-Z][A-Z0-9_]*\]").expect("valid placeholder pattern"))
}

/// Replace every known token in `template`.
///
/// `[LETTER_PURPOSE]` is only replaced when `purpose` is non-blank; otherwise
/// it stays in the text so it can be filled in later.
pub fn substitute(
    template: &str,
    resident: &Resident,
    village: &VillageInfo,
    purpose: Option<&str>,
) -> String {
    let birth_date = resident.birth_date.map(format_long_id).unwrap_or_default();
    let address = resident.full_address();

    let replacements: [(&str, &str); 14] = [
        ("[RESIDENT_NAME]", &resident.name),
        ("[RESIDENT_NIK]", &resident.nik),
        ("[RESIDENT_BIRTHDATE]", &birth_date),
        ("[RESIDENT_GENDER]", resident.gender.display_name()),
        ("[RESIDENT_RELIGION]", &resident.religion),
        ("[RESIDENT_OCCUPATION]", &resident.occupation),
        ("[RESIDENT_MARITAL_STATUS]", &resident.marital_status),
        ("[RESIDENT_ADDRESS]", &address),
        ("[VILLAGE_NAME]", &village.name),
        ("[VILLAGE_DISTRICT]", &village.district),
        ("[VILLAGE_REGENCY]", &village.regency),
        ("[VILLAGE_PROVINCE]", &village.province),
        ("[VILLAGE_LEADER_NAME]", &village.leader_name),
        ("[VILLAGE_LEADER_TITLE]", &village.leader_title),
    ];

    let mut text = template.to_string();
    for (token, value) in replacements {
        if text.contains(token) {
            text = text.replace(token, value);
        }
    }

    if let Some(purpose) = purpose.map(str::trim).filter(|p| !p.is_empty()) {
        text = text.replace(PURPOSE_TOKEN, purpose);
    }

    text
}

/// Distinct bracketed tokens still present, in order of first appearance
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in token_pattern().find_iter(text) {
        if !found.iter().any(|t| t == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}

pub fn is_known_placeholder(token: &str) -> bool {
    PLACEHOLDERS.iter().any(|(t, _)| *t == token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use chrono::NaiveDate;

    fn resident() -> Resident {
        let mut resident = Resident::new("123", "3200", "Budi");
        resident.birth_date = NaiveDate::from_ymd_opt(1945, 8, 17);
        resident.gender = Gender::Male;
        resident.religion = "Islam".into();
        resident.occupation = "Petani".into();
        resident.address = "Dusun Krajan".into();
        resident.rt = "001".into();
        resident.rw = "002".into();
        resident
    }

    fn village() -> VillageInfo {
        VillageInfo {
            name: "Sukamaju".into(),
            district: "Cibinong".into(),
            leader_name: "H. Ahmad".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_substitute_name_and_nik() {
        let text = substitute(
            "Nama: [RESIDENT_NAME], NIK: [RESIDENT_NIK]",
            &resident(),
            &village(),
            None,
        );
        assert_eq!(text, "Nama: Budi, NIK: 123");
    }

    #[test]
    fn test_substitute_all_occurrences() {
        let text = substitute(
            "[RESIDENT_NAME] / [RESIDENT_NAME] lahir [RESIDENT_BIRTHDATE], [RESIDENT_GENDER]",
            &resident(),
            &village(),
            None,
        );
        assert_eq!(text, "Budi / Budi lahir 17 Agustus 1945, Laki-laki");
    }

    #[test]
    fn test_village_tokens() {
        let text = substitute(
            "[VILLAGE_LEADER_TITLE] [VILLAGE_NAME] ([VILLAGE_LEADER_NAME]), alamat [RESIDENT_ADDRESS]",
            &resident(),
            &village(),
            None,
        );
        assert_eq!(
            text,
            "Kepala Desa Sukamaju (H. Ahmad), alamat Dusun Krajan RT 001/RW 002"
        );
    }

    #[test]
    fn test_purpose_left_literal_without_value() {
        let (r, v) = (resident(), village());
        assert_eq!(substitute("[LETTER_PURPOSE]", &r, &v, None), "[LETTER_PURPOSE]");
        assert_eq!(substitute("[LETTER_PURPOSE]", &r, &v, Some("  ")), "[LETTER_PURPOSE]");
        assert_eq!(
            substitute("Untuk [LETTER_PURPOSE].", &r, &v, Some(" melamar kerja ")),
            "Untuk melamar kerja."
        );
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let (r, v) = (resident(), village());
        let once = substitute("[RESIDENT_NAME] [NOMOR_KK] [rt]", &r, &v, None);
        assert_eq!(once, "Budi [NOMOR_KK] [rt]");

        let twice = substitute(&once, &r, &v, None);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_birth_date_is_empty() {
        let mut r = resident();
        r.birth_date = None;
        assert_eq!(substitute("Lahir: [RESIDENT_BIRTHDATE]", &r, &village(), None), "Lahir: ");
    }

    #[test]
    fn test_unresolved_placeholders() {
        let found = unresolved_placeholders("[A_1] teks [LETTER_PURPOSE] [A_1] [lower] [X]");
        assert_eq!(found, vec!["[A_1]", "[LETTER_PURPOSE]", "[X]"]);
        assert!(unresolved_placeholders("Tidak ada token").is_empty());
    }

    #[test]
    fn test_placeholder_list_matches_substitution() {
        let (r, v) = (resident(), village());
        for (token, description) in PLACEHOLDERS {
            assert!(!description.is_empty());
            assert!(is_known_placeholder(token));
            let out = substitute(token, &r, &v, Some("keperluan"));
            assert_ne!(&out, token, "{} was not substituted", token);
        }
        assert!(!is_known_placeholder("[NOMOR_KK]"));
    }
}
