use chrono::{Datelike, Local, NaiveDate};

/// Indonesian month names, January first
pub const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Storage format for dates
pub const DB_DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for timestamps
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a date from user input (flexible format)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%Y/%m/%d", // 2024/01/15
        "%d-%m-%Y", // 15-01-2024
        "%d/%m/%Y", // 15/01/2024
        "%Y%m%d",   // 20240115
    ];

    // First match wins
    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    None
}

/// Parse a date as written by the repositories
pub fn parse_db_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DB_DATE_FORMAT).ok()
}

/// Format a date for storage
pub fn format_db_date(date: NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}

/// Long Indonesian date, e.g. "17 Agustus 1945"
pub fn format_long_id(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_ID[date.month0() as usize],
        date.year()
    )
}

/// Current local date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current local time in storage format
pub fn timestamp_now() -> String {
    Local::now().format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Age in whole years at `end`
pub fn calculate_age(birth: NaiveDate, end: NaiveDate) -> i32 {
    let mut age = end.year() - birth.year();
    if (end.month(), end.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-15"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(
            parse_date("15/01/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("invalid"), None);
    }

    #[test]
    fn test_format_long_id() {
        let date = NaiveDate::from_ymd_opt(1945, 8, 17).unwrap();
        assert_eq!(format_long_id(date), "17 Agustus 1945");

        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(format_long_id(date), "5 Januari 2025");
    }

    #[test]
    fn test_calculate_age() {
        let birth = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(calculate_age(birth, end), 33);

        let end2 = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(calculate_age(birth, end2), 34);
    }
}
