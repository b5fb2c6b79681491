//! Fixed `YYYYMMDD` date codec shared by the store, the service and the wire.

use chrono::{Datelike, Local, NaiveDate};

use crate::errors::RuleError;

/// chrono format string for the 8-digit wire/storage form.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// chrono format string for the `DD.MM.YYYY` search literal.
pub const SEARCH_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parse an exactly-8-digit `YYYYMMDD` string into a calendar date.
pub fn parse_date(text: &str) -> Result<NaiveDate, RuleError> {
    let invalid = || RuleError::InvalidDate(text.to_string());
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = text[0..4].parse().map_err(|_| invalid())?;
    let month: u32 = text[4..6].parse().map_err(|_| invalid())?;
    let day: u32 = text[6..8].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Whether a date still fits the 8-digit encoding.
pub fn is_encodable(date: NaiveDate) -> bool {
    (0..=9999).contains(&date.year())
}

/// Render a date in the fixed `YYYYMMDD` form.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Recognize a `DD.MM.YYYY` search literal.
pub fn parse_search_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    // DD.MM.YYYY
    if text.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(text, SEARCH_DATE_FORMAT).ok()
}

/// Today's date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// serde adapter for `NaiveDate` fields carried as `YYYYMMDD` strings.
pub mod yyyymmdd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(super::DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_valid_dates() {
        assert_eq!(parse_date("20240229").unwrap(), ymd(2024, 2, 29));
        assert_eq!(parse_date("00010101").unwrap(), ymd(1, 1, 1));
    }

    #[test]
    fn rejects_wrong_length_or_non_digits() {
        assert!(parse_date("").is_err());
        assert!(parse_date("2024061").is_err());
        assert!(parse_date("202406150").is_err());
        assert!(parse_date("2024-6-1").is_err());
        assert!(parse_date("+2024061").is_err());
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        assert_eq!(
            parse_date("20230229"),
            Err(RuleError::InvalidDate("20230229".into()))
        );
        assert!(parse_date("20241301").is_err());
        assert!(parse_date("20240431").is_err());
    }

    #[test]
    fn format_is_always_eight_digits() {
        assert_eq!(format_date(ymd(2024, 6, 5)), "20240605");
        assert_eq!(format_date(ymd(987, 1, 2)), "09870102");
    }

    #[test]
    fn search_literal_recognized() {
        assert_eq!(parse_search_date("15.06.2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_search_date(" 01.01.2025 "), Some(ymd(2025, 1, 1)));
        assert_eq!(parse_search_date("31.02.2024"), None);
        assert_eq!(parse_search_date("1.6.2024"), None);
        assert_eq!(parse_search_date("groceries"), None);
        assert_eq!(parse_search_date("20240615"), None);
    }

    #[test]
    fn serde_adapter_uses_compact_form() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "yyyymmdd")]
            date: NaiveDate,
        }

        let json = serde_json::to_string(&Wrapper { date: ymd(2024, 6, 15) }).unwrap();
        assert_eq!(json, r#"{"date":"20240615"}"#);

        let parsed: Wrapper = serde_json::from_str(r#"{"date":"20250301"}"#).unwrap();
        assert_eq!(parsed.date, ymd(2025, 3, 1));

        assert!(serde_json::from_str::<Wrapper>(r#"{"date":"2025-03-01"}"#).is_err());
    }
}
