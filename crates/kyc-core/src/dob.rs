//! # Date of Birth
//!
//! The verification provider exchanges dates of birth as `DD-MM-YYYY`
//! (two-digit day, two-digit month, four-digit year). Parsing is lenient at
//! the call site: a date that does not match the shape is dropped, never
//! turned into an error.

use chrono::NaiveDate;

/// Wire layout used by the provider in both directions.
pub const PROVIDER_DOB_FORMAT: &str = "%d-%m-%Y";

/// Parse a provider-format date of birth.
///
/// Returns `None` for anything that is not exactly `DD-MM-YYYY` or does not
/// name a real calendar date.
pub fn parse_provider_dob(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[2] == b'-'
        && bytes[5] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, PROVIDER_DOB_FORMAT).ok()
}

/// Format a date of birth for a provider request.
pub fn format_provider_dob(date: NaiveDate) -> String {
    date.format(PROVIDER_DOB_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_month_year() {
        assert_eq!(
            parse_provider_dob("07-03-1991"),
            NaiveDate::from_ymd_opt(1991, 3, 7)
        );
    }

    #[test]
    fn rejects_other_layouts() {
        for raw in ["1991-03-07", "7-3-1991", "07/03/1991", "07-03-91", "", "garbage"] {
            assert_eq!(parse_provider_dob(raw), None, "{raw}");
        }
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_provider_dob("31-02-1990"), None);
        assert_eq!(parse_provider_dob("00-01-1990"), None);
    }

    #[test]
    fn formats_with_zero_padding() {
        let date = NaiveDate::from_ymd_opt(1988, 1, 5).unwrap();
        assert_eq!(format_provider_dob(date), "05-01-1988");
    }
}
