use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::Cell;

const MONTH_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Textual forms tried before the numeric day-first pattern.
const TEXT_DATE_FORMATS: &[&str] = &[
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

const TEXT_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

fn iso_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"))
}

fn year_first_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})[/.](\d{1,2})[/.](\d{1,2})$").expect("valid regex"))
}

fn day_first_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/\-.\s](\d{1,2})[/\-.\s](\d{2,4})$").expect("valid regex")
    })
}

/// Zero-padded `YYYY-MM-DD`.
pub fn iso_from_calendar_date(year: i32, month: u32, day: u32) -> String {
    format!("{year:04}-{month:02}-{day:02}")
}

pub fn iso_from_date(date: NaiveDate) -> String {
    iso_from_calendar_date(date.year(), date.month(), date.day())
}

pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    if !iso_pattern().is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// `2025-03-10` -> `10-Mar-25`. Anything that is not ISO-shaped comes back unchanged.
pub fn display_from_iso(iso: &str) -> String {
    let Some(caps) = iso_pattern().captures(iso) else {
        return iso.to_string();
    };
    let month: usize = caps[2].parse().unwrap_or(0);
    let month_name = match month {
        1..=12 => MONTH_SHORT[month - 1],
        _ => &caps[2],
    };
    format!("{}-{}-{}", &caps[3], month_name, &caps[1][2..])
}

/// Spreadsheet day serial (day 0 = 1899-12-30). Time-of-day fractions are dropped.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    // Far outside any plausible sheet; keeps Duration::days in range.
    if serial.abs() > 3_000_000.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

pub fn excel_serial_to_iso(serial: f64) -> Option<String> {
    excel_serial_to_date(serial).map(iso_from_date)
}

fn parse_text_date(s: &str) -> Option<NaiveDate> {
    if let Some(caps) = year_first_pattern().captures(s) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }
    for fmt in TEXT_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_day_first(s: &str) -> Option<NaiveDate> {
    let caps = day_first_pattern().captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Normalize any date-bearing cell to ISO. Never fails: text that cannot be
/// understood is returned trimmed but otherwise verbatim.
pub fn parse_date_to_iso(cell: &Cell) -> String {
    match cell {
        Cell::Date(d) => iso_from_date(*d),
        Cell::Number(n) => excel_serial_to_iso(*n).unwrap_or_else(|| n.to_string()),
        Cell::Text(raw) => parse_date_str(raw),
        Cell::Empty => String::new(),
    }
}

pub fn parse_date_str(raw: &str) -> String {
    let s = raw.trim();
    if iso_pattern().is_match(s) {
        return s.to_string();
    }
    if let Some(d) = parse_text_date(s) {
        return iso_from_date(d);
    }
    if let Some(d) = parse_day_first(s) {
        return iso_from_date(d);
    }
    s.to_string()
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Every calendar date from `from` to `to`, inclusive.
pub fn date_range(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_iso_from_calendar_date_pads() {
        assert_eq!(iso_from_calendar_date(2025, 3, 7), "2025-03-07");
        assert_eq!(iso_from_calendar_date(987, 12, 31), "0987-12-31");
    }

    #[test]
    fn test_display_from_iso() {
        assert_eq!(display_from_iso("2025-03-10"), "10-Mar-25");
        assert_eq!(display_from_iso("2024-12-01"), "01-Dec-24");
        assert_eq!(display_from_iso("not a date"), "not a date");
        assert_eq!(display_from_iso("2025-13-01"), "01-13-25");
        assert_eq!(display_from_iso(""), "");
    }

    #[test]
    fn test_excel_serial_to_iso() {
        assert_eq!(excel_serial_to_iso(45667.0).as_deref(), Some("2025-01-10"));
        assert_eq!(excel_serial_to_iso(0.0).as_deref(), Some("1899-12-30"));
        assert_eq!(excel_serial_to_iso(f64::NAN), None);
    }

    #[test]
    fn test_parse_date_sources() {
        let native = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(parse_date_to_iso(&Cell::Date(native)), "2025-03-10");
        assert_eq!(parse_date_to_iso(&Cell::Number(45726.0)), "2025-03-10");
        assert_eq!(parse_date_to_iso(&text(" 2025-03-10 ")), "2025-03-10");
        assert_eq!(parse_date_to_iso(&text("10-Mar-25")), "2025-03-10");
        assert_eq!(parse_date_to_iso(&text("March 10, 2025")), "2025-03-10");
        assert_eq!(parse_date_to_iso(&text("2025-03-10T06:30:00")), "2025-03-10");
        assert_eq!(parse_date_to_iso(&text("2025/3/10")), "2025-03-10");
    }

    #[test]
    fn test_parse_day_first_pattern() {
        assert_eq!(parse_date_to_iso(&text("10/03/2025")), "2025-03-10");
        assert_eq!(parse_date_to_iso(&text("1.3.25")), "2025-03-01");
        assert_eq!(parse_date_to_iso(&text("5 3 2025")), "2025-03-05");
        assert_eq!(parse_date_to_iso(&text("31-12-24")), "2024-12-31");
    }

    #[test]
    fn test_unparseable_text_is_returned_verbatim() {
        assert_eq!(parse_date_to_iso(&text("someday")), "someday");
        assert_eq!(parse_date_to_iso(&text("31/02/2025")), "31/02/2025");
        assert_eq!(parse_date_to_iso(&Cell::Empty), "");
    }

    #[test]
    fn test_parse_is_idempotent() {
        for raw in ["10/03/2025", "10-Mar-25", "2025-03-10", "March 10, 2025"] {
            let once = parse_date_to_iso(&text(raw));
            let twice = parse_date_to_iso(&text(&once));
            assert_eq!(once, twice, "input {raw}");
        }
        let serial = parse_date_to_iso(&Cell::Number(45726.0));
        assert_eq!(parse_date_to_iso(&text(&serial)), serial);
    }

    #[test]
    fn test_display_round_trip_from_any_source() {
        let sources = [
            Cell::Number(45726.0),
            text("10/03/2025"),
            text("10-Mar-25"),
            Cell::Date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
        ];
        for cell in &sources {
            assert_eq!(display_from_iso(&parse_date_to_iso(cell)), "10-Mar-25");
        }
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2025, 2), 28);
        assert_eq!(last_day_of_month(2024, 2), 29);
        assert_eq!(last_day_of_month(2025, 12), 31);
        assert_eq!(last_day_of_month(2025, 4), 30);
    }

    #[test]
    fn test_date_range_inclusive() {
        let from = NaiveDate::from_ymd_opt(2025, 2, 27).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let days: Vec<String> = date_range(from, to).map(iso_from_date).collect();
        assert_eq!(days, vec!["2025-02-27", "2025-02-28", "2025-03-01", "2025-03-02"]);
    }

    #[test]
    fn test_date_range_is_lazy_over_wide_spans() {
        let from = NaiveDate::from_ymd_opt(1000, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(9000, 12, 31).unwrap();
        let first: Vec<NaiveDate> = date_range(from, to).take(3).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first[2], NaiveDate::from_ymd_opt(1000, 1, 3).unwrap());
        assert_eq!(date_range(to, from).count(), 0);
    }
}
