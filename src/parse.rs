use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Cell, Session, UserId};

fn dotted_am() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^A\.?M\.?$").expect("valid regex"))
}

fn dotted_pm() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^P\.?M\.?$").expect("valid regex"))
}

/// Map free-text or numeric session tokens onto AM/PM.
///
/// Exact forms win (`AM`, `A.M.`, `A`, `1` and the PM equivalents), then
/// substring containment of `AM`/`PM` as a last resort.
pub fn normalize_session(raw: &str) -> Session {
    let s: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return Session::Unknown;
    }
    if s == "A" || dotted_am().is_match(&s) {
        return Session::Am;
    }
    if s == "P" || dotted_pm().is_match(&s) {
        return Session::Pm;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.parse::<u64>() {
        Ok(1) => return Session::Am,
        Ok(2) => return Session::Pm,
        _ => {}
    }
    if s.contains("AM") {
        Session::Am
    } else if s.contains("PM") {
        Session::Pm
    } else {
        Session::Unknown
    }
}

pub fn session_from_cell(cell: &Cell) -> Session {
    match cell {
        Cell::Empty => Session::Unknown,
        other => normalize_session(&other.to_text()),
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Quantity and amount cells: a number, or text with thousands separators.
pub fn number_from_cell(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) if !s.trim().is_empty() => {
            parse_finite(s).or_else(|| parse_finite(&s.replace(',', "")))
        }
        _ => None,
    }
}

/// Percentage cells may carry a trailing `%` sign.
pub fn percentage_from_cell(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => {
            let cleaned = s.replacen('%', "", 1).replace(',', "");
            if cleaned.trim().is_empty() {
                return None;
            }
            parse_finite(&cleaned)
        }
        _ => None,
    }
}

/// Numeric ids are truncated to an integer; anything else is kept as trimmed text.
pub fn id_from_cell(cell: &Cell) -> UserId {
    match cell {
        Cell::Number(n) if n.is_finite() => UserId::Number(n.trunc() as i64),
        Cell::Empty => UserId::Missing,
        other => {
            let text = other.to_text();
            let trimmed = text.trim();
            match parse_finite(trimmed) {
                Some(n) => UserId::Number(n.trunc() as i64),
                None if trimmed.is_empty() => UserId::Missing,
                None => UserId::Text(trimmed.to_string()),
            }
        }
    }
}
