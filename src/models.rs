use std::fmt;

use chrono::NaiveDate;

/// Fixed pricing factor: amount = quantity * percentage * PRICE_FACTOR.
pub const PRICE_FACTOR: f64 = 7.5;

/// Derived amount, rounded to two decimals.
pub fn derive_amount(quantity: f64, percentage: f64) -> f64 {
    (quantity * percentage * PRICE_FACTOR * 100.0).round() / 100.0
}

/// One decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Date(NaiveDate),
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Empty cells and blank strings both count as "no value".
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Session {
    Am,
    Pm,
    /// Unrecognised or missing session token.
    Unknown,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User identifier as ingested. Lenient import keeps non-numeric ids as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserId {
    Number(i64),
    Text(String),
    Missing,
}

impl UserId {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Missing => Ok(()),
        }
    }
}

/// Canonical field names a sheet column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Date,
    Session,
    Id,
    Quantity,
    Percentage,
    Amount,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Session => "Session",
            Self::Id => "User ID",
            Self::Quantity => "Quantity",
            Self::Percentage => "Percentage",
            Self::Amount => "Amount",
        }
    }
}

/// One quantity/percentage/amount observation for one user, date and session.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// ISO `YYYY-MM-DD` when the source date could be understood.
    pub date: String,
    pub session: Session,
    pub id: UserId,
    pub quantity: f64,
    pub percentage: f64,
    pub amount: f64,
    pub saved: bool,
}

impl Record {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date.clone(),
            session: self.session,
            id: self.id.clone(),
        }
    }
}

/// The identity of a record: (date, session, id) is unique in a strict store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub date: String,
    pub session: Session,
    pub id: UserId,
}
