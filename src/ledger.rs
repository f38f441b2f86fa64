use std::collections::HashSet;
use std::str::FromStr;

use thiserror::Error;

use crate::dates::parse_date_str;
use crate::error::{MilkbookError, Result};
use crate::models::{derive_amount, Field, Record, RecordKey, Session, UserId};
use crate::users::{MAX_USER_ID, MIN_USER_ID};

pub const MIN_PERCENTAGE: f64 = 5.0;
pub const MAX_PERCENTAGE: f64 = 10.0;

/// A record as typed into the entry form (or stringified from a sheet row),
/// before any validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    pub date: String,
    pub session: String,
    pub id: String,
    pub quantity: String,
    pub percentage: String,
    /// Supplied amount; derived from quantity and percentage when absent.
    pub amount: Option<f64>,
}

impl FromStr for Entry {
    type Err = MilkbookError;

    /// `date,session,id,quantity,percentage`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [date, session, id, quantity, percentage] = parts.as_slice() else {
            return Err(MilkbookError::MalformedEntry(s.to_string()));
        };
        Ok(Self {
            date: date.to_string(),
            session: session.to_string(),
            id: id.to_string(),
            quantity: quantity.to_string(),
            percentage: percentage.to_string(),
            amount: None,
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("User ID is required.")]
    IdRequired,
    #[error("User ID must be an integer.")]
    IdNotInteger,
    #[error("User ID must be between 1 and 20.")]
    IdOutOfRange,
    #[error("Date is required.")]
    DateRequired,
    #[error("Session is required.")]
    SessionRequired,
    #[error("Session must be AM or PM.")]
    SessionInvalid,
    #[error("Quantity is required.")]
    QuantityRequired,
    #[error("Quantity must be a number.")]
    QuantityNotNumber,
    #[error("Quantity must be greater than 0.0.")]
    QuantityNotPositive,
    #[error("Percentage is required.")]
    PercentageRequired,
    #[error("Percentage must be a number.")]
    PercentageNotNumber,
    #[error("Percentage must be between 5.0 and 10.0.")]
    PercentageOutOfRange,
    #[error("Duplicate entry: same Date, Session and User ID already exists.")]
    Duplicate,
}

impl Violation {
    /// The form field this violation is displayed against.
    pub fn field(&self) -> Field {
        match self {
            Self::IdRequired | Self::IdNotInteger | Self::IdOutOfRange | Self::Duplicate => Field::Id,
            Self::DateRequired => Field::Date,
            Self::SessionRequired | Self::SessionInvalid => Field::Session,
            Self::QuantityRequired | Self::QuantityNotNumber | Self::QuantityNotPositive => {
                Field::Quantity
            }
            Self::PercentageRequired | Self::PercentageNotNumber | Self::PercentageOutOfRange => {
                Field::Percentage
            }
        }
    }
}

/// All violations for one rejected row or form entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Sheet row number (1-based, header is row 1) or form entry position.
    pub row: usize,
    pub violations: Vec<Violation>,
}

impl Rejection {
    pub fn issues(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn is_duplicate(&self) -> bool {
        self.violations.contains(&Violation::Duplicate)
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn validate_id(raw: &str) -> std::result::Result<i64, Violation> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(Violation::IdRequired);
    }
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Violation::IdNotInteger);
    }
    let n: i64 = s.parse().map_err(|_| Violation::IdNotInteger)?;
    if !(MIN_USER_ID..=MAX_USER_ID).contains(&n) {
        return Err(Violation::IdOutOfRange);
    }
    Ok(n)
}

fn validate_date(raw: &str) -> std::result::Result<String, Violation> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(Violation::DateRequired);
    }
    Ok(parse_date_str(s))
}

fn validate_session(raw: &str) -> std::result::Result<Session, Violation> {
    match raw.trim() {
        "" => Err(Violation::SessionRequired),
        "AM" => Ok(Session::Am),
        "PM" => Ok(Session::Pm),
        _ => Err(Violation::SessionInvalid),
    }
}

fn validate_quantity(raw: &str) -> std::result::Result<f64, Violation> {
    if raw.trim().is_empty() {
        return Err(Violation::QuantityRequired);
    }
    let n = parse_number(raw).ok_or(Violation::QuantityNotNumber)?;
    if n <= 0.0 {
        return Err(Violation::QuantityNotPositive);
    }
    Ok(n)
}

fn validate_percentage(raw: &str) -> std::result::Result<f64, Violation> {
    if raw.trim().is_empty() {
        return Err(Violation::PercentageRequired);
    }
    let n = parse_number(raw).ok_or(Violation::PercentageNotNumber)?;
    if !(MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&n) {
        return Err(Violation::PercentageOutOfRange);
    }
    Ok(n)
}

/// Run every field validator and report all failures together.
/// Uniqueness is checked separately, by the store.
pub fn validate_entry(entry: &Entry) -> std::result::Result<Record, Vec<Violation>> {
    let id = validate_id(&entry.id);
    let date = validate_date(&entry.date);
    let session = validate_session(&entry.session);
    let quantity = validate_quantity(&entry.quantity);
    let percentage = validate_percentage(&entry.percentage);

    match (id, date, session, quantity, percentage) {
        (Ok(id), Ok(date), Ok(session), Ok(quantity), Ok(percentage)) => {
            let amount = entry
                .amount
                .filter(|a| a.is_finite() && *a != 0.0)
                .unwrap_or_else(|| derive_amount(quantity, percentage));
            Ok(Record {
                date,
                session,
                id: UserId::Number(id),
                quantity,
                percentage,
                amount,
                saved: false,
            })
        }
        (id, date, session, quantity, percentage) => Err([
            id.err(),
            date.err(),
            session.err(),
            quantity.err(),
            percentage.err(),
        ]
        .into_iter()
        .flatten()
        .collect()),
    }
}

/// The in-memory record store. Operations take the store by value (or borrow
/// it) and hand back the updated store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn keys(&self) -> HashSet<RecordKey> {
        self.records.iter().map(Record::key).collect()
    }

    /// Append coerced records unconditionally. Duplicate keys are kept.
    pub fn ingest_lenient(mut self, records: Vec<Record>) -> Self {
        self.records.extend(records);
        self
    }

    /// Validate each numbered entry and commit the ones that pass. Entries
    /// colliding with the store or with an earlier entry of the same batch
    /// are rejected as duplicates.
    pub fn ingest_strict(mut self, entries: Vec<(usize, Entry)>) -> (Self, Vec<Rejection>) {
        let (accepted, rejected) = self.check_batch(&entries);
        self.records.extend(accepted);
        (self, rejected)
    }

    /// Commit a batch of form entries. Any violation rejects the whole batch;
    /// on success every record in the store is marked saved.
    pub fn commit_form(&self, entries: &[Entry]) -> Result<Self> {
        let numbered: Vec<(usize, Entry)> = entries
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, e)| (i + 1, e))
            .collect();
        let (accepted, rejected) = self.check_batch(&numbered);
        if !rejected.is_empty() {
            return Err(MilkbookError::Rejected(rejected));
        }
        let mut records = self.records.clone();
        records.extend(accepted);
        for record in &mut records {
            record.saved = true;
        }
        Ok(Self { records })
    }

    fn check_batch(&self, entries: &[(usize, Entry)]) -> (Vec<Record>, Vec<Rejection>) {
        let existing = self.keys();
        let mut batch_keys = HashSet::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for (row, entry) in entries {
            match validate_entry(entry) {
                Err(violations) => rejected.push(Rejection {
                    row: *row,
                    violations,
                }),
                Ok(record) => {
                    let key = record.key();
                    if existing.contains(&key) || !batch_keys.insert(key) {
                        rejected.push(Rejection {
                            row: *row,
                            violations: vec![Violation::Duplicate],
                        });
                    } else {
                        accepted.push(record);
                    }
                }
            }
        }
        (accepted, rejected)
    }

    /// Remove the record at a 1-based table position.
    pub fn remove(mut self, position: usize) -> Result<(Self, Record)> {
        if position == 0 || position > self.records.len() {
            return Err(MilkbookError::RowOutOfRange(position));
        }
        let removed = self.records.remove(position - 1);
        Ok((self, removed))
    }

    pub fn clear(self) -> Self {
        Self::new()
    }

    pub fn mark_saved(mut self) -> Self {
        for record in &mut self.records {
            record.saved = true;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, session: &str, id: &str, qty: &str, pct: &str) -> Entry {
        Entry {
            date: date.into(),
            session: session.into(),
            id: id.into(),
            quantity: qty.into(),
            percentage: pct.into(),
            amount: None,
        }
    }

    fn lenient_record(date: &str, session: Session, id: i64) -> Record {
        Record {
            date: date.into(),
            session,
            id: UserId::Number(id),
            quantity: 5.0,
            percentage: 6.0,
            amount: derive_amount(5.0, 6.0),
            saved: false,
        }
    }

    #[test]
    fn test_valid_entry_derives_amount() {
        let rec = validate_entry(&entry("2025-03-10", "AM", "4", "10", "7")).unwrap();
        assert_eq!(rec.id, UserId::Number(4));
        assert_eq!(rec.session, Session::Am);
        assert_eq!(rec.amount, 525.0);
        assert!(!rec.saved);
    }

    #[test]
    fn test_supplied_amount_overrides_derived() {
        let mut e = entry("2025-03-10", "PM", "4", "10", "7");
        e.amount = Some(500.0);
        assert_eq!(validate_entry(&e).unwrap().amount, 500.0);
    }

    #[test]
    fn test_form_date_is_normalized() {
        let rec = validate_entry(&entry("10/03/2025", "AM", "1", "2", "6")).unwrap();
        assert_eq!(rec.date, "2025-03-10");
    }

    #[test]
    fn test_percentage_bounds() {
        let low = validate_entry(&entry("2025-03-10", "AM", "1", "2", "4.9")).unwrap_err();
        assert_eq!(low, vec![Violation::PercentageOutOfRange]);
        assert!(validate_entry(&entry("2025-03-10", "AM", "1", "2", "10.0")).is_ok());
        assert!(validate_entry(&entry("2025-03-10", "AM", "1", "2", "5.0")).is_ok());
        let high = validate_entry(&entry("2025-03-10", "AM", "1", "2", "10.01")).unwrap_err();
        assert_eq!(high, vec![Violation::PercentageOutOfRange]);
    }

    #[test]
    fn test_quantity_must_be_strictly_positive() {
        let zero = validate_entry(&entry("2025-03-10", "AM", "1", "0", "6")).unwrap_err();
        assert_eq!(zero, vec![Violation::QuantityNotPositive]);
        let text = validate_entry(&entry("2025-03-10", "AM", "1", "lots", "6")).unwrap_err();
        assert_eq!(text, vec![Violation::QuantityNotNumber]);
        assert!(validate_entry(&entry("2025-03-10", "AM", "1", "0.1", "6")).is_ok());
    }

    #[test]
    fn test_id_rules() {
        let check = |id: &str| validate_entry(&entry("2025-03-10", "AM", id, "1", "6"));
        assert_eq!(check("").unwrap_err(), vec![Violation::IdRequired]);
        assert_eq!(check("3.5").unwrap_err(), vec![Violation::IdNotInteger]);
        assert_eq!(check("abc").unwrap_err(), vec![Violation::IdNotInteger]);
        assert_eq!(check("0").unwrap_err(), vec![Violation::IdOutOfRange]);
        assert_eq!(check("21").unwrap_err(), vec![Violation::IdOutOfRange]);
        assert!(check("+20").is_ok());
        assert!(check(" 1 ").is_ok());
    }

    #[test]
    fn test_session_must_be_exact() {
        let check = |s: &str| validate_entry(&entry("2025-03-10", s, "1", "1", "6"));
        assert_eq!(check("").unwrap_err(), vec![Violation::SessionRequired]);
        assert_eq!(check("am").unwrap_err(), vec![Violation::SessionInvalid]);
        assert!(check("PM").is_ok());
    }

    #[test]
    fn test_all_failing_fields_reported_together() {
        let errs = validate_entry(&entry("", "X", "99", "", "abc")).unwrap_err();
        assert_eq!(
            errs,
            vec![
                Violation::IdOutOfRange,
                Violation::DateRequired,
                Violation::SessionInvalid,
                Violation::QuantityRequired,
                Violation::PercentageNotNumber,
            ]
        );
        let fields: Vec<Field> = errs.iter().map(Violation::field).collect();
        assert_eq!(
            fields,
            vec![Field::Id, Field::Date, Field::Session, Field::Quantity, Field::Percentage]
        );
    }

    #[test]
    fn test_strict_rejects_second_copy_of_same_key() {
        let e = entry("2025-03-10", "AM", "3", "4", "6");
        let (store, rejected) = RecordStore::new().ingest_strict(vec![(2, e.clone())]);
        assert!(rejected.is_empty());
        let (store, rejected) = store.ingest_strict(vec![(2, e)]);
        assert_eq!(store.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].is_duplicate());
        assert_eq!(rejected[0].violations[0].field(), Field::Id);
    }

    #[test]
    fn test_strict_rejects_duplicates_within_one_batch() {
        let e = entry("2025-03-10", "AM", "3", "4", "6");
        let other = entry("2025-03-10", "PM", "3", "4", "6");
        let (store, rejected) =
            RecordStore::new().ingest_strict(vec![(2, e.clone()), (3, other), (4, e)]);
        assert_eq!(store.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].row, 4);
    }

    #[test]
    fn test_strict_batch_is_partial_success() {
        let good = entry("2025-03-10", "AM", "3", "4", "6");
        let bad = entry("2025-03-10", "AM", "3", "0", "4");
        let (store, rejected) = RecordStore::new().ingest_strict(vec![(2, bad), (3, good)]);
        assert_eq!(store.len(), 1);
        assert_eq!(rejected[0].row, 2);
        assert_eq!(
            rejected[0].issues(),
            "Quantity must be greater than 0.0. | Percentage must be between 5.0 and 10.0."
        );
    }

    #[test]
    fn test_lenient_keeps_both_copies_of_same_key() {
        let rec = lenient_record("2025-03-10", Session::Am, 3);
        let store = RecordStore::new()
            .ingest_lenient(vec![rec.clone()])
            .ingest_lenient(vec![rec]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].key(), store.records()[1].key());
    }

    #[test]
    fn test_strict_sees_keys_from_lenient_records() {
        let store = RecordStore::new().ingest_lenient(vec![lenient_record("2025-03-10", Session::Am, 3)]);
        let (store, rejected) = store.ingest_strict(vec![(1, entry("2025-03-10", "AM", "3", "1", "6"))]);
        assert_eq!(store.len(), 1);
        assert!(rejected[0].is_duplicate());
    }

    #[test]
    fn test_commit_form_is_all_or_nothing() {
        let store = RecordStore::new().ingest_lenient(vec![lenient_record("2025-03-01", Session::Pm, 1)]);
        let entries = vec![
            entry("2025-03-10", "AM", "3", "4", "6"),
            entry("2025-03-10", "AM", "3", "4", "6"),
        ];
        match store.commit_form(&entries) {
            Err(MilkbookError::Rejected(rej)) => {
                assert_eq!(rej.len(), 1);
                assert_eq!(rej[0].row, 2);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(store.len(), 1);

        let committed = store.commit_form(&entries[..1]).unwrap();
        assert_eq!(committed.len(), 2);
        assert!(committed.records().iter().all(|r| r.saved));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = RecordStore::new().ingest_lenient(vec![
            lenient_record("2025-03-01", Session::Am, 1),
            lenient_record("2025-03-02", Session::Am, 2),
        ]);
        let (store, removed) = store.remove(1).unwrap();
        assert_eq!(removed.id, UserId::Number(1));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.clone().remove(5), Err(MilkbookError::RowOutOfRange(5))));
        assert!(matches!(store.clone().remove(0), Err(MilkbookError::RowOutOfRange(0))));
        assert!(store.clear().is_empty());
    }

    #[test]
    fn test_entry_from_str() {
        let e: Entry = "2025-03-10, AM, 4, 10, 7".parse().unwrap();
        assert_eq!(e.session, "AM");
        assert_eq!(e.percentage, "7");
        assert!("2025-03-10,AM,4".parse::<Entry>().is_err());
    }
}
