use chrono::{Datelike, NaiveDate};

use crate::dates::{iso_from_date, last_day_of_month, parse_date_str, parse_iso};
use crate::error::{MilkbookError, Result};
use crate::ledger::RecordStore;
use crate::models::Record;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Statement selection criteria. Dates are raw user input in any accepted
/// date form; ids are inclusive bounds.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub id_min: Option<i64>,
    pub id_max: Option<i64>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    /// Snap the date window to the half month containing the base date.
    pub snap: bool,
}

impl ReportFilter {
    fn has_id_bounds(&self) -> bool {
        self.id_min.is_some() || self.id_max.is_some()
    }

    fn accepts_id(&self, record: &Record) -> bool {
        if !self.has_id_bounds() {
            return true;
        }
        let Some(id) = record.id.as_number() else {
            return false;
        };
        self.id_min.map_or(true, |min| id >= min) && self.id_max.map_or(true, |max| id <= max)
    }
}

/// Days 1-15 or 16-end of the month containing `base`.
pub fn half_month_window(base: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (year, month) = (base.year(), base.month());
    let (first, last) = if base.day() <= 15 {
        (1, 15)
    } else {
        (16, last_day_of_month(year, month))
    };
    // Both days exist in every month.
    let day = |d| NaiveDate::from_ymd_opt(year, month, d).unwrap_or(base);
    (day(first), day(last))
}

fn parse_filter_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    parse_iso(&parse_date_str(raw))
        .map(Some)
        .ok_or_else(|| MilkbookError::InvalidDate(raw.to_string()))
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The filtered snapshot handed to the layout engine.
#[derive(Debug, Clone)]
pub struct Selection {
    pub records: Vec<Record>,
    /// Effective inclusive date bounds, after snapping.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// The bounds are a half-month window.
    pub snapped: bool,
}

impl Selection {
    /// The half-month window, when there is one; cards then list every date
    /// in it. Unsnapped bounds only filter records.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        if !self.snapped {
            return None;
        }
        self.from.zip(self.to)
    }
}

fn effective_bounds(filter: &ReportFilter) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let from = parse_filter_date(filter.from_date.as_deref())?;
    let to = parse_filter_date(filter.to_date.as_deref())?;

    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(MilkbookError::FromAfterTo {
                from: iso_from_date(f),
                to: iso_from_date(t),
            });
        }
    }
    if !filter.snap {
        return Ok((from, to));
    }
    let Some(base) = from.or(to) else {
        return Ok((None, None));
    };
    if let Some(t) = to {
        if !same_month(base, t) {
            return Err(MilkbookError::SpansMonths {
                from: iso_from_date(base),
                to: iso_from_date(t),
            });
        }
    }
    let (start, end) = half_month_window(base);
    Ok((Some(start), Some(end)))
}

/// Apply the filter to the store. Every precondition is checked before any
/// record is looked at.
pub fn select(store: &RecordStore, filter: &ReportFilter) -> Result<Selection> {
    if store.is_empty() {
        return Err(MilkbookError::NoRecords);
    }
    if let (Some(min), Some(max)) = (filter.id_min, filter.id_max) {
        if min > max {
            return Err(MilkbookError::InvalidIdRange { min, max });
        }
    }
    let (from, to) = effective_bounds(filter)?;
    let from_iso = from.map(iso_from_date);
    let to_iso = to.map(iso_from_date);

    let records: Vec<Record> = store
        .records()
        .iter()
        .filter(|r| filter.accepts_id(r))
        .filter(|r| from_iso.as_deref().map_or(true, |f| r.date.as_str() >= f))
        .filter(|r| to_iso.as_deref().map_or(true, |t| r.date.as_str() <= t))
        .cloned()
        .collect();

    if records.is_empty() {
        return Err(MilkbookError::NoMatchingRows);
    }
    tracing::info!(
        selected = records.len(),
        from = from_iso.as_deref().unwrap_or(""),
        to = to_iso.as_deref().unwrap_or(""),
        "records selected for statements"
    );
    Ok(Selection {
        records,
        from,
        to,
        snapped: filter.snap && from.is_some(),
    })
}
