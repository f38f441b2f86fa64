use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::dates::parse_iso;
use crate::error::Result;
use crate::ledger::RecordStore;
use crate::models::{Session, UserId};

pub const DEFAULT_FILENAME: &str = "table-data.xlsx";
pub const SHEET_NAME: &str = "Sheet1";

const COLUMNS: [(&str, f64); 6] = [
    ("Date", 12.0),
    ("Session", 10.0),
    ("User ID", 10.0),
    ("Quantity", 12.0),
    ("Percentage", 12.0),
    ("Amount", 14.0),
];

const DATE_FORMAT: &str = "dd-mmm-yy";

/// Date cells only from 1900-03-01 on, past Excel's phantom 1900-02-29.
fn excel_date(iso: &str) -> Option<ExcelDateTime> {
    let d = parse_iso(iso)?;
    if d < NaiveDate::from_ymd_opt(1900, 3, 1)? {
        return None;
    }
    let year = u16::try_from(d.year()).ok()?;
    ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8).ok()
}

/// Write the store as a single-sheet workbook with the fixed column order.
/// Dates become date cells shown as `dd-mmm-yy`; anything Excel cannot hold
/// as a date is written as its text.
pub fn write_workbook(store: &RecordStore, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    for (col, (title, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, *width)?;
        sheet.write_string_with_format(0, col, *title, &bold)?;
    }

    for (i, record) in store.records().iter().enumerate() {
        let row = i as u32 + 1;
        match excel_date(&record.date) {
            Some(date) => {
                sheet.write_datetime_with_format(row, 0, &date, &date_format)?;
            }
            None => {
                sheet.write_string(row, 0, &record.date)?;
            }
        }
        if record.session != Session::Unknown {
            sheet.write_string(row, 1, record.session.as_str())?;
        }
        match &record.id {
            UserId::Number(n) => {
                sheet.write_number(row, 2, *n as f64)?;
            }
            UserId::Text(s) => {
                sheet.write_string(row, 2, s)?;
            }
            UserId::Missing => {}
        }
        sheet.write_number(row, 3, record.quantity)?;
        sheet.write_number(row, 4, record.percentage)?;
        sheet.write_number(row, 5, record.amount)?;
    }

    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = store.len(), "workbook written");
    Ok(())
}
