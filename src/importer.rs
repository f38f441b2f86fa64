use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::dates::{excel_serial_to_date, parse_date_to_iso};
use crate::error::{MilkbookError, Result};
use crate::headers::{resolve_columns, ColumnMap};
use crate::ledger::{Entry, RecordStore, Rejection};
use crate::models::{derive_amount, Cell, Field, Record, Session, UserId};
use crate::parse::{id_from_cell, number_from_cell, percentage_from_cell, session_from_cell};

// ---------------------------------------------------------------------------
// Sheet decoding
// ---------------------------------------------------------------------------

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

fn read_workbook(file_path: &Path) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(file_path)
        .map_err(|e| MilkbookError::Spreadsheet(e.to_string()))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(MilkbookError::NoSheets)?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| MilkbookError::Spreadsheet(e.to_string()))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect())
}

fn read_csv(file_path: &Path) -> Result<Vec<Vec<Cell>>> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Decode the first sheet of a workbook (or a CSV file) into rows of cells.
pub fn read_sheet(file_path: &Path) -> Result<Vec<Vec<Cell>>> {
    let is_csv = file_path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let rows = if is_csv {
        read_csv(file_path)?
    } else {
        read_workbook(file_path)?
    };
    tracing::debug!(file = %file_path.display(), rows = rows.len(), "decoded sheet");
    if rows.is_empty() {
        return Err(MilkbookError::EmptySheet);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

/// One data row after per-field parsing, before an ingestion policy is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub date: String,
    pub session: Session,
    pub id: UserId,
    pub quantity: Option<f64>,
    pub percentage: Option<f64>,
    pub amount: Option<f64>,
    /// Text of numeric cells that did not parse, kept for strict diagnostics.
    unparsed: Vec<(Field, String)>,
}

impl RawRow {
    fn unparsed_text(&self, field: Field) -> String {
        self.unparsed
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| s.clone())
            .unwrap_or_default()
    }

    /// Lenient coercion: anything missing becomes 0 and the row is kept.
    pub fn into_record(self) -> Record {
        Record {
            date: self.date,
            session: self.session,
            id: self.id,
            quantity: self.quantity.unwrap_or(0.0),
            percentage: self.percentage.unwrap_or(0.0),
            amount: self.amount.unwrap_or(0.0),
            saved: false,
        }
    }

    /// The row as strict-path form input.
    pub fn to_entry(&self) -> Entry {
        let number = |value: Option<f64>, field: Field| {
            value
                .map(|n| n.to_string())
                .unwrap_or_else(|| self.unparsed_text(field))
        };
        Entry {
            date: self.date.clone(),
            session: self.session.as_str().to_string(),
            id: self.id.to_string(),
            quantity: number(self.quantity, Field::Quantity),
            percentage: number(self.percentage, Field::Percentage),
            amount: self.amount,
        }
    }
}

/// Parse one data row through the column map. All-blank rows yield `None`.
pub fn normalize_row(row: &[Cell], map: &ColumnMap) -> Option<RawRow> {
    if row.iter().all(Cell::is_blank) {
        return None;
    }
    let mut raw = RawRow {
        date: String::new(),
        session: Session::Unknown,
        id: UserId::Missing,
        quantity: None,
        percentage: None,
        amount: None,
        unparsed: Vec::new(),
    };
    for (idx, field) in map.iter() {
        let cell = row.get(idx).unwrap_or(&Cell::Empty);
        match field {
            Field::Date => raw.date = parse_date_to_iso(cell),
            Field::Session => raw.session = session_from_cell(cell),
            Field::Id => raw.id = id_from_cell(cell),
            Field::Quantity => raw.quantity = number_from_cell(cell),
            Field::Percentage => raw.percentage = percentage_from_cell(cell),
            Field::Amount => raw.amount = number_from_cell(cell),
        }
        let parsed = match field {
            Field::Quantity => raw.quantity.is_some(),
            Field::Percentage => raw.percentage.is_some(),
            _ => true,
        };
        if !parsed && !cell.is_blank() {
            raw.unparsed.push((field, cell.to_text().trim().to_string()));
        }
    }
    if raw.amount.is_none() {
        if let (Some(q), Some(p)) = (raw.quantity, raw.percentage) {
            raw.amount = Some(derive_amount(q, p));
        }
    }
    Some(raw)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// How sheet rows enter the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportMode {
    /// Coerce bad values to 0 and keep every non-blank row, duplicates included.
    Lenient,
    /// Validate every field and reject duplicates; failing rows are reported.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub source: String,
    pub imported: usize,
    pub blank_rows: usize,
    pub rejected: Vec<Rejection>,
}

/// Ingest decoded rows (header first) into the store under the given policy.
pub fn ingest_rows(
    store: RecordStore,
    rows: &[Vec<Cell>],
    mode: ImportMode,
) -> (RecordStore, ImportSummary) {
    let map = resolve_columns(rows);
    if map.is_empty() {
        tracing::warn!("no recognised column headers");
    }
    let mut summary = ImportSummary::default();
    let mut parsed = Vec::new();

    // Sheet row numbers are 1-based with the header on row 1.
    for (offset, row) in rows.iter().enumerate().skip(1) {
        match normalize_row(row, &map) {
            Some(raw) => parsed.push((offset + 1, raw)),
            None => summary.blank_rows += 1,
        }
    }

    let before = store.len();
    let store = match mode {
        ImportMode::Lenient => {
            store.ingest_lenient(parsed.into_iter().map(|(_, raw)| raw.into_record()).collect())
        }
        ImportMode::Strict => {
            let entries = parsed
                .iter()
                .map(|(row, raw)| (*row, raw.to_entry()))
                .collect();
            let (store, rejected) = store.ingest_strict(entries);
            for rejection in &rejected {
                tracing::warn!(
                    row = rejection.row,
                    duplicate = rejection.is_duplicate(),
                    issues = %rejection.issues(),
                    "row skipped"
                );
            }
            summary.rejected = rejected;
            store
        }
    };
    summary.imported = store.len() - before;
    (store, summary)
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Build a fresh store from several files, in order. Every file is decoded
/// before any is ingested.
pub fn load_files<P: AsRef<Path>>(
    files: &[P],
    mode: ImportMode,
) -> Result<(RecordStore, Vec<ImportSummary>)> {
    let decoded = files
        .iter()
        .map(|f| read_sheet(f.as_ref()).map(|rows| (f.as_ref(), rows)))
        .collect::<Result<Vec<_>>>()?;

    let mut store = RecordStore::new();
    let mut summaries = Vec::new();
    for (path, rows) in decoded {
        let (next, mut summary) = ingest_rows(store, &rows, mode);
        summary.source = source_name(path);
        store = next;
        summaries.push(summary);
    }
    Ok((store, summaries))
}
