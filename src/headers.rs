use std::collections::BTreeMap;

use crate::models::{Cell, Field};

/// Column index -> canonical field. Unmapped columns are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    columns: BTreeMap<usize, Field>,
}

impl ColumnMap {
    #[cfg(test)]
    pub fn get(&self, idx: usize) -> Option<Field> {
        self.columns.get(&idx).copied()
    }

    pub fn contains_field(&self, field: Field) -> bool {
        self.columns.values().any(|f| *f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Field)> + '_ {
        self.columns.iter().map(|(i, f)| (*i, *f))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn insert(&mut self, idx: usize, field: Field) {
        self.columns.insert(idx, field);
    }

    /// Date, session, id, quantity, percentage in columns 0..4; amount in 5
    /// when the sheet is at least six columns wide.
    pub fn positional(width: usize) -> Self {
        let mut map = Self::default();
        for (idx, field) in [
            Field::Date,
            Field::Session,
            Field::Id,
            Field::Quantity,
            Field::Percentage,
        ]
        .into_iter()
        .enumerate()
        {
            map.insert(idx, field);
        }
        if width >= 6 {
            map.insert(5, Field::Amount);
        }
        map
    }
}

const EXACT_ALIASES: &[(Field, &[&str])] = &[
    (Field::Date, &["date", "day"]),
    (Field::Session, &["session", "am/pm", "am-pm", "ampm"]),
    (
        Field::Id,
        &["user id", "userid", "user_id", "id", "identifier", "ident", "no", "number"],
    ),
    (Field::Quantity, &["quantity", "qty", "q"]),
    (Field::Percentage, &["percentage", "pct", "percent", "%"]),
    (Field::Amount, &["amount", "amt", "value", "total"]),
];

fn fuzzy_match(key: &str) -> Option<Field> {
    if key.contains("date") {
        Some(Field::Date)
    } else if key.contains("session") {
        Some(Field::Session)
    } else if key.contains("user") && key.contains("id") {
        Some(Field::Id)
    } else if key.contains("id") {
        Some(Field::Id)
    } else if key.contains("qty") || key.contains("quant") {
        Some(Field::Quantity)
    } else if key.contains("pct") || key.contains("percent") || key.contains('%') {
        Some(Field::Percentage)
    } else if key.contains("amt") || key.contains("amount") {
        Some(Field::Amount)
    } else {
        None
    }
}

pub fn match_header(raw: &str) -> Option<Field> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    EXACT_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(field, _)| *field)
        .or_else(|| fuzzy_match(&key))
}

/// Map a header row by alias, exact first and then by substring.
pub fn map_headers(header: &[Cell]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (idx, cell) in header.iter().enumerate() {
        if let Some(field) = match_header(&cell.to_text()) {
            map.insert(idx, field);
        }
    }
    map
}

/// Column assignment for a whole sheet: header aliases, or the positional
/// layout when no header names a date column and the sheet has data rows
/// and at least four columns.
pub fn resolve_columns(rows: &[Vec<Cell>]) -> ColumnMap {
    let Some(header) = rows.first() else {
        return ColumnMap::default();
    };
    let mapped = map_headers(header);
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if !mapped.contains_field(Field::Date) && rows.len() >= 2 && width >= 4 {
        tracing::info!(width, "no date header found, using positional column layout");
        return ColumnMap::positional(width);
    }
    tracing::debug!(mapped = mapped.len(), width, "header columns mapped");
    mapped
}
