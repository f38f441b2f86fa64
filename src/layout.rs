use std::collections::BTreeMap;

use crate::dates::{date_range, display_from_iso, iso_from_date, parse_iso};
use crate::models::{Record, Session};
use crate::reports::Selection;
use crate::users;

// A4 portrait (mm)
pub const A4_WIDTH: f32 = 210.0;
pub const A4_HEIGHT: f32 = 297.0;

/// Date, AM quantity/percentage/amount, PM quantity/percentage/amount.
pub const COLUMN_BUDGET: [f32; 7] = [12.0, 12.0, 12.0, 15.0, 12.0, 12.0, 15.0];

/// Fixed geometry of the statement document. All lengths in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub columns: usize,
    pub rows: usize,
    pub padding: f32,
    pub header_height: f32,
    /// AM/PM band above the column headers; 0 leaves it out.
    pub divider_height: f32,
    pub column_header_height: f32,
    pub footer_height: f32,
    pub row_capacity: usize,
    pub column_budget: [f32; 7],
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            margin: 6.0,
            columns: 2,
            rows: 2,
            padding: 4.0,
            header_height: 18.0,
            divider_height: 6.0,
            column_header_height: 12.0,
            footer_height: 30.0,
            row_capacity: 16,
            column_budget: COLUMN_BUDGET,
        }
    }
}

impl LayoutConfig {
    pub fn cards_per_page(&self) -> usize {
        (self.columns * self.rows).max(1)
    }

    pub fn card_width(&self) -> f32 {
        (self.page_width - self.margin * 2.0) / self.columns.max(1) as f32
    }

    pub fn card_height(&self) -> f32 {
        (self.page_height - self.margin * 2.0) / self.rows.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }
}

// ---------------------------------------------------------------------------
// Column geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub widths: Vec<f32>,
    /// Column edges, left to right: one more entry than `widths`.
    pub offsets: Vec<f32>,
}

impl ColumnLayout {
    pub fn left(&self, col: usize) -> f32 {
        self.offsets[col]
    }

    pub fn right(&self, col: usize) -> f32 {
        self.offsets[col + 1]
    }

    pub fn center(&self, col: usize) -> f32 {
        (self.left(col) + self.right(col)) / 2.0
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Fit budgeted widths into `available`, shrinking all of them by one common
/// factor when the budget is too wide. Edges start at `origin` and are
/// rounded to 0.01 mm.
pub fn scale_columns(budget: &[f32], available: f32, origin: f32) -> ColumnLayout {
    let total: f32 = budget.iter().sum();
    let scale = if total > available && total > 0.0 {
        available / total
    } else {
        1.0
    };
    let widths: Vec<f32> = budget.iter().map(|w| w * scale).collect();
    let mut offsets = Vec::with_capacity(widths.len() + 1);
    let mut cursor = origin;
    offsets.push(round2(cursor));
    for w in &widths {
        cursor += w;
        offsets.push(round2(cursor));
    }
    ColumnLayout { widths, offsets }
}

/// The bands of one card, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct CardGeometry {
    pub outer: Rect,
    pub header: Rect,
    pub divider: Option<Rect>,
    pub column_header: Rect,
    pub body: Rect,
    pub footer: Rect,
    pub columns: ColumnLayout,
    pub row_height: f32,
}

pub fn card_geometry(outer: Rect, cfg: &LayoutConfig) -> CardGeometry {
    let inner_x = outer.x + cfg.padding;
    let inner_w = outer.w - cfg.padding * 2.0;

    let header = Rect {
        h: cfg.header_height,
        ..outer
    };
    let divider_top = header.bottom();
    let divider = (cfg.divider_height > 0.0).then_some(Rect {
        x: inner_x,
        y: divider_top,
        w: inner_w,
        h: cfg.divider_height,
    });
    let column_header = Rect {
        x: inner_x,
        y: divider_top + divider.map_or(0.0, |d| d.h),
        w: inner_w,
        h: cfg.column_header_height,
    };
    let footer_top = outer.bottom() - cfg.footer_height;
    let body = Rect {
        x: inner_x,
        y: column_header.bottom(),
        w: inner_w,
        h: (footer_top - column_header.bottom()).max(0.0),
    };
    let footer = Rect {
        x: outer.x,
        y: footer_top,
        w: outer.w,
        h: cfg.footer_height,
    };
    CardGeometry {
        outer,
        header,
        divider,
        column_header,
        columns: scale_columns(&cfg.column_budget, inner_w, inner_x),
        row_height: body.h / cfg.row_capacity.max(1) as f32,
        body,
        footer,
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub slot: usize,
    pub column: usize,
    pub row: usize,
    pub rect: Rect,
}

/// Row-major slot for the `index`-th card.
pub fn place(index: usize, cfg: &LayoutConfig) -> Placement {
    let per_page = cfg.cards_per_page();
    let columns = cfg.columns.max(1);
    let slot = index % per_page;
    let (column, row) = (slot % columns, slot / columns);
    let (w, h) = (cfg.card_width(), cfg.card_height());
    Placement {
        page: index / per_page,
        slot,
        column,
        row,
        rect: Rect {
            x: cfg.margin + column as f32 * w,
            y: cfg.margin + row as f32 * h,
            w,
            h,
        },
    }
}

pub fn paginate(count: usize, cfg: &LayoutConfig) -> Vec<Placement> {
    (0..count).map(|i| place(i, cfg)).collect()
}

pub fn page_count(count: usize, cfg: &LayoutConfig) -> usize {
    count.div_ceil(cfg.cards_per_page())
}

/// A straight segment from (x1, y1) to (x2, y2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Cut lines between adjacent slot columns and rows. Identical on every page.
pub fn cut_guides(cfg: &LayoutConfig) -> Vec<Segment> {
    let (left, top) = (cfg.margin, cfg.margin);
    let right = cfg.page_width - cfg.margin;
    let bottom = cfg.page_height - cfg.margin;
    let vertical = (1..cfg.columns).map(|c| {
        let x = left + c as f32 * cfg.card_width();
        Segment {
            x1: x,
            y1: top,
            x2: x,
            y2: bottom,
        }
    });
    let horizontal = (1..cfg.rows).map(|r| {
        let y = top + r as f32 * cfg.card_height();
        Segment {
            x1: left,
            y1: y,
            x2: right,
            y2: y,
        }
    });
    vertical.chain(horizontal).collect()
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionEntry {
    pub quantity: f64,
    pub percentage: f64,
    pub amount: f64,
}

impl From<&Record> for SessionEntry {
    fn from(r: &Record) -> Self {
        Self {
            quantity: r.quantity,
            percentage: r.percentage,
            amount: r.amount,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaySlots {
    pub am: Option<SessionEntry>,
    pub pm: Option<SessionEntry>,
}

impl DaySlots {
    fn entries(&self) -> impl Iterator<Item = &SessionEntry> {
        self.am.iter().chain(self.pm.iter())
    }
}

/// Put an entry into its session slot. Explicit sessions replace whatever the
/// slot held; an unknown session takes the first empty slot, AM before PM.
/// Returns false when the entry had nowhere to go.
pub fn assign_session(slots: &mut DaySlots, session: Session, entry: SessionEntry) -> bool {
    match session {
        Session::Am => slots.am = Some(entry),
        Session::Pm => slots.pm = Some(entry),
        Session::Unknown if slots.am.is_none() => slots.am = Some(entry),
        Session::Unknown if slots.pm.is_none() => slots.pm = Some(entry),
        Session::Unknown => return false,
    }
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateRow {
    pub date: String,
    pub slots: DaySlots,
}

impl DateRow {
    /// Day of month for ISO dates, the display form otherwise.
    pub fn label(&self) -> String {
        match parse_iso(&self.date) {
            Some(d) => d.format("%-d").to_string(),
            None => display_from_iso(&self.date),
        }
    }
}

/// One user's statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: i64,
    pub name: Option<&'static str>,
    /// ISO bounds shown in the header.
    pub from: Option<String>,
    pub to: Option<String>,
    pub rows: Vec<DateRow>,
    pub total_quantity: f64,
    pub total_amount: f64,
}

impl Card {
    pub fn display_name(&self) -> &str {
        self.name.unwrap_or("—")
    }
}

fn build_card(
    id: i64,
    mut records: Vec<&Record>,
    selection: &Selection,
    capacity: usize,
) -> Card {
    records.sort_by(|a, b| a.date.cmp(&b.date));

    let mut days: BTreeMap<String, DaySlots> = BTreeMap::new();
    for r in records {
        let slots = days.entry(r.date.clone()).or_default();
        if !assign_session(slots, r.session, r.into()) {
            tracing::debug!(id, date = %r.date, "third entry for one date dropped");
        }
    }

    let mut rows: Vec<DateRow> = match selection.window() {
        Some((from, to)) => date_range(from, to)
            .take(capacity.saturating_add(1))
            .map(|d| {
                let date = iso_from_date(d);
                let slots = days.remove(&date).unwrap_or_default();
                DateRow { date, slots }
            })
            .collect(),
        None => days
            .into_iter()
            .map(|(date, slots)| DateRow { date, slots })
            .collect(),
    };
    if rows.len() > capacity {
        tracing::warn!(id, capacity, "statement truncated to row capacity");
        rows.truncate(capacity);
    }

    let (total_quantity, total_amount) = rows
        .iter()
        .flat_map(|row| row.slots.entries())
        .fold((0.0, 0.0), |(q, a), e| (q + e.quantity, a + e.amount));

    let first_date = rows.iter().map(|r| &r.date).find(|d| !d.is_empty()).cloned();
    let last_date = rows.iter().rev().map(|r| &r.date).find(|d| !d.is_empty()).cloned();

    Card {
        id,
        name: users::display_name(id),
        from: selection.from.map(iso_from_date).or(first_date),
        to: selection.to.map(iso_from_date).or(last_date),
        rows,
        total_quantity,
        total_amount,
    }
}

/// One card per numeric user id, ascending. Records with a non-numeric id
/// cannot be placed and are skipped.
pub fn build_cards(selection: &Selection, capacity: usize) -> Vec<Card> {
    let mut groups: BTreeMap<i64, Vec<&Record>> = BTreeMap::new();
    for r in &selection.records {
        match r.id.as_number() {
            Some(id) => groups.entry(id).or_default().push(r),
            None => tracing::warn!(id = %r.id, date = %r.date, "record without numeric id left off statements"),
        }
    }
    groups
        .into_iter()
        .map(|(id, records)| build_card(id, records, selection, capacity))
        .collect()
}
