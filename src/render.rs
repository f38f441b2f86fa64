use std::collections::HashMap;
use std::path::PathBuf;

use crate::dates::display_from_iso;
use crate::fmt::{format_amount_grouped, format_final_amount, format_percentage, format_quantity};
use crate::layout::{
    card_geometry, cut_guides, page_count, paginate, Card, CardGeometry, LayoutConfig, Rect,
    SessionEntry,
};

// ---------------------------------------------------------------------------
// Drawing surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub align: Align,
    /// RGB, 0-255.
    pub color: (u8, u8, u8),
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            bold: false,
            align: Align::Left,
            color: BLACK,
        }
    }

    pub fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    pub fn align(self, align: Align) -> Self {
        Self { align, ..self }
    }

    pub fn color(self, color: (u8, u8, u8)) -> Self {
        Self { color, ..self }
    }
}

const BLACK: (u8, u8, u8) = (0, 0, 0);
const RED: (u8, u8, u8) = (255, 0, 0);

/// Rough Helvetica advance width in mm.
pub fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// A page-oriented vector document. Coordinates are millimetres from the
/// top-left corner of the page. A new sink starts with one empty page, and
/// drawing goes to the current page.
pub trait DocumentSink {
    /// Append a page and make it current.
    fn add_page(&mut self);
    fn select_page(&mut self, index: usize);
    fn page_count(&self) -> usize;
    fn rect(&mut self, rect: Rect, thickness: f32);
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32);
    fn dashed_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);
    /// `x` is the anchor for the style's alignment; `y` is the baseline.
    fn text(&mut self, text: &str, x: f32, y: f32, style: TextStyle);
    /// Place an encoded raster image. Returns false if it could not be used.
    fn image(&mut self, data: &[u8], rect: Rect) -> bool;
}

// ---------------------------------------------------------------------------
// Optional imagery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Date,
    Quantity,
    Percentage,
    Amount,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Self::Date, Self::Quantity, Self::Percentage, Self::Amount];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Quantity => "quantity",
            Self::Percentage => "percentage",
            Self::Amount => "amount",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Quantity => "Quantity",
            Self::Percentage => "Percentage",
            Self::Amount => "Amount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    UserPhoto(i64),
    Icon(Metric),
}

impl AssetKey {
    /// File stem, without extension.
    pub fn stem(&self) -> String {
        match self {
            Self::UserPhoto(id) => format!("user-{id}"),
            Self::Icon(metric) => metric.key().to_string(),
        }
    }
}

/// Where card imagery comes from. A miss is never an error.
pub trait AssetSource {
    fn fetch(&self, key: AssetKey) -> Option<Vec<u8>>;
}

pub struct NoAssets;

impl AssetSource for NoAssets {
    fn fetch(&self, _key: AssetKey) -> Option<Vec<u8>> {
        None
    }
}

/// Images read from a directory: `user-<id>.png|jpg`, `<metric>.png|jpg`.
pub struct DirAssets {
    dir: PathBuf,
}

impl DirAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AssetSource for DirAssets {
    fn fetch(&self, key: AssetKey) -> Option<Vec<u8>> {
        let stem = key.stem();
        for ext in ["png", "jpg", "jpeg"] {
            let path = self.dir.join(format!("{stem}.{ext}"));
            match std::fs::read(&path) {
                Ok(bytes) => return Some(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "image unreadable");
                    return None;
                }
            }
        }
        tracing::debug!(asset = %stem, "no image found");
        None
    }
}

struct CardAssets<'a> {
    photo: Option<Vec<u8>>,
    icons: &'a HashMap<Metric, Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Card drawing
// ---------------------------------------------------------------------------

const HEADER_SIZE: f32 = 9.0;
const NAME_SIZE: f32 = 11.0;
const COLUMN_LABEL_SIZE: f32 = 7.0;
const COLUMN_LINE_H: f32 = 3.2;
const DATE_SIZE: f32 = 8.0;
const CELL_SIZE: f32 = 7.5;
const CELL_PAD_RIGHT: f32 = 1.5;
const FOOTER_SIZE: f32 = 9.0;
const FINAL_SIZE: f32 = 15.0;
const ICON_SIZE: f32 = 4.0;

/// Column metrics, left to right: the date then AM and PM triples.
const COLUMN_METRICS: [Metric; 7] = [
    Metric::Date,
    Metric::Quantity,
    Metric::Percentage,
    Metric::Amount,
    Metric::Quantity,
    Metric::Percentage,
    Metric::Amount,
];

fn wrap_lines(text: &str, width: f32, size: f32) -> Vec<String> {
    let per_char = approx_text_width("m", size).max(0.1);
    let columns = ((width / per_char).floor() as usize).max(1);
    textwrap::wrap(text, columns)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

/// Centre a wrapped label inside a cell, both ways.
fn wrapped_centered<S: DocumentSink>(sink: &mut S, text: &str, cell: Rect) {
    let lines = wrap_lines(text, cell.w - 2.0, COLUMN_LABEL_SIZE);
    let block = lines.len() as f32 * COLUMN_LINE_H;
    let start = cell.y + (cell.h - block) / 2.0 + COLUMN_LINE_H - 1.2;
    let style = TextStyle::new(COLUMN_LABEL_SIZE).bold().align(Align::Center);
    for (i, line) in lines.iter().enumerate() {
        sink.text(line, cell.center_x(), start + i as f32 * COLUMN_LINE_H, style);
    }
}

fn icon_rect(center_x: f32, center_y: f32, size: f32) -> Rect {
    Rect {
        x: center_x - size / 2.0,
        y: center_y - size / 2.0,
        w: size,
        h: size,
    }
}

fn draw_header<S: DocumentSink>(sink: &mut S, card: &Card, g: &CardGeometry, assets: &CardAssets) {
    let h = g.header;
    let pad = g.columns.left(0) - h.x;
    let top = h.y + 6.0;
    let small = TextStyle::new(HEADER_SIZE);
    sink.text(&format!("ID: {}", card.id), h.x + pad, top, small);
    if let Some(from) = &card.from {
        let label = format!("From: {}", display_from_iso(from));
        sink.text(&label, h.center_x(), top, small.align(Align::Center));
    }
    if let Some(to) = &card.to {
        let label = format!("To: {}", display_from_iso(to));
        sink.text(&label, h.right() - pad, top, small.align(Align::Right));
    }

    let photo_h = (h.bottom() - top - 1.0).max(0.0);
    let photo_rect = Rect {
        x: h.center_x() - photo_h / 2.0,
        y: top + 1.0,
        w: photo_h,
        h: photo_h,
    };
    let drew_photo = assets
        .photo
        .as_deref()
        .is_some_and(|bytes| photo_h > 0.0 && sink.image(bytes, photo_rect));
    if !drew_photo {
        let style = TextStyle::new(NAME_SIZE).align(Align::Center);
        sink.text(card.display_name(), h.center_x(), h.y + 14.0, style);
    }

    sink.line(h.x, h.bottom(), h.right(), h.bottom(), 0.2);
}

fn draw_column_headers<S: DocumentSink>(sink: &mut S, g: &CardGeometry, assets: &CardAssets) {
    let cols = &g.columns;
    let band = g.column_header;

    if let Some(divider) = g.divider {
        let am = Rect {
            x: cols.left(1),
            w: cols.right(3) - cols.left(1),
            ..divider
        };
        let pm = Rect {
            x: cols.left(4),
            w: cols.right(6) - cols.left(4),
            ..divider
        };
        let style = TextStyle::new(COLUMN_LABEL_SIZE + 1.0).bold().align(Align::Center);
        let baseline = divider.y + divider.h / 2.0 + 1.2;
        for (rect, label) in [(am, "AM"), (pm, "PM")] {
            sink.rect(rect, 0.35);
            sink.text(label, rect.center_x(), baseline, style);
        }
    }

    sink.line(band.x, band.y, band.right(), band.y, 0.2);
    sink.line(band.x, band.bottom(), band.right(), band.bottom(), 0.2);
    for (i, metric) in COLUMN_METRICS.iter().enumerate() {
        let cell = Rect {
            x: cols.left(i),
            y: band.y,
            w: cols.right(i) - cols.left(i),
            h: band.h,
        };
        sink.rect(cell, 0.35);
        let size = ICON_SIZE.min(cell.w - 1.0).min(cell.h - 1.0);
        let drew_icon = assets.icons.get(metric).is_some_and(|bytes| {
            size > 0.0
                && sink.image(bytes, icon_rect(cell.center_x(), cell.y + cell.h / 2.0, size))
        });
        if !drew_icon {
            wrapped_centered(sink, metric.label(), cell);
        }
    }
}

fn draw_entry<S: DocumentSink>(sink: &mut S, g: &CardGeometry, first_col: usize, y: f32, e: &SessionEntry) {
    let cols = &g.columns;
    let style = TextStyle::new(CELL_SIZE);
    sink.text(
        &format_quantity(e.quantity),
        cols.center(first_col),
        y,
        style.align(Align::Center),
    );
    sink.text(
        &format_percentage(e.percentage),
        cols.right(first_col + 1) - CELL_PAD_RIGHT,
        y,
        style.align(Align::Right),
    );
    sink.text(
        &format_amount_grouped(e.amount),
        cols.right(first_col + 2) - CELL_PAD_RIGHT,
        y,
        style.align(Align::Right),
    );
}

fn draw_body<S: DocumentSink>(sink: &mut S, card: &Card, g: &CardGeometry, capacity: usize) {
    let body = g.body;
    let cols = &g.columns;
    sink.rect(body, 0.2);
    for i in 1..cols.len() {
        sink.line(cols.left(i), body.y, cols.left(i), body.bottom(), 0.35);
    }

    let date_style = TextStyle::new(DATE_SIZE).align(Align::Center);
    let mut cursor = body.y;
    for i in 0..capacity {
        let baseline = cursor + g.row_height * 0.65;
        if let Some(row) = card.rows.get(i) {
            sink.text(&row.label(), cols.center(0), baseline, date_style);
            if let Some(am) = &row.slots.am {
                draw_entry(sink, g, 1, baseline, am);
            }
            if let Some(pm) = &row.slots.pm {
                draw_entry(sink, g, 4, baseline, pm);
            }
        }
        cursor += g.row_height;
        sink.line(body.x, cursor, body.right(), cursor, 0.2);
    }
}

/// Footer value with its metric icon, or the worded label when there is none.
fn footer_total<S: DocumentSink>(
    sink: &mut S,
    assets: &CardAssets,
    metric: Metric,
    label: &str,
    value: &str,
    right: f32,
    baseline: f32,
) {
    let style = TextStyle::new(FOOTER_SIZE).align(Align::Right);
    if let Some(bytes) = assets.icons.get(&metric) {
        let icon_x = right - approx_text_width(value, FOOTER_SIZE) - 1.0 - ICON_SIZE / 2.0;
        if sink.image(bytes, icon_rect(icon_x, baseline - 1.2, ICON_SIZE)) {
            sink.text(value, right, baseline, style);
            return;
        }
    }
    sink.text(&format!("{label}: {value}"), right, baseline, style);
}

fn draw_footer<S: DocumentSink>(sink: &mut S, card: &Card, g: &CardGeometry, assets: &CardAssets) {
    let f = g.footer;
    let pad = g.columns.left(0) - f.x;
    sink.line(f.x, f.y, f.right(), f.y, 0.3);

    let left = f.x + pad + 2.0;
    let right = f.right() - pad - 4.0;
    let center = (left + right) / 2.0;

    sink.text(
        "Advance or Loan amount: 0",
        left,
        f.y + 5.0,
        TextStyle::new(FOOTER_SIZE).color(RED),
    );
    footer_total(
        sink,
        assets,
        Metric::Quantity,
        "Total Milk in liters",
        &format_quantity(card.total_quantity),
        right,
        f.y + 5.0,
    );
    footer_total(
        sink,
        assets,
        Metric::Amount,
        "Total Amount",
        &format_amount_grouped(card.total_amount),
        right,
        f.y + 10.0,
    );
    sink.text(
        &format!("Final Amount: {}", format_final_amount(card.total_amount)),
        center,
        f.y + 20.0,
        TextStyle::new(FINAL_SIZE).bold().align(Align::Center),
    );
}

fn draw_card<S: DocumentSink>(sink: &mut S, card: &Card, outer: Rect, cfg: &LayoutConfig, assets: &CardAssets) {
    let g = card_geometry(outer, cfg);
    sink.rect(g.outer, 0.9);
    draw_header(sink, card, &g, assets);
    draw_column_headers(sink, &g, assets);
    draw_body(sink, card, &g, cfg.row_capacity);
    draw_footer(sink, card, &g, assets);
}

/// Draw every card in order, one slot each, then the cut guides on every
/// page. Each card's images are fetched before any of its drawing begins.
/// Returns the number of pages used.
pub fn render_statements<S: DocumentSink, A: AssetSource>(
    sink: &mut S,
    cards: &[Card],
    cfg: &LayoutConfig,
    assets: &A,
) -> usize {
    let icons: HashMap<Metric, Vec<u8>> = Metric::ALL
        .iter()
        .filter_map(|m| assets.fetch(AssetKey::Icon(*m)).map(|bytes| (*m, bytes)))
        .collect();

    while sink.page_count() < page_count(cards.len(), cfg) {
        sink.add_page();
    }
    for (card, placement) in cards.iter().zip(paginate(cards.len(), cfg)) {
        sink.select_page(placement.page);
        let card_assets = CardAssets {
            photo: assets.fetch(AssetKey::UserPhoto(card.id)),
            icons: &icons,
        };
        draw_card(sink, card, placement.rect, cfg, &card_assets);
    }

    let guides = cut_guides(cfg);
    let pages = sink.page_count();
    tracing::info!(cards = cards.len(), pages, "statements laid out");
    for page in 0..pages {
        sink.select_page(page);
        for g in &guides {
            sink.dashed_line(g.x1, g.y1, g.x2, g.y2);
        }
    }
    pages
}
