use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::cli::print_summaries;
use crate::error::{MilkbookError, Result};
use crate::importer::{load_files, ImportMode};
use crate::layout::{build_cards, Card, LayoutConfig};
use crate::reports::{select, ReportFilter};
use crate::settings::{load_settings, Settings};

pub struct StatementArgs {
    pub files: Vec<String>,
    pub mode: ImportMode,
    pub filter: ReportFilter,
    pub output: Option<String>,
}

/// `statements_YYYY-MM-DD_HH-MM-SS.pdf`, or the fixed `report.pdf`.
pub fn pdf_filename(timestamped: bool, now: DateTime<Local>) -> String {
    if timestamped {
        format!("statements_{}.pdf", now.format("%Y-%m-%d_%H-%M-%S"))
    } else {
        "report.pdf".to_string()
    }
}

fn default_path(settings: &Settings) -> PathBuf {
    PathBuf::from(&settings.output_dir).join(pdf_filename(settings.timestamped_filenames, Local::now()))
}

#[cfg(feature = "pdf")]
fn ensure_renderer() -> Result<()> {
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn ensure_renderer() -> Result<()> {
    Err(MilkbookError::PdfUnavailable)
}

#[cfg(feature = "pdf")]
fn write_pdf(cards: &[Card], cfg: &LayoutConfig, settings: &Settings, path: &Path) -> Result<usize> {
    use crate::pdf::PdfSink;
    use crate::render::{render_statements, DirAssets, NoAssets};

    let font = settings.font_path.as_deref().map(Path::new);
    let mut sink = PdfSink::new("Statements", cfg.page_width, cfg.page_height, font)?;
    let pages = match &settings.image_dir {
        Some(dir) => render_statements(&mut sink, cards, cfg, &DirAssets::new(dir)),
        None => render_statements(&mut sink, cards, cfg, &NoAssets),
    };
    let bytes = sink.to_bytes()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(pages)
}

#[cfg(not(feature = "pdf"))]
fn write_pdf(_cards: &[Card], _cfg: &LayoutConfig, _settings: &Settings, _path: &Path) -> Result<usize> {
    Err(MilkbookError::PdfUnavailable)
}

pub fn run(args: StatementArgs) -> Result<()> {
    ensure_renderer()?;
    let settings = load_settings();
    let (store, summaries) = load_files(&args.files, args.mode)?;
    print_summaries(&summaries);

    let selection = select(&store, &args.filter)?;
    let cfg = settings.layout_config();
    let cards = build_cards(&selection, cfg.row_capacity);
    if cards.is_empty() {
        return Err(MilkbookError::NoMatchingRows);
    }

    let path = args
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(&settings));
    let pages = write_pdf(&cards, &cfg, &settings, &path)?;
    println!(
        "Wrote {} ({} statement{}, {} page{})",
        path.display(),
        cards.len(),
        if cards.len() == 1 { "" } else { "s" },
        pages,
        if pages == 1 { "" } else { "s" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pdf_filename() {
        let now = Local.with_ymd_and_hms(2025, 3, 10, 7, 5, 9).unwrap();
        assert_eq!(pdf_filename(true, now), "statements_2025-03-10_07-05-09.pdf");
        assert_eq!(pdf_filename(false, now), "report.pdf");
    }
}
