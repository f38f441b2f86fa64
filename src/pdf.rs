use std::io::{BufWriter, Cursor};
use std::path::Path;

use printpdf::image_crate::codecs::{jpeg::JpegDecoder, png::PngDecoder};
use printpdf::*;

use crate::error::{MilkbookError, Result};
use crate::layout;
use crate::render::{approx_text_width, Align, DocumentSink, TextStyle};

const PT_PER_MM: f32 = 72.0 / 25.4;
const IMAGE_DPI: f32 = 300.0;
const GUIDE_GREY: f32 = 0.7;

fn pdf_err(e: impl std::fmt::Debug) -> MilkbookError {
    MilkbookError::Pdf(format!("{e:?}"))
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// printpdf-backed drawing surface.
pub struct PdfSink {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    current: usize,
    page_w: f32,
    page_h: f32,
}

impl PdfSink {
    /// Builtin Helvetica unless `font_path` names a TrueType font, which is
    /// then used for both weights.
    pub fn new(title: &str, page_w: f32, page_h: f32, font_path: Option<&Path>) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(page_w), Mm(page_h), "Layer 1");
        let (font, font_bold) = match font_path {
            Some(path) => {
                let file = std::fs::File::open(path)?;
                let font = doc.add_external_font(file).map_err(pdf_err)?;
                (font.clone(), font)
            }
            None => (
                doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
                doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
            ),
        };
        Ok(Self {
            doc,
            font,
            font_bold,
            pages: vec![(page, layer)],
            current: 0,
            page_w,
            page_h,
        })
    }

    fn layer(&self) -> PdfLayerReference {
        let (page, layer) = self.pages[self.current];
        self.doc.get_page(page).get_layer(layer)
    }

    fn pdf_y(&self, y: f32) -> f32 {
        self.page_h - y
    }

    fn point(&self, x: f32, y: f32) -> (Point, bool) {
        (Point::new(Mm(x), Mm(self.pdf_y(y))), false)
    }

    fn stroke(&self, points: Vec<(Point, bool)>, closed: bool, thickness: f32) {
        let layer = self.layer();
        layer.set_outline_thickness(thickness * PT_PER_MM);
        layer.add_line(Line {
            points,
            is_closed: closed,
        });
    }

    fn decode(data: &[u8]) -> Option<Image> {
        let decoded = if data.starts_with(b"\x89PNG") {
            PngDecoder::new(Cursor::new(data)).ok().and_then(|d| Image::try_from(d).ok())
        } else if data.starts_with(&[0xFF, 0xD8]) {
            JpegDecoder::new(Cursor::new(data)).ok().and_then(|d| Image::try_from(d).ok())
        } else {
            None
        };
        if decoded.is_none() {
            tracing::debug!(bytes = data.len(), "image not decodable, using text");
        }
        decoded
    }

    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc.save(&mut buf).map_err(pdf_err)?;
        buf.into_inner().map_err(|e| MilkbookError::Pdf(e.to_string()))
    }
}

impl DocumentSink for PdfSink {
    fn add_page(&mut self) {
        let page = self.doc.add_page(Mm(self.page_w), Mm(self.page_h), "Layer");
        self.pages.push(page);
        self.current = self.pages.len() - 1;
    }

    fn select_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.current = index;
        }
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rect(&mut self, rect: layout::Rect, thickness: f32) {
        let points = vec![
            self.point(rect.x, rect.y),
            self.point(rect.right(), rect.y),
            self.point(rect.right(), rect.bottom()),
            self.point(rect.x, rect.bottom()),
        ];
        self.stroke(points, true, thickness);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32) {
        let points = vec![self.point(x1, y1), self.point(x2, y2)];
        self.stroke(points, false, thickness);
    }

    fn dashed_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let layer = self.layer();
        layer.set_outline_color(rgb(GUIDE_GREY, GUIDE_GREY, GUIDE_GREY));
        layer.set_line_dash_pattern(LineDashPattern {
            dash_1: Some(3),
            gap_1: Some(3),
            ..Default::default()
        });
        self.line(x1, y1, x2, y2, 0.2);
        layer.set_line_dash_pattern(LineDashPattern::default());
        layer.set_outline_color(rgb(0.0, 0.0, 0.0));
    }

    fn text(&mut self, text: &str, x: f32, y: f32, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        let font = if style.bold {
            self.font_bold.clone()
        } else {
            self.font.clone()
        };
        let width = approx_text_width(text, style.size);
        let left = match style.align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        let (r, g, b) = style.color;
        let layer = self.layer();
        layer.set_fill_color(rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0));
        layer.use_text(text, style.size, Mm(left), Mm(self.pdf_y(y)), &font);
        layer.set_fill_color(rgb(0.0, 0.0, 0.0));
    }

    fn image(&mut self, data: &[u8], rect: layout::Rect) -> bool {
        let Some(image) = Self::decode(data) else {
            return false;
        };
        let px_w = image.image.width.0 as f32;
        let px_h = image.image.height.0 as f32;
        if px_w <= 0.0 || px_h <= 0.0 {
            return false;
        }
        let natural_w = px_w / IMAGE_DPI * 25.4;
        let natural_h = px_h / IMAGE_DPI * 25.4;
        image.add_to_layer(
            self.layer(),
            ImageTransform {
                translate_x: Some(Mm(rect.x)),
                translate_y: Some(Mm(self.pdf_y(rect.bottom()))),
                scale_x: Some(rect.w / natural_w),
                scale_y: Some(rect.h / natural_h),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{build_cards, LayoutConfig};
    use crate::models::{derive_amount, Record, Session, UserId};
    use crate::render::{render_statements, NoAssets};
    use crate::reports::Selection;

    fn a4(font_path: Option<&Path>) -> Result<PdfSink> {
        PdfSink::new("Statements", layout::A4_WIDTH, layout::A4_HEIGHT, font_path)
    }

    fn selection(ids: &[i64]) -> Selection {
        let records = ids
            .iter()
            .map(|id| Record {
                date: "2025-03-10".into(),
                session: Session::Am,
                id: UserId::Number(*id),
                quantity: 10.0,
                percentage: 7.0,
                amount: derive_amount(10.0, 7.0),
                saved: false,
            })
            .collect();
        Selection {
            records,
            from: None,
            to: None,
            snapped: false,
        }
    }

    #[test]
    fn test_render_produces_pdf() {
        let cfg = LayoutConfig::default();
        let cards = build_cards(&selection(&[18, 19, 20, 21, 22]), cfg.row_capacity);
        let mut sink = a4(None).unwrap();
        let pages = render_statements(&mut sink, &cards, &cfg, &NoAssets);
        assert_eq!(pages, 2);
        assert_eq!(sink.page_count(), 2);
        let bytes = sink.to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_undecodable_image_is_refused() {
        let mut sink = a4(None).unwrap();
        let rect = layout::Rect {
            x: 10.0,
            y: 10.0,
            w: 5.0,
            h: 5.0,
        };
        assert!(!sink.image(b"not an image", rect));
        assert!(!sink.image(b"\x89PNG truncated", rect));
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ttf");
        assert!(a4(Some(missing.as_path())).is_err());
    }
}
