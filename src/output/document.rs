//! Paginated PDF report.
//!
//! The report is first laid out as plain [`DocumentSection`] values, one per
//! identifier, then drawn onto A4 pages with `printpdf`.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use tracing::debug;

use super::{format_date, format_period, format_trip_time};
use crate::analyzers::{ReportPeriod, resolve_display_name};
use crate::error::{ReportError, Result};

pub const DOCUMENT_TITLE: &str = "Tracking Report";

/// Daily table columns, in order.
pub const TABLE_HEADER: [&str; 5] = ["Date", "Trips", "First Trip", "Last Trip", "Work Hours"];

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 14.0;
const TOP: f32 = PAGE_HEIGHT - 15.0;
const BOTTOM: f32 = 20.0;
const FOOTER_Y: f32 = 10.0;
const LINE_HEIGHT: f32 = 6.0;
const COLUMN_X: [f32; 5] = [14.0, 46.0, 66.0, 96.0, 126.0];

/// Rendering options for [`render_document`].
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    /// TrueType font used instead of the built-in Helvetica, for names
    /// outside Latin-1.
    pub font: Option<Vec<u8>>,
}

/// One identifier's part of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSection {
    pub title: String,
    pub metadata: Vec<String>,
    pub summary: String,
    pub rows: Vec<[String; 5]>,
}

impl DocumentSection {
    pub fn from_period(period: &ReportPeriod) -> Self {
        let name = resolve_display_name(&period.records, period.kind);
        let totals = &period.totals;

        let rows = period
            .buckets
            .iter()
            .map(|bucket| {
                [
                    format_date(bucket.date),
                    bucket.trip_count().to_string(),
                    format_trip_time(bucket.first_trip()),
                    format_trip_time(bucket.last_trip()),
                    bucket.work_duration.to_string(),
                ]
            })
            .collect();

        Self {
            title: DOCUMENT_TITLE.to_string(),
            metadata: vec![
                format!("{}: {}", period.kind.subject_label(), name),
                format!("{}: {}", period.kind.id_label(), period.identifier),
                format!("Period: {}", format_period(&period.range)),
            ],
            summary: format!(
                "Total Trips: {} | Days: {} | Hours: {} | Avg: {}h/day",
                totals.trip_count, totals.day_count, totals.work_duration, totals.average_hours_per_day
            ),
            rows,
        }
    }
}

/// Lays out one section per period, in input order.
///
/// # Errors
///
/// Returns [`ReportError::NoData`] for an empty period list.
pub fn document_layout(periods: &[ReportPeriod]) -> Result<Vec<DocumentSection>> {
    if periods.is_empty() {
        return Err(ReportError::NoData);
    }
    Ok(periods.iter().map(DocumentSection::from_period).collect())
}

fn pdf_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Document(e.to_string())
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    page_number: usize,
    y: f32,
}

impl PageWriter<'_> {
    fn text(&self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn footer(&self) {
        self.layer.use_text(
            format!("Page {}", self.page_number),
            8.0,
            Mm(PAGE_WIDTH / 2.0 - 6.0),
            Mm(FOOTER_Y),
            &self.regular,
        );
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_number += 1;
        self.y = TOP;
        self.footer();
    }

    fn table_row(&self, cells: &[impl AsRef<str>], size: f32, font: &IndirectFontRef) {
        for (cell, x) in cells.iter().zip(COLUMN_X) {
            self.text(cell.as_ref(), size, x, font);
        }
    }

    fn section(&mut self, section: &DocumentSection) {
        self.text(&section.title, 18.0, MARGIN_LEFT, &self.bold);
        self.y -= 10.0;

        for line in &section.metadata {
            self.text(line, 11.0, MARGIN_LEFT, &self.regular);
            self.y -= LINE_HEIGHT;
        }
        self.text(&section.summary, 9.0, MARGIN_LEFT, &self.regular);
        self.y -= LINE_HEIGHT + 2.0;

        self.table_row(&TABLE_HEADER, 9.0, &self.bold);
        self.y -= LINE_HEIGHT;

        for row in &section.rows {
            if self.y < BOTTOM {
                self.new_page();
                self.table_row(&TABLE_HEADER, 9.0, &self.bold);
                self.y -= LINE_HEIGHT;
            }
            self.table_row(row, 8.0, &self.regular);
            self.y -= LINE_HEIGHT;
        }
    }
}

/// Renders periods into a PDF, one page group per period.
///
/// A period whose table does not fit continues on further pages; every
/// page carries a page number footer.
pub fn render_document(periods: &[ReportPeriod], options: &DocumentOptions) -> Result<Vec<u8>> {
    let sections = document_layout(periods)?;

    let (doc, page, layer) = PdfDocument::new(
        DOCUMENT_TITLE,
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let (regular, bold) = match &options.font {
        Some(bytes) => {
            let font = doc.add_external_font(bytes.as_slice()).map_err(pdf_err)?;
            (font.clone(), font)
        }
        None => (
            doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
            doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
        ),
    };

    let pages = {
        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            regular,
            bold,
            page_number: 1,
            y: TOP,
        };
        writer.footer();

        for (i, section) in sections.iter().enumerate() {
            if i > 0 {
                writer.new_page();
            }
            writer.section(section);
        }
        writer.page_number
    };

    debug!(sections = sections.len(), pages, "Document rendered");
    doc.save_to_bytes().map_err(pdf_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate;
    use crate::output::test_support::{record, sample_period, scope};

    #[test]
    fn test_empty_is_no_data() {
        assert!(matches!(document_layout(&[]), Err(ReportError::NoData)));
        assert!(matches!(
            render_document(&[], &DocumentOptions::default()),
            Err(ReportError::NoData)
        ));
    }

    #[test]
    fn test_section_content() {
        let sections = document_layout(&[sample_period("A")]).unwrap();
        assert_eq!(sections.len(), 1);

        let section = &sections[0];
        assert_eq!(section.title, "Tracking Report");
        assert_eq!(
            section.metadata,
            vec![
                "Employee: Nikos".to_string(),
                "iButton: A".to_string(),
                "Period: 01/01/2025 to 31/01/2025".to_string(),
            ]
        );
        assert_eq!(
            section.summary,
            "Total Trips: 3 | Days: 2 | Hours: 9h 30m | Avg: 4h/day"
        );
        assert_eq!(
            section.rows,
            vec![
                [
                    "01/01/2025".to_string(),
                    "2".to_string(),
                    "08:00:00 AM".to_string(),
                    "05:30:00 PM".to_string(),
                    "9h 30m".to_string(),
                ],
                [
                    "02/01/2025".to_string(),
                    "1".to_string(),
                    "09:00:00 AM".to_string(),
                    "09:00:00 AM".to_string(),
                    "0h 0m".to_string(),
                ],
            ]
        );
    }

    #[test]
    fn test_corrupted_name_hidden() {
        let records = vec![record("A", "2025-01-01T08:00:00", "Jo?n")];
        let period = aggregate("A", &scope(), &records);
        let sections = document_layout(&[period]).unwrap();

        assert_eq!(sections[0].metadata[0], "Employee: Driver");
    }

    #[test]
    fn test_bucket_without_trips_renders_blank_times() {
        let mut period = sample_period("A");
        period.buckets[0].trips.clear();

        let sections = document_layout(&[period]).unwrap();
        assert_eq!(sections[0].rows[0][2], "");
        assert_eq!(sections[0].rows[0][3], "");
    }

    #[test]
    fn test_sections_follow_period_order() {
        let sections = document_layout(&[sample_period("B"), sample_period("A")]).unwrap();
        assert_eq!(sections[0].metadata[1], "iButton: B");
        assert_eq!(sections[1].metadata[1], "iButton: A");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_document(
            &[sample_period("A"), sample_period("B")],
            &DocumentOptions::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_long_table_spans_pages() {
        let records: Vec<_> = (0..120)
            .map(|i| {
                let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                    + chrono::Days::new(i);
                record("A", &format!("{}T08:00:00", day.format("%Y-%m-%d")), "Nikos")
            })
            .collect();
        let period = aggregate("A", &scope(), &records);

        let bytes = render_document(&[period], &DocumentOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
