//! Multi-sheet XLSX report.
//!
//! Sheets are laid out as [`SheetLayout`] rows first and then written with
//! `rust_xlsxwriter`. Each period gets its own sheet; a grouped report also
//! gets a trailing `Summary` sheet.

use std::collections::HashSet;

use rust_xlsxwriter::{Color, Format, Workbook};
use tracing::debug;

use super::{format_date, format_period, format_time, format_trip_time};
use crate::analyzers::{ReportPeriod, resolve_display_name};
use crate::error::{ReportError, Result};

/// Excel's sheet name length limit.
pub const MAX_SHEET_NAME_LEN: usize = 31;

pub const SUMMARY_SHEET: &str = "Summary";

const ILLEGAL_SHEET_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];
const PERIOD_COLUMN_WIDTHS: [f64; 5] = [25.0, 20.0, 20.0, 20.0, 15.0];
const SUMMARY_COLUMN_WIDTHS: [f64; 4] = [25.0, 15.0, 15.0, 15.0];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Title,
    Section,
    Header,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub style: RowStyle,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub name: String,
    pub rows: Vec<SheetRow>,
    pub column_widths: Vec<f64>,
}

impl SheetLayout {
    fn new(name: String, column_widths: &[f64]) -> Self {
        Self {
            name,
            rows: Vec::new(),
            column_widths: column_widths.to_vec(),
        }
    }

    fn push(&mut self, style: RowStyle, cells: Vec<Cell>) {
        self.rows.push(SheetRow { style, cells });
    }

    fn blank(&mut self) {
        self.push(RowStyle::Body, Vec::new());
    }

    fn pair(&mut self, label: &str, value: impl Into<Cell>) {
        self.push(RowStyle::Body, vec![label.into(), value.into()]);
    }
}

/// Turns an identifier into a legal sheet name: illegal characters become
/// `_` and the result is cut to [`MAX_SHEET_NAME_LEN`] characters.
pub fn sheet_name(identifier: &str) -> String {
    let mut name: String = identifier
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .map(|c| if ILLEGAL_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if name.starts_with('\'') {
        name.replace_range(..1, "_");
    }
    if name.ends_with('\'') {
        name.pop();
        name.push('_');
    }
    if name.trim().is_empty() {
        name = "Sheet".to_string();
    }
    name
}

/// Hands out sheet names, suffixing repeats since Excel compares them
/// case-insensitively.
#[derive(Default)]
struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_lowercase());
    }

    fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.to_lowercase()) {
            return base;
        }
        let suffixed = (2..)
            .map(|n| {
                let suffix = format!(" ({n})");
                let stem: String = base
                    .chars()
                    .take(MAX_SHEET_NAME_LEN - suffix.chars().count())
                    .collect();
                format!("{stem}{suffix}")
            })
            .find(|candidate| self.used.insert(candidate.to_lowercase()));
        suffixed.unwrap_or(base)
    }
}

fn period_sheet(name: String, period: &ReportPeriod) -> SheetLayout {
    let kind = period.kind;
    let totals = &period.totals;
    let mut sheet = SheetLayout::new(name, &PERIOD_COLUMN_WIDTHS);

    sheet.push(RowStyle::Title, vec!["Tracking Report".into()]);
    sheet.blank();
    sheet.push(RowStyle::Header, vec!["Field".into(), "Value".into()]);
    sheet.pair(kind.subject_label(), resolve_display_name(&period.records, kind));
    sheet.pair(kind.id_label(), period.identifier.clone());
    sheet.pair("Period", format_period(&period.range));
    sheet.blank();

    sheet.push(RowStyle::Section, vec!["Summary".into()]);
    sheet.pair("Total Trips", totals.trip_count);
    sheet.pair("Total Days", totals.day_count);
    sheet.pair("Total Work Hours", totals.work_duration.to_string());
    sheet.pair("Average Hours per Day", format!("{}h", totals.average_hours_per_day));
    sheet.blank();
    sheet.blank();

    sheet.push(RowStyle::Section, vec!["Daily Summary".into()]);
    sheet.push(
        RowStyle::Header,
        vec![
            "Date".into(),
            "Total Trips".into(),
            "First Trip (Check-In)".into(),
            "Last Trip (Check-Out)".into(),
            "Work Hours".into(),
        ],
    );
    for bucket in &period.buckets {
        sheet.push(
            RowStyle::Body,
            vec![
                format_date(bucket.date).into(),
                bucket.trip_count().into(),
                format_trip_time(bucket.first_trip()).into(),
                format_trip_time(bucket.last_trip()).into(),
                bucket.work_duration.to_string().into(),
            ],
        );
    }
    sheet.blank();
    sheet.blank();

    sheet.push(RowStyle::Section, vec!["All Trips Details".into()]);
    sheet.push(
        RowStyle::Header,
        vec![
            "Date".into(),
            "Time".into(),
            "Address".into(),
            "Latitude".into(),
            "Longitude".into(),
        ],
    );
    for record in &period.records {
        sheet.push(
            RowStyle::Body,
            vec![
                format_date(record.date()).into(),
                format_time(record.timestamp).into(),
                record.address.clone().into(),
                record.latitude.into(),
                record.longitude.into(),
            ],
        );
    }

    sheet
}

fn summary_sheet(periods: &[ReportPeriod]) -> SheetLayout {
    let mut sheet = SheetLayout::new(SUMMARY_SHEET.to_string(), &SUMMARY_COLUMN_WIDTHS);
    let total_records: usize = periods.iter().map(|p| p.records.len()).sum();

    sheet.push(RowStyle::Title, vec!["All Identifiers Summary".into()]);
    sheet.blank();
    if let Some(first) = periods.first() {
        sheet.pair("Period", format_period(&first.range));
    }
    sheet.pair("Total Records", total_records);
    sheet.pair("Total Identifiers", periods.len());
    sheet.blank();
    sheet.push(
        RowStyle::Header,
        vec![
            "Identifier".into(),
            "Total Trips".into(),
            "Total Days".into(),
            "Total Hours".into(),
        ],
    );
    for period in periods {
        sheet.push(
            RowStyle::Body,
            vec![
                period.identifier.clone().into(),
                period.totals.trip_count.into(),
                period.totals.day_count.into(),
                period.totals.work_duration.to_string().into(),
            ],
        );
    }

    sheet
}

/// Lays out one sheet per period, plus a summary sheet for an
/// `all_identifiers` report or whenever there is more than one period.
///
/// # Errors
///
/// Returns [`ReportError::NoData`] for an empty period list.
pub fn workbook_layout(periods: &[ReportPeriod], all_identifiers: bool) -> Result<Vec<SheetLayout>> {
    if periods.is_empty() {
        return Err(ReportError::NoData);
    }

    let grouped = all_identifiers || periods.len() > 1;
    let mut names = SheetNames::default();
    if grouped {
        names.reserve(SUMMARY_SHEET);
    }

    let mut sheets: Vec<SheetLayout> = periods
        .iter()
        .map(|period| period_sheet(names.claim(sheet_name(&period.identifier)), period))
        .collect();

    if grouped {
        sheets.push(summary_sheet(periods));
    }
    Ok(sheets)
}

fn xlsx_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Workbook(e.to_string())
}

/// Renders periods into an XLSX workbook.
pub fn render_workbook(periods: &[ReportPeriod], all_identifiers: bool) -> Result<Vec<u8>> {
    let sheets = workbook_layout(periods, all_identifiers)?;

    let title = Format::new().set_bold().set_font_size(14.0);
    let section = Format::new().set_bold();
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x428BCA));

    let mut workbook = Workbook::new();
    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(xlsx_err)?;
        for (col, width) in sheet.column_widths.iter().enumerate() {
            worksheet
                .set_column_width(col as u16, *width)
                .map_err(xlsx_err)?;
        }

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let format = match row.style {
                RowStyle::Title => Some(&title),
                RowStyle::Section => Some(&section),
                RowStyle::Header => Some(&header),
                RowStyle::Body => None,
            };
            for (col_idx, cell) in row.cells.iter().enumerate() {
                let (r, c) = (row_idx as u32, col_idx as u16);
                match (cell, format) {
                    (Cell::Text(s), Some(f)) => worksheet.write_string_with_format(r, c, s, f),
                    (Cell::Text(s), None) => worksheet.write_string(r, c, s),
                    (Cell::Number(n), Some(f)) => worksheet.write_number_with_format(r, c, *n, f),
                    (Cell::Number(n), None) => worksheet.write_number(r, c, *n),
                }
                .map_err(xlsx_err)?;
            }
        }
    }

    debug!(sheets = sheets.len(), "Workbook rendered");
    workbook.save_to_buffer().map_err(xlsx_err)
}
