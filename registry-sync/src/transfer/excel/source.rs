//! Read source extracts (one sheet, header row + data rows)

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, DataType, Reader, Xlsx, open_workbook};
use chrono::{NaiveDateTime, Timelike};

use crate::transfer::types::format_number;

/// A single spreadsheet cell after reading
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Empty cell or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell; `None` when blank
    ///
    /// Dates render as `dd.mm.yyyy` (with the time when it is not midnight),
    /// the same shape the date codec reads back.
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(f) => Some(format_number(*f)),
            Cell::DateTime(dt) => Some(format_datetime(dt)),
        }
    }

    /// Same cell as text; blanks stay empty
    pub fn into_text(self) -> Cell {
        match self.text() {
            Some(text) => Cell::Text(text),
            None => Cell::Empty,
        }
    }
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time().num_seconds_from_midnight() == 0 {
        dt.format("%d.%m.%Y").to_string()
    } else {
        dt.format("%d.%m.%Y %H:%M:%S").to_string()
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
                Some(dt) => Cell::DateTime(dt),
                None => Cell::Text(data.to_string()),
            },
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) => Cell::Empty,
        }
    }
}

/// One data row keyed by header name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    cells: HashMap<String, Cell>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell under `column`; missing columns read as empty
    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY)
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).text()
    }

    pub fn set(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.insert(column.into(), cell);
    }

    pub fn with(mut self, column: impl Into<String>, cell: Cell) -> Self {
        self.set(column, cell);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Cell::is_blank)
    }
}

/// Read `sheet` of the workbook at `path`
///
/// The first row is the header. Fully blank rows are skipped. Cells of
/// `text_columns` are coerced to text so identifiers like `007` or `12`
/// never turn into numbers.
pub fn read_source_sheet(path: &Path, sheet: &str, text_columns: &[&str]) -> Result<Vec<SourceRow>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Failed to read sheet '{}' of {}", sheet, path.display()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut result = Vec::new();
    for row in rows {
        let mut source_row = SourceRow::new();
        for (col, name) in header.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            let cell = row.get(col).map(Cell::from).unwrap_or_default();
            let cell = if text_columns.contains(&name.as_str()) {
                cell.into_text()
            } else {
                cell
            };
            source_row.set(name.clone(), cell);
        }

        if !source_row.is_empty() {
            result.push(source_row);
        }
    }

    log::debug!("Read {} rows from {}", result.len(), path.display());
    Ok(result)
}
