//! Read the attribute mapping: one row per declared attribute
//!
//! Columns are located by header name: `name`, `id`, `type`, `regexp`,
//! `regexp_name`, `folder`, `class`. The last four are optional.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};

use crate::transfer::types::{AttributeDeclaration, AttributeKind};

/// Header names of the mapping sheet
mod cols {
    pub const NAME: &str = "name";
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const REGEXP: &str = "regexp";
    pub const REGEXP_NAME: &str = "regexp_name";
    pub const FOLDER: &str = "folder";
    pub const CLASS: &str = "class";
}

/// Problems with the mapping content (as opposed to I/O failures)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// A required header is absent
    MissingColumn(&'static str),
    /// A row cannot be turned into a declaration (1-based row number)
    InvalidRow { row: usize, message: String },
    /// The sheet declares nothing
    NoAttributes,
}

impl std::fmt::Display for MappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingError::MissingColumn(name) => {
                write!(f, "mapping sheet has no '{}' column", name)
            }
            MappingError::InvalidRow { row, message } => write!(f, "row {}: {}", row, message),
            MappingError::NoAttributes => write!(f, "mapping sheet declares no attributes"),
        }
    }
}

impl std::error::Error for MappingError {}

/// Read every declaration from `sheet` of the workbook at `path`
pub fn read_declarations(path: &Path, sheet: &str) -> Result<Vec<AttributeDeclaration>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Failed to read sheet: {}", sheet))?;

    let rows: Vec<_> = range.rows().collect();
    let Some(header) = rows.first() else {
        return Err(MappingError::NoAttributes.into());
    };
    let columns = Columns::parse(header)?;

    let mut declarations = Vec::new();
    for (row_idx, row) in rows.iter().enumerate().skip(1) {
        let row_num = row_idx + 1;

        if row.iter().all(|c| c.to_string().trim().is_empty()) {
            continue;
        }

        let declaration = parse_row(row, &columns)
            .map_err(|message| MappingError::InvalidRow { row: row_num, message })?;
        declarations.push(declaration);
    }

    if declarations.is_empty() {
        return Err(MappingError::NoAttributes.into());
    }

    log::debug!(
        "Loaded {} attribute declarations from {}",
        declarations.len(),
        path.display()
    );
    Ok(declarations)
}

struct Columns {
    name: usize,
    id: usize,
    kind: usize,
    regexp: Option<usize>,
    regexp_name: Option<usize>,
    folder: Option<usize>,
    class: Option<usize>,
}

impl Columns {
    fn parse(header: &[Data]) -> Result<Self, MappingError> {
        let index: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_string().trim().to_lowercase(), i))
            .collect();
        let required = |name: &'static str| {
            index
                .get(name)
                .copied()
                .ok_or(MappingError::MissingColumn(name))
        };

        Ok(Self {
            name: required(cols::NAME)?,
            id: required(cols::ID)?,
            kind: required(cols::TYPE)?,
            regexp: index.get(cols::REGEXP).copied(),
            regexp_name: index.get(cols::REGEXP_NAME).copied(),
            folder: index.get(cols::FOLDER).copied(),
            class: index.get(cols::CLASS).copied(),
        })
    }
}

fn parse_row(row: &[Data], columns: &Columns) -> Result<AttributeDeclaration, String> {
    let name = get_cell_string(row, Some(columns.name)).ok_or("missing attribute name")?;
    let attribute_id =
        get_cell_string(row, Some(columns.id)).ok_or_else(|| format!("'{}' has no id", name))?;
    let wire_type = get_cell_int(row, columns.kind)
        .and_then(|t| u8::try_from(t).ok())
        .ok_or_else(|| format!("'{}' has no valid type", name))?;

    let kind = AttributeKind::from_wire_type(
        wire_type,
        get_cell_string(row, columns.folder),
        get_cell_string(row, columns.class),
    )
    .map_err(|e| format!("'{}': {}", name, e))?;

    let declaration = AttributeDeclaration::new(name.clone(), attribute_id, wire_type, kind);
    match get_cell_string(row, columns.regexp) {
        Some(pattern) => {
            let alternate = get_cell_string(row, columns.regexp_name).unwrap_or_default();
            declaration
                .with_regex(&pattern, alternate)
                .map_err(|e| format!("'{}': {}", name, e))
        }
        None => Ok(declaration),
    }
}

/// Trimmed text of a cell, `None` when the column is absent or the cell blank
fn get_cell_string(row: &[Data], col: Option<usize>) -> Option<String> {
    let text = match row.get(col?)? {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => crate::transfer::types::format_number(*f),
        _ => String::new(),
    };
    if text.is_empty() { None } else { Some(text) }
}

fn get_cell_int(row: &[Data], col: usize) -> Option<i64> {
    row.get(col).and_then(|c| match c {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(*f as i64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
