//! Import normalizer: prepared rows -> imported records
//!
//! Every declared attribute is extracted through the codec and stored under
//! its destination name. The grouping column is always present (blank values
//! get the default label) and the business key is unique afterwards.

use std::collections::HashMap;

use crate::transfer::codec::{CodecError, extract};
use crate::transfer::excel::SourceRow;
use crate::transfer::types::{AttributeDeclaration, Record, Value};

/// Where the key and the grouping live in a record
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout<'a> {
    /// Destination name holding the business key
    pub key_field: &'a str,
    /// Column naming the sub-category of each record
    pub group_column: &'a str,
    /// Sub-category used when the grouping column is blank
    pub default_group: &'a str,
}

impl RecordLayout<'_> {
    /// Sub-category of `record`
    pub fn group_of(&self, record: &Record) -> String {
        record
            .text(self.group_column)
            .unwrap_or_else(|| self.default_group.to_string())
    }
}

/// Imported records plus what had to be dropped to get there
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// In source order; a repeated key keeps its first position and its last values
    pub records: Vec<Record>,
    pub missing_keys: usize,
    pub repeated_keys: usize,
}

pub fn normalize(
    rows: &[SourceRow],
    declarations: &[AttributeDeclaration],
    layout: &RecordLayout<'_>,
) -> Result<Normalized, CodecError> {
    let mut normalized = Normalized::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let mut record = Record::new();
        for declaration in declarations {
            let value = extract(row.get(&declaration.name), declaration)?;
            record.insert(declaration.destination(), value);
        }

        let group = row
            .text(layout.group_column)
            .unwrap_or_else(|| layout.default_group.to_string());
        record.insert(layout.group_column, Value::String(group));

        let Some(key) = record.text(layout.key_field) else {
            normalized.missing_keys += 1;
            continue;
        };
        // The key is looked up and stored without padding
        if let Some(Value::String(_)) = record.get(layout.key_field) {
            record.insert(layout.key_field, Value::String(key.clone()));
        }

        match positions.get(&key) {
            Some(&position) => {
                normalized.repeated_keys += 1;
                normalized.records[position] = record;
            }
            None => {
                positions.insert(key, normalized.records.len());
                normalized.records.push(record);
            }
        }
    }

    if normalized.missing_keys > 0 {
        log::warn!(
            "{} rows without '{}' are skipped",
            normalized.missing_keys,
            layout.key_field
        );
    }
    if normalized.repeated_keys > 0 {
        log::warn!(
            "{} rows repeat an earlier '{}'; the later row is kept",
            normalized.repeated_keys,
            layout.key_field
        );
    }

    Ok(normalized)
}
