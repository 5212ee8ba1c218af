//! Attribute codec
//!
//! Three directions, one per declared attribute type:
//! - [`extract`]: spreadsheet cell -> record value (pure)
//! - [`decode_current`]: stored registry value -> record value (pure)
//! - [`ReferenceResolver::render`]: record value -> write payload, resolving
//!   references by name through the gateway

use std::collections::HashMap;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::json;

use crate::api::{AttributeValue, Gateway, RegistryBackend};
use crate::transfer::excel::Cell;
use crate::transfer::types::{AttributeDeclaration, AttributeKind, Value, format_number, wire_type};

/// Dates up to this year are placeholders ("01.01.1900") and read as null
const MIN_DATE_YEAR: i32 = 2000;

/// A cell that cannot be converted to its declared type
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Text in a numeric column
    NotNumeric { attribute: String, text: String },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::NotNumeric { attribute, text } => {
                write!(f, "value '{}' of '{}' is not a number", text, attribute)
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Convert one cell according to its declaration
///
/// Reference text loses its dots before anything else; a regex then keeps
/// only the first capture group (null when nothing matches) and the result
/// is typed.
pub fn extract(cell: &Cell, declaration: &AttributeDeclaration) -> Result<Value, CodecError> {
    if !declaration.kind.is_reference() && declaration.regex.is_none() {
        return typed(cell, declaration);
    }

    let mut text = cell.text();
    if declaration.kind.is_reference() {
        text = text.map(|t| t.replace('.', ""));
    }
    if let Some(regex) = &declaration.regex {
        text = text.and_then(|t| first_capture(regex, &t));
    }

    let cell = text.map(Cell::Text).unwrap_or_default();
    typed(&cell, declaration)
}

fn typed(cell: &Cell, declaration: &AttributeDeclaration) -> Result<Value, CodecError> {
    match declaration.kind {
        AttributeKind::String | AttributeKind::Reference { .. } => {
            Ok(cell.text().map(Value::String).unwrap_or_default())
        }
        AttributeKind::Numeric => parse_numeric(cell, &declaration.name),
        AttributeKind::Date => Ok(parse_date_cell(cell).map(Value::Date).unwrap_or_default()),
    }
}

/// First capture group of the first match
pub fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_numeric(cell: &Cell, attribute: &str) -> Result<Value, CodecError> {
    let not_numeric = |text: String| CodecError::NotNumeric {
        attribute: attribute.to_string(),
        text,
    };

    match cell {
        Cell::Empty => Ok(Value::Null),
        Cell::Number(f) => Ok(Value::Float(*f)),
        Cell::Text(s) if s.trim().is_empty() => Ok(Value::Null),
        Cell::Text(s) => {
            // Spreadsheet exports use a decimal comma and spaces between thousands
            let normalized: String = s
                .trim()
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            match normalized.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(not_numeric(s.clone())),
            }
        }
        Cell::DateTime(dt) => Err(not_numeric(dt.to_string())),
    }
}

fn parse_date_cell(cell: &Cell) -> Option<NaiveDate> {
    let date = match cell {
        Cell::DateTime(dt) => dt.date(),
        Cell::Text(s) => parse_date_text(s)?,
        Cell::Empty | Cell::Number(_) => return None,
    };
    (date.year() > MIN_DATE_YEAR).then_some(date)
}

/// Parse `dd.mm.yyyy` or `dd.mm.yyyy HH:MM:SS`, keeping only the date
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date = if text.chars().count() > 10 {
        NaiveDateTime::parse_from_str(text, "%d.%m.%Y %H:%M:%S")
            .ok()?
            .date()
    } else {
        NaiveDate::parse_from_str(text, "%d.%m.%Y").ok()?
    };
    (date.year() > MIN_DATE_YEAR).then_some(date)
}

/// Read a stored attribute back into the record shape used for comparison
///
/// References compare by display name, dates by calendar day.
pub fn decode_current(stored: Option<&AttributeValue>, declaration: &AttributeDeclaration) -> Value {
    use serde_json::Value as Json;

    let Some(stored) = stored else {
        return Value::Null;
    };

    match (&stored.value, stored.kind) {
        (Json::Null, _) => Value::Null,
        (reference, wire_type::REFERENCE) => reference
            .get("Name")
            .and_then(Json::as_str)
            .map(|name| Value::String(name.to_string()))
            .unwrap_or_default(),
        (Json::String(s), wire_type::DATE | wire_type::DATE_TIME) => s
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map(Value::Date)
            .unwrap_or_default(),
        (Json::String(s), _) if declaration.kind == AttributeKind::Numeric => s
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::String(s.clone())),
        (Json::String(s), _) => Value::String(s.clone()),
        (Json::Number(n), _) => match (declaration.kind.clone(), n.as_f64()) {
            (AttributeKind::Numeric, Some(f)) => Value::Float(f),
            (_, Some(f)) => Value::String(format_number(f)),
            (_, None) => Value::String(n.to_string()),
        },
        (Json::Bool(b), _) => Value::String(b.to_string()),
        (other, _) => Value::String(other.to_string()),
    }
}

/// Resolves reference names to object ids, memoised for the whole run
pub struct ReferenceResolver<'a, B> {
    gateway: &'a Gateway<B>,
    create_missing: bool,
    /// (folder, class, name) -> id, `None` for names that did not resolve
    cache: HashMap<(String, String, String), Option<String>>,
}

impl<'a, B: RegistryBackend> ReferenceResolver<'a, B> {
    pub fn new(gateway: &'a Gateway<B>, create_missing: bool) -> Self {
        Self {
            gateway,
            create_missing,
            cache: HashMap::new(),
        }
    }

    /// Id of the object named `name` among `class` objects below `folder`
    pub async fn resolve(&mut self, folder: &str, class: &str, name: &str) -> Result<Option<String>> {
        let key = (folder.to_string(), class.to_string(), name.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let lookup = self
            .gateway
            .find_id_by_name(folder, class, name, self.create_missing)
            .await?;
        if lookup.id().is_none() && !lookup.is_ambiguous() {
            log::warn!("Reference '{}' is not found in folder {}", name, folder);
        }

        let id = lookup.into_id();
        self.cache.insert(key, id.clone());
        Ok(id)
    }

    /// Payload value for one declared attribute; null is sent as null
    pub async fn render(
        &mut self,
        value: &Value,
        declaration: &AttributeDeclaration,
    ) -> Result<serde_json::Value> {
        match &declaration.kind {
            AttributeKind::Reference { folder, class } => {
                let Some(name) = value.key_text() else {
                    return Ok(serde_json::Value::Null);
                };
                Ok(match self.resolve(folder, class, &name).await? {
                    Some(id) => json!({"Id": id, "Name": name}),
                    None => serde_json::Value::Null,
                })
            }
            _ => Ok(value.to_json()),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
