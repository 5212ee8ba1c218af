//! Record value representation shared by imported and registry-side records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A typed attribute value inside a [`Record`](super::Record)
///
/// References are carried by their display name; they only become an
/// `{Id, Name}` payload when a record is written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Null/empty value
    #[default]
    Null,
    /// Text (also reference display names)
    String(String),
    /// Numeric attribute
    Float(f64),
    /// Calendar date, time of day dropped
    Date(NaiveDate),
}

impl Value {
    /// Text form used for business keys and folder names; `None` for null or blank
    pub fn key_text(&self) -> Option<String> {
        let text = match self {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            Value::Float(f) => format_number(*f),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Convert to the JSON value sent to the registry
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Float(f) => serde_json::json!(*f),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Render a number the way a spreadsheet shows it: whole numbers without `.0`
pub fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "(null)"),
            Value::String(s) => write!(f, "{}", s),
            Value::Float(fl) => write!(f, "{}", format_number(*fl)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
