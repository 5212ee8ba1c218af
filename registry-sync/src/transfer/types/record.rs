//! Records: attribute name -> value maps on both sides of the diff

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Value;

/// One row, either imported from a spreadsheet or read back from the registry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value.into());
        self
    }

    /// Text of `field`, `None` when missing, null or blank
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Value::key_text)
    }

    /// Fields compared during the diff: everything except `excluded`
    pub fn comparable<'a>(
        &'a self,
        excluded: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.fields
            .iter()
            .filter(move |(name, _)| !excluded.contains(&name.as_str()))
    }

    /// Field-by-field equality ignoring `excluded`; a field present on one side
    /// only counts as a difference
    pub fn same_as(&self, other: &Record, excluded: &[&str]) -> bool {
        self.comparable(excluded).eq(other.comparable(excluded))
    }
}

/// A record read from the registry together with the object it came from
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRecord {
    pub id: String,
    pub record: Record,
}

impl CurrentRecord {
    pub fn new(id: impl Into<String>, record: Record) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_as_ignores_excluded_fields() {
        let a = Record::new().with("key", "K").with("qty", 1.0).with("Папка", "A");
        let b = Record::new().with("key", "K").with("qty", 1.0);
        assert!(a.same_as(&b, &["Папка"]));
        assert!(!a.same_as(&b, &[]));
    }

    #[test]
    fn test_missing_field_is_a_difference() {
        let a = Record::new().with("key", "K").with("note", "x");
        let b = Record::new().with("key", "K");
        assert!(!a.same_as(&b, &[]));
        assert!(!b.same_as(&a, &[]));
    }

    #[test]
    fn test_text() {
        let record = Record::new().with("key", 12.0).with("blank", "");
        assert_eq!(record.text("key"), Some("12".to_string()));
        assert_eq!(record.text("blank"), None);
        assert_eq!(record.text("absent"), None);
    }
}
