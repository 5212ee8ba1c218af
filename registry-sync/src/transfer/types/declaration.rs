//! Attribute declarations: how a spreadsheet column maps onto a registry attribute

use regex::Regex;

/// Wire type codes used by the registry
pub mod wire_type {
    pub const NUMERIC: u8 = 1;
    pub const STRING: u8 = 2;
    pub const DATE: u8 = 3;
    pub const DATE_TIME: u8 = 5;
    pub const REFERENCE: u8 = 8;
}

/// How a declared attribute is typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Numeric,
    Date,
    /// Resolved by name among objects of `class` below `folder`
    Reference { folder: String, class: String },
}

impl AttributeKind {
    /// Map a wire type code to a kind; unknown codes are treated as text
    pub fn from_wire_type(
        code: u8,
        folder: Option<String>,
        class: Option<String>,
    ) -> Result<Self, DeclarationError> {
        Ok(match code {
            wire_type::NUMERIC => AttributeKind::Numeric,
            wire_type::DATE | wire_type::DATE_TIME => AttributeKind::Date,
            wire_type::REFERENCE => match (folder, class) {
                (Some(folder), Some(class)) => AttributeKind::Reference { folder, class },
                _ => return Err(DeclarationError::MissingReferenceTarget),
            },
            _ => AttributeKind::String,
        })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, AttributeKind::Reference { .. })
    }
}

/// Error building a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// Reference attribute without folder/class
    MissingReferenceTarget,
    /// Regex attribute without an alternate name
    MissingAlternateName,
    /// Regex does not compile
    InvalidRegex { pattern: String, message: String },
}

impl std::fmt::Display for DeclarationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeclarationError::MissingReferenceTarget => {
                write!(f, "reference attribute requires both folder and class")
            }
            DeclarationError::MissingAlternateName => {
                write!(f, "attribute with a regexp requires regexp_name")
            }
            DeclarationError::InvalidRegex { pattern, message } => {
                write!(f, "invalid regexp '{}': {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for DeclarationError {}

/// One row of the attribute mapping
#[derive(Debug, Clone)]
pub struct AttributeDeclaration {
    /// Source column name in the spreadsheet
    pub name: String,
    /// Registry attribute id
    pub attribute_id: String,
    /// Wire type code sent with every write
    pub wire_type: u8,
    pub kind: AttributeKind,
    /// Optional sub-extraction applied before typing (first capture group)
    pub regex: Option<Regex>,
    /// Record field name used instead of `name` when `regex` is set
    pub alternate_name: Option<String>,
}

impl AttributeDeclaration {
    pub fn new(
        name: impl Into<String>,
        attribute_id: impl Into<String>,
        wire_type: u8,
        kind: AttributeKind,
    ) -> Self {
        Self {
            name: name.into(),
            attribute_id: attribute_id.into(),
            wire_type,
            kind,
            regex: None,
            alternate_name: None,
        }
    }

    pub fn string(name: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self::new(name, attribute_id, wire_type::STRING, AttributeKind::String)
    }

    pub fn numeric(name: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self::new(name, attribute_id, wire_type::NUMERIC, AttributeKind::Numeric)
    }

    pub fn date(name: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self::new(name, attribute_id, wire_type::DATE, AttributeKind::Date)
    }

    pub fn reference(
        name: impl Into<String>,
        attribute_id: impl Into<String>,
        folder: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            attribute_id,
            wire_type::REFERENCE,
            AttributeKind::Reference {
                folder: folder.into(),
                class: class.into(),
            },
        )
    }

    /// Attach a regex sub-extraction whose result is stored under `alternate_name`
    pub fn with_regex(
        mut self,
        pattern: &str,
        alternate_name: impl Into<String>,
    ) -> Result<Self, DeclarationError> {
        let alternate_name = alternate_name.into();
        if alternate_name.trim().is_empty() {
            return Err(DeclarationError::MissingAlternateName);
        }
        let regex = Regex::new(pattern).map_err(|e| DeclarationError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.regex = Some(regex);
        self.alternate_name = Some(alternate_name);
        Ok(self)
    }

    /// Field name this attribute occupies in a [`Record`](super::Record)
    pub fn destination(&self) -> &str {
        match (&self.regex, &self.alternate_name) {
            (Some(_), Some(alternate)) => alternate,
            _ => &self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_wire_type() {
        assert_eq!(
            AttributeKind::from_wire_type(1, None, None).unwrap(),
            AttributeKind::Numeric
        );
        assert_eq!(
            AttributeKind::from_wire_type(5, None, None).unwrap(),
            AttributeKind::Date
        );
        assert_eq!(
            AttributeKind::from_wire_type(42, None, None).unwrap(),
            AttributeKind::String
        );
        assert_eq!(
            AttributeKind::from_wire_type(8, Some("f".into()), None),
            Err(DeclarationError::MissingReferenceTarget)
        );
        assert!(
            AttributeKind::from_wire_type(8, Some("f".into()), Some("c".into()))
                .unwrap()
                .is_reference()
        );
    }

    #[test]
    fn test_destination_switches_with_regex() {
        let plain = AttributeDeclaration::string("Номер", "a1");
        assert_eq!(plain.destination(), "Номер");

        let derived = AttributeDeclaration::string("Номер", "a2")
            .with_regex(r"(\d+)", "Номер (цифры)")
            .unwrap();
        assert_eq!(derived.destination(), "Номер (цифры)");
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let err = AttributeDeclaration::string("x", "a")
            .with_regex("(unclosed", "y")
            .unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidRegex { .. }));

        let err = AttributeDeclaration::string("x", "a")
            .with_regex("(.*)", " ")
            .unwrap_err();
        assert_eq!(err, DeclarationError::MissingAlternateName);
    }
}
