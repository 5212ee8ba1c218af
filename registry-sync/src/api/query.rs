//! Fluent builder for registry search requests
//!
//! Mirrors the shape of the `api/objects/search` body: a list of scope filters
//! (parent node, class) and a list of conditions (name or attribute tests).

use serde::Serialize;

/// Default page size for searches that do not specify one
pub const DEFAULT_TAKE: u64 = 100;

mod filter_type {
    pub const PARENT: u8 = 4;
    pub const CLASS: u8 = 5;
}

mod condition_type {
    pub const ATTRIBUTE: u8 = 1;
    pub const NAME: u8 = 2;
}

mod operator {
    pub const EQUALS: u8 = 1;
    pub const EXISTS: u8 = 7;
}

/// Scope filter (`Filters` entry)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeFilter {
    #[serde(rename = "Type")]
    pub kind: u8,
    #[serde(rename = "Value")]
    pub value: String,
}

/// Search condition (`Conditions` entry)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    #[serde(rename = "Type")]
    pub kind: u8,
    #[serde(rename = "Operator")]
    pub operator: u8,
    #[serde(rename = "Value", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "Attribute", skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Condition {
    /// Object name equals `name`
    pub fn name_eq(name: impl Into<String>) -> Self {
        Self {
            kind: condition_type::NAME,
            operator: operator::EQUALS,
            value: Some(name.into()),
            attribute: None,
        }
    }

    /// Attribute `attribute_id` equals `value`
    pub fn attribute_eq(attribute_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: condition_type::ATTRIBUTE,
            operator: operator::EQUALS,
            value: Some(value.into()),
            attribute: Some(attribute_id.into()),
        }
    }

    /// Attribute `attribute_id` has any value
    pub fn attribute_exists(attribute_id: impl Into<String>) -> Self {
        Self {
            kind: condition_type::ATTRIBUTE,
            operator: operator::EXISTS,
            value: None,
            attribute: Some(attribute_id.into()),
        }
    }

    #[cfg(test)]
    pub fn is_name(&self) -> bool {
        self.kind == condition_type::NAME
    }

    #[cfg(test)]
    pub fn is_exists(&self) -> bool {
        self.operator == operator::EXISTS
    }
}

/// A complete search request: body plus paging parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    #[serde(rename = "Filters")]
    pub filters: Vec<ScopeFilter>,
    #[serde(rename = "Conditions", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip)]
    pub take: u64,
    #[serde(skip)]
    pub skip: u64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            conditions: Vec::new(),
            take: DEFAULT_TAKE,
            skip: 0,
        }
    }
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to objects below `parent_id`
    pub fn under(mut self, parent_id: impl Into<String>) -> Self {
        self.filters.push(ScopeFilter {
            kind: filter_type::PARENT,
            value: parent_id.into(),
        });
        self
    }

    /// Restrict to objects of `class_id`
    pub fn of_class(mut self, class_id: impl Into<String>) -> Self {
        self.filters.push(ScopeFilter {
            kind: filter_type::CLASS,
            value: class_id.into(),
        });
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn where_name(self, name: impl Into<String>) -> Self {
        self.condition(Condition::name_eq(name))
    }

    pub fn where_attribute(self, attribute_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition(Condition::attribute_eq(attribute_id, value))
    }

    pub fn where_attribute_exists(self, attribute_id: impl Into<String>) -> Self {
        self.condition(Condition::attribute_exists(attribute_id))
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = take;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Parent filter value, if any
    #[cfg(test)]
    pub fn parent(&self) -> Option<&str> {
        self.filter_value(filter_type::PARENT)
    }

    /// Class filter value, if any
    #[cfg(test)]
    pub fn class(&self) -> Option<&str> {
        self.filter_value(filter_type::CLASS)
    }

    #[cfg(test)]
    fn filter_value(&self, kind: u8) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.kind == kind)
            .map(|f| f.value.as_str())
    }

    /// Query string appended to the search endpoint
    pub fn query_string(&self) -> String {
        if self.skip > 0 {
            format!("take={}&skip={}", self.take, self.skip)
        } else {
            format!("take={}", self.take)
        }
    }
}
