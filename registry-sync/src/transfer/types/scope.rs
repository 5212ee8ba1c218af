//! Root scopes and the categories configured on them

use std::collections::BTreeMap;

use crate::api::RegistryObject;

/// A registry node carrying the list of category keys for one business unit
#[derive(Debug, Clone, PartialEq)]
pub struct RootScope {
    pub id: String,
    /// Category keys in configured order
    pub category_keys: Vec<String>,
    /// Opaque value copied onto every item below this root
    pub context: Option<serde_json::Value>,
}

impl RootScope {
    /// Build a root from a search hit; `None` when the key attribute is missing
    pub fn from_object(
        object: &RegistryObject,
        keys_attribute_id: &str,
        context_attribute_id: &str,
    ) -> Option<Self> {
        let keys = object.attribute(keys_attribute_id)?.value.as_str()?;
        let context = object
            .attribute(context_attribute_id)
            .map(|a| a.value.clone())
            .filter(|v| !v.is_null());

        Some(Self {
            id: object.id.clone(),
            category_keys: parse_category_keys(keys),
            context,
        })
    }
}

/// Split `"A; B;C"` into `["A", "B", "C"]`; spaces are not significant
pub fn parse_category_keys(raw: &str) -> Vec<String> {
    raw.replace(' ', "")
        .split(';')
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// A level-one grouping below a root
///
/// Only a descriptor: nothing is created in the registry for it. Sub-category
/// folders are resolved lazily and cached here for the rest of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    /// Parent scope: the root the category was configured on
    pub parent_id: String,
    pub context: Option<serde_json::Value>,
    /// Grouping value -> sub-category folder id
    pub subcategories: BTreeMap<String, String>,
}

impl Category {
    pub fn new(
        name: impl Into<String>,
        parent_id: impl Into<String>,
        context: Option<serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            parent_id: parent_id.into(),
            context,
            subcategories: BTreeMap::new(),
        }
    }

    pub fn subcategory(&self, group: &str) -> Option<&str> {
        self.subcategories.get(group).map(String::as_str)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
