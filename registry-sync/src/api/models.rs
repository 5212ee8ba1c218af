//! Wire models for the registry JSON API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder name the registry expects on nested references and attribute writes
pub const VALIDATION_NAME: &str = "forvalidation";

/// Envelope returned by `api/objects/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "Total", default)]
    pub total: u64,
    #[serde(rename = "Result", default)]
    pub result: Vec<SearchHit>,
}

impl SearchResponse {
    /// Ids of all returned objects, in response order
    pub fn ids(&self) -> Vec<String> {
        self.result.iter().map(|hit| hit.object.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "Object")]
    pub object: RegistryObject,
}

/// An object as returned by search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryObject {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    /// Attribute id -> stored value
    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, AttributeValue>,
}

impl RegistryObject {
    pub fn attribute(&self, attribute_id: &str) -> Option<&AttributeValue> {
        self.attributes.get(attribute_id)
    }
}

/// A typed attribute value stored on an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    #[serde(rename = "Value", default)]
    pub value: Value,
    #[serde(rename = "Type", default)]
    pub kind: u8,
}

/// One entry of a bulk attribute write (`PUT api/objects/{id}/attributes`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeWrite {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Value,
    #[serde(rename = "Type")]
    pub kind: u8,
    #[serde(rename = "Id")]
    pub id: String,
}

impl AttributeWrite {
    pub fn new(attribute_id: impl Into<String>, kind: u8, value: Value) -> Self {
        Self {
            name: VALIDATION_NAME.to_string(),
            value,
            kind,
            id: attribute_id.into(),
        }
    }
}

/// Body of `POST api/objects?parent={id}`
#[derive(Debug, Clone, Serialize)]
pub struct CreateObjectRequest {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Entity")]
    pub entity: EntityRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityRef {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

impl CreateObjectRequest {
    pub fn new(class_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::nil().to_string(),
            name: name.into(),
            entity: EntityRef {
                id: class_id.into(),
                name: VALIDATION_NAME.to_string(),
            },
        }
    }
}

/// Response of `POST connect/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
