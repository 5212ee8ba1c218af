//! Core Operation types for registry mutations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::models::AttributeWrite;

/// A single mutation that can be executed against the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a new object below a parent
    Create {
        /// Parent object id
        parent: String,
        /// Class (entity) id of the new object
        class: String,
        /// Display name
        name: String,
    },
    /// Overwrite attributes of an existing object
    PutAttributes {
        /// Object id
        id: String,
        /// Attribute values to write
        attributes: Vec<AttributeWrite>,
    },
    /// Delete an object
    Delete {
        /// Object id
        id: String,
    },
}

/// Result of executing an Operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// The operation that was executed
    pub operation: Operation,
    /// Whether the operation succeeded
    pub success: bool,
    /// Response body (the created object for creates)
    pub data: Option<Value>,
    /// Error message if operation failed
    pub error: Option<String>,
    /// HTTP status code from the response
    pub status_code: Option<u16>,
}

impl Operation {
    pub fn create(
        parent: impl Into<String>,
        class: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::Create {
            parent: parent.into(),
            class: class.into(),
            name: name.into(),
        }
    }

    pub fn put_attributes(id: impl Into<String>, attributes: Vec<AttributeWrite>) -> Self {
        Self::PutAttributes {
            id: id.into(),
            attributes,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    /// Get the HTTP method for this operation
    pub fn http_method(&self) -> &'static str {
        match self {
            Self::Create { .. } => "POST",
            Self::PutAttributes { .. } => "PUT",
            Self::Delete { .. } => "DELETE",
        }
    }

    /// Relative endpoint path for this operation
    pub fn path(&self) -> String {
        match self {
            Self::Create { parent, .. } => format!("api/objects?parent={}", parent),
            Self::PutAttributes { id, .. } => format!("api/objects/{}/attributes", id),
            Self::Delete { id } => format!("api/objects/{}", id),
        }
    }
}

impl OperationResult {
    /// Create a new successful result
    pub fn success(operation: Operation, data: Option<Value>) -> Self {
        Self {
            operation,
            success: true,
            data,
            error: None,
            status_code: Some(200),
        }
    }

    /// Create a new error result
    pub fn error(operation: Operation, error: String, status_code: Option<u16>) -> Self {
        Self {
            operation,
            success: false,
            data: None,
            error: Some(error),
            status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Id of the object in the response body (`Id` field)
    pub fn object_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.get("Id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Short description of the failure for log lines
    pub fn describe_error(&self) -> String {
        match (&self.status_code, &self.error) {
            (Some(code), Some(err)) => format!("{} {}", code, err),
            (None, Some(err)) => err.clone(),
            (Some(code), None) => code.to_string(),
            (None, None) => "Unknown error".to_string(),
        }
    }
}
