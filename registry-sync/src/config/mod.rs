//! Run configuration: `config_{suffix}.json`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::transfer::modes::{DEFAULT_FILTERED_CATEGORIES, Mode};
use crate::transfer::types::AttributeDeclaration;

/// Registry ids and file locations for one deployment
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Registry base URL
    pub url: String,
    /// Prefix of the log file path (`{logs_path}{date}_{suffix}.log`)
    pub logs_path: String,
    /// Workbook holding the attribute mapping
    pub attributes_file: PathBuf,
    /// Form-encoded token request body
    pub auth_data_file: PathBuf,
    /// Directory scanned for source extracts
    pub files_directory: PathBuf,

    pub root_class_id: String,
    /// Attribute on roots listing the category keys
    pub config_attribute_id: String,
    /// Attribute on roots (and items) holding the context reference
    pub object_attribute_id: String,
    pub level_two_class_id: String,
    pub level_two_column_name: String,
    pub item_class_id: String,
    pub key_attribute_id: String,
    /// Destination name of the business key in records
    pub key_column_name: String,
    /// Category-name attribute, material requests only
    #[serde(default)]
    pub level_one_name_attribute_id: Option<String>,

    #[serde(default = "default_mapping_sheet")]
    pub mapping_sheet: String,
    #[serde(default = "default_source_sheet")]
    pub source_sheet: String,
    #[serde(default = "default_group_label")]
    pub default_group_label: String,
    #[serde(default = "default_search_page_size")]
    pub search_page_size: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Create referenced objects that do not exist yet
    #[serde(default)]
    pub create_missing_references: bool,
    /// Files renamed in `files_directory` before the run (old -> new)
    #[serde(default)]
    pub file_renames: BTreeMap<String, String>,
    /// Material-request categories limited to restoration rows
    #[serde(default = "default_filtered_categories")]
    pub filtered_categories: Vec<String>,
}

fn default_mapping_sheet() -> String {
    "Лист1".to_string()
}

fn default_source_sheet() -> String {
    "TDSheet".to_string()
}

fn default_group_label() -> String {
    "Прочее".to_string()
}

fn default_search_page_size() -> u64 {
    50_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_filtered_categories() -> Vec<String> {
    DEFAULT_FILTERED_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// A configuration that parses but cannot drive a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value is blank
    Blank(&'static str),
    /// A value only some modes need is missing
    MissingForMode { field: &'static str, mode: Mode },
    /// The key column is not produced by any declared attribute
    KeyNotDeclared(String),
    /// The search page size is zero
    ZeroPageSize,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Blank(field) => write!(f, "'{}' must not be empty", field),
            ConfigError::MissingForMode { field, mode } => {
                write!(f, "'{}' is required in {} mode", field, mode)
            }
            ConfigError::KeyNotDeclared(key) => write!(
                f,
                "key column '{}' is not a declared attribute in the mapping",
                key
            ),
            ConfigError::ZeroPageSize => write!(f, "'search_page_size' must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// `config_{suffix}.json` in `directory`
    pub fn path_for(directory: &Path, suffix: &str) -> PathBuf {
        directory.join(format!("config_{}.json", suffix))
    }

    pub fn load(directory: &Path, suffix: &str) -> Result<Self> {
        let path = Self::path_for(directory, suffix);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Checks that do not need the attribute mapping
    pub fn validate(&self, mode: Mode) -> Result<(), ConfigError> {
        let required = [
            ("url", &self.url),
            ("root_class_id", &self.root_class_id),
            ("config_attribute_id", &self.config_attribute_id),
            ("object_attribute_id", &self.object_attribute_id),
            ("level_two_class_id", &self.level_two_class_id),
            ("level_two_column_name", &self.level_two_column_name),
            ("item_class_id", &self.item_class_id),
            ("key_attribute_id", &self.key_attribute_id),
            ("key_column_name", &self.key_column_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Blank(field));
            }
        }

        if self.search_page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }

        if mode.scopes_by_category_attribute() && self.category_name_attribute().is_none() {
            return Err(ConfigError::MissingForMode {
                field: "level_one_name_attribute_id",
                mode,
            });
        }

        Ok(())
    }

    /// The business key must come out of the mapping
    pub fn validate_key(&self, declarations: &[AttributeDeclaration]) -> Result<(), ConfigError> {
        if declarations
            .iter()
            .any(|d| d.destination() == self.key_column_name)
        {
            Ok(())
        } else {
            Err(ConfigError::KeyNotDeclared(self.key_column_name.clone()))
        }
    }

    /// Category-name attribute when configured and not blank
    pub fn category_name_attribute(&self) -> Option<&str> {
        self.level_one_name_attribute_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Log file for today's run
    pub fn log_file(&self, suffix: &str, today: chrono::NaiveDate) -> PathBuf {
        PathBuf::from(format!(
            "{}{}_{}.log",
            self.logs_path,
            today.format("%Y-%m-%d"),
            suffix
        ))
    }
}
