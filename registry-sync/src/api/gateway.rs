//! Idempotent registry operations built on top of a [`RegistryBackend`]
//!
//! Lookups return a [`Lookup`] instead of a bare id so callers can tell a
//! missing object from an ambiguous one. Mutations never fail the caller: a
//! rejected create/write/delete is logged with its context and reported as
//! `None`/`false`.

use anyhow::Result;
use serde_json::Value;

use super::client::RegistryBackend;
use super::models::{AttributeWrite, RegistryObject};
use super::operations::Operation;
use super::query::{Condition, SearchQuery};

/// Page size for name lookups (one hit expected, three is enough to detect ambiguity)
const NAME_LOOKUP_TAKE: u64 = 3;
/// Page size for key lookups
const KEY_LOOKUP_TAKE: u64 = 30;
/// Default page size for full scope searches
pub const DEFAULT_PAGE_SIZE: u64 = 50_000;

/// Wire type code used when writing the key attribute
const KEY_ATTRIBUTE_TYPE: u8 = 2;

/// Outcome of a find-or-create lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Exactly one existing object matched
    Found(String),
    /// Nothing matched and a new object was created
    Created(String),
    /// Nothing matched and nothing was created
    NotFound,
    /// More than one object matched
    Ambiguous(u64),
}

impl Lookup {
    pub fn id(&self) -> Option<&str> {
        match self {
            Lookup::Found(id) | Lookup::Created(id) => Some(id),
            Lookup::NotFound | Lookup::Ambiguous(_) => None,
        }
    }

    pub fn into_id(self) -> Option<String> {
        match self {
            Lookup::Found(id) | Lookup::Created(id) => Some(id),
            Lookup::NotFound | Lookup::Ambiguous(_) => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Lookup::Ambiguous(_))
    }
}

/// Registry gateway shared read-only by every component of a run
pub struct Gateway<B> {
    backend: B,
    page_size: u64,
}

impl<B: RegistryBackend> Gateway<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Find an object of `class_id` named `name` below `parent_id`
    pub async fn find_id_by_name(
        &self,
        parent_id: &str,
        class_id: &str,
        name: &str,
        create: bool,
    ) -> Result<Lookup> {
        let query = SearchQuery::new()
            .under(parent_id)
            .of_class(class_id)
            .where_name(name)
            .take(NAME_LOOKUP_TAKE);

        let response = self.backend.search(&query).await?;
        match response.total {
            1 => match response.result.first() {
                Some(hit) => Ok(Lookup::Found(hit.object.id.clone())),
                None => Ok(Lookup::NotFound),
            },
            0 if create => Ok(match self.create_under(parent_id, class_id, name).await {
                Some(id) => Lookup::Created(id),
                None => Lookup::NotFound,
            }),
            0 => Ok(Lookup::NotFound),
            total => {
                log::warn!(
                    "More than one result is found for {}, class id {}, name {}",
                    parent_id,
                    class_id,
                    name
                );
                Ok(Lookup::Ambiguous(total))
            }
        }
    }

    /// Find an object of `class_id` whose `key_attribute_id` equals `key_value`,
    /// creating it (named `display_name`, key attribute written) when absent
    ///
    /// `scope` narrows the lookup to objects that also satisfy an attribute
    /// condition; a created object gets that attribute along with its key.
    pub async fn find_id_by_key(
        &self,
        parent_id: &str,
        class_id: &str,
        display_name: &str,
        key_value: &str,
        key_attribute_id: &str,
        scope: Option<&Condition>,
    ) -> Result<Lookup> {
        let mut query = SearchQuery::new()
            .under(parent_id)
            .of_class(class_id)
            .where_attribute(key_attribute_id, key_value)
            .take(KEY_LOOKUP_TAKE);
        if let Some(condition) = scope {
            query = query.condition(condition.clone());
        }

        let response = self.backend.search(&query).await?;
        match response.total {
            0 => {
                let Some(id) = self.create_under(parent_id, class_id, display_name).await else {
                    return Ok(Lookup::NotFound);
                };
                // Write the key right away so the object is found on the next pass
                let mut writes = vec![AttributeWrite::new(
                    key_attribute_id,
                    KEY_ATTRIBUTE_TYPE,
                    Value::String(key_value.to_string()),
                )];
                if let Some((attribute, value)) = scope.and_then(scope_attribute) {
                    writes.push(AttributeWrite::new(
                        attribute,
                        KEY_ATTRIBUTE_TYPE,
                        Value::String(value.to_string()),
                    ));
                }
                self.write_attributes(&id, writes).await;
                Ok(Lookup::Created(id))
            }
            1 => match response.result.first() {
                Some(hit) => Ok(Lookup::Found(hit.object.id.clone())),
                None => Ok(Lookup::NotFound),
            },
            total => {
                log::warn!(
                    "Key {} matches {} objects under {} (class {})",
                    key_value,
                    total,
                    parent_id,
                    class_id
                );
                Ok(Lookup::Ambiguous(total))
            }
        }
    }

    /// Create one object; `None` (and a warning) when the registry rejects it
    pub async fn create_under(&self, parent_id: &str, class_id: &str, name: &str) -> Option<String> {
        let operation = Operation::create(parent_id, class_id, name);
        match self.backend.execute(&operation).await {
            Ok(result) if result.is_success() => {
                let id = result.object_id();
                if id.is_none() {
                    log::warn!("Item {} is created but the response carries no id", name);
                }
                id
            }
            Ok(result) => {
                log::warn!("Item is not created {} {}", name, result.describe_error());
                None
            }
            Err(e) => {
                log::warn!("Item is not created {}: {:#}", name, e);
                None
            }
        }
    }

    /// Bulk attribute write; returns whether the registry accepted it
    pub async fn write_attributes(&self, item_id: &str, attributes: Vec<AttributeWrite>) -> bool {
        let operation = Operation::put_attributes(item_id, attributes);
        match self.backend.execute(&operation).await {
            Ok(result) if result.is_success() => true,
            Ok(result) => {
                log::warn!(
                    "Put attributes error. Url {}, body {}, response {}",
                    operation.path(),
                    attributes_for_log(&operation),
                    result.describe_error()
                );
                false
            }
            Err(e) => {
                log::warn!("Put attributes error. Url {}: {:#}", operation.path(), e);
                false
            }
        }
    }

    /// Delete one object; returns whether the registry accepted it
    pub async fn delete_item(&self, item_id: &str) -> bool {
        let operation = Operation::delete(item_id);
        match self.backend.execute(&operation).await {
            Ok(result) if result.is_success() => true,
            Ok(result) => {
                log::warn!("Item {} is not deleted: {}", item_id, result.describe_error());
                false
            }
            Err(e) => {
                log::warn!("Item {} is not deleted: {:#}", item_id, e);
                false
            }
        }
    }

    /// One page of results exactly as requested (no paging)
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RegistryObject>> {
        let response = self.backend.search(query).await?;
        Ok(response.result.into_iter().map(|hit| hit.object).collect())
    }

    /// Total number of `class_id` objects below `parent_id`
    pub async fn count_under(
        &self,
        parent_id: &str,
        class_id: &str,
        filter: Option<&Condition>,
    ) -> Result<u64> {
        let mut query = SearchQuery::new().under(parent_id).of_class(class_id).take(0);
        if let Some(condition) = filter {
            query = query.condition(condition.clone());
        }
        Ok(self.backend.search(&query).await?.total)
    }

    /// All `class_id` objects below `parent_id`, fetched page by page
    pub async fn search_under(
        &self,
        parent_id: &str,
        class_id: &str,
        filter: Option<&Condition>,
    ) -> Result<Vec<RegistryObject>> {
        let mut base = SearchQuery::new().under(parent_id).of_class(class_id);
        if let Some(condition) = filter {
            base = base.condition(condition.clone());
        }
        self.search_all(base).await
    }

    /// Run `query` with paging until `Total` objects were collected
    pub async fn search_all(&self, query: SearchQuery) -> Result<Vec<RegistryObject>> {
        let mut objects = Vec::new();
        let mut skip = 0u64;

        loop {
            let page = query.clone().take(self.page_size).skip(skip);
            let response = self.backend.search(&page).await?;
            let fetched = response.result.len() as u64;
            objects.extend(response.result.into_iter().map(|hit| hit.object));

            if fetched == 0 || objects.len() as u64 >= response.total {
                break;
            }
            skip += fetched;
        }

        log::debug!("Fetched {} objects", objects.len());
        Ok(objects)
    }
}

/// Attribute and value of an equality condition
fn scope_attribute(condition: &Condition) -> Option<(&str, &str)> {
    Some((condition.attribute.as_deref()?, condition.value.as_deref()?))
}

fn attributes_for_log(operation: &Operation) -> String {
    match operation {
        Operation::PutAttributes { attributes, .. } => {
            serde_json::to_string(attributes).unwrap_or_default()
        }
        _ => String::new(),
    }
}
