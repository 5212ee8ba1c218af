//! In-memory registry backend for tests

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::client::RegistryBackend;
use super::models::{AttributeValue, RegistryObject, SearchHit, SearchResponse};
use super::operations::{Operation, OperationResult};
use super::query::{Condition, SearchQuery};

#[derive(Debug, Clone)]
struct StoredObject {
    id: String,
    parent: String,
    class: String,
    name: String,
    attributes: HashMap<String, AttributeValue>,
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<StoredObject>,
    reject: bool,
    searches: usize,
    creates: usize,
    puts: usize,
    deletes: usize,
}

/// A registry held in memory; parent filters match any descendant
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly (not counted as a create)
    pub fn insert(&self, parent: &str, class: &str, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.state.lock().unwrap().objects.push(StoredObject {
            id: id.clone(),
            parent: parent.to_string(),
            class: class.to_string(),
            name: name.to_string(),
            attributes: HashMap::new(),
        });
        id
    }

    pub fn set_attribute(&self, id: &str, attribute_id: &str, value: Value, kind: u8) {
        let mut state = self.state.lock().unwrap();
        if let Some(object) = state.objects.iter_mut().find(|o| o.id == id) {
            object
                .attributes
                .insert(attribute_id.to_string(), AttributeValue { value, kind });
        }
    }

    /// Make every mutation come back with a 500
    pub fn reject_operations(&self, reject: bool) {
        self.state.lock().unwrap().reject = reject;
    }

    pub fn object(&self, id: &str) -> Option<RegistryObject> {
        let state = self.state.lock().unwrap();
        state.objects.iter().find(|o| o.id == id).map(to_object)
    }

    pub fn parent_of(&self, id: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.parent.clone())
    }

    pub fn objects_of_class(&self, class: &str) -> Vec<RegistryObject> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .filter(|o| o.class == class)
            .map(to_object)
            .collect()
    }

    pub fn search_count(&self) -> usize {
        self.state.lock().unwrap().searches
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn put_count(&self) -> usize {
        self.state.lock().unwrap().puts
    }

    pub fn delete_count(&self) -> usize {
        self.state.lock().unwrap().deletes
    }
}

fn to_object(stored: &StoredObject) -> RegistryObject {
    RegistryObject {
        id: stored.id.clone(),
        name: Some(stored.name.clone()),
        attributes: stored.attributes.clone(),
    }
}

fn is_descendant(objects: &[StoredObject], object: &StoredObject, ancestor: &str) -> bool {
    let mut parent = object.parent.as_str();
    loop {
        if parent == ancestor {
            return true;
        }
        match objects.iter().find(|o| o.id == parent) {
            Some(next) => parent = next.parent.as_str(),
            None => return false,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("Name").and_then(|n| n.as_str()).map(str::to_string),
        other => Some(other.to_string()),
    }
}

fn matches_condition(object: &StoredObject, condition: &Condition) -> bool {
    if condition.is_name() {
        return condition.value.as_deref() == Some(object.name.as_str());
    }
    let Some(attribute_id) = condition.attribute.as_deref() else {
        return false;
    };
    let stored = object
        .attributes
        .get(attribute_id)
        .and_then(|a| value_text(&a.value));
    if condition.is_exists() {
        stored.is_some()
    } else {
        stored.is_some() && stored.as_deref() == condition.value.as_deref()
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistry {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let mut state = self.state.lock().unwrap();
        state.searches += 1;

        let matching: Vec<&StoredObject> = state
            .objects
            .iter()
            .filter(|o| {
                query
                    .parent()
                    .is_none_or(|p| is_descendant(&state.objects, o, p))
            })
            .filter(|o| query.class().is_none_or(|c| o.class == c))
            .filter(|o| query.conditions.iter().all(|c| matches_condition(o, c)))
            .collect();

        let total = matching.len() as u64;
        let result = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.take as usize)
            .map(|o| SearchHit { object: to_object(o) })
            .collect();

        Ok(SearchResponse { total, result })
    }

    async fn execute(&self, operation: &Operation) -> Result<OperationResult> {
        let mut state = self.state.lock().unwrap();
        if state.reject {
            return Ok(OperationResult::error(
                operation.clone(),
                "Internal Server Error".to_string(),
                Some(500),
            ));
        }

        match operation {
            Operation::Create {
                parent,
                class,
                name,
            } => {
                state.creates += 1;
                let id = uuid::Uuid::new_v4().to_string();
                state.objects.push(StoredObject {
                    id: id.clone(),
                    parent: parent.clone(),
                    class: class.clone(),
                    name: name.clone(),
                    attributes: HashMap::new(),
                });
                Ok(OperationResult::success(
                    operation.clone(),
                    Some(json!({"Id": id, "Name": name})),
                ))
            }
            Operation::PutAttributes { id, attributes } => {
                state.puts += 1;
                let Some(object) = state.objects.iter_mut().find(|o| &o.id == id) else {
                    return Ok(OperationResult::error(
                        operation.clone(),
                        "Not Found".to_string(),
                        Some(404),
                    ));
                };
                for write in attributes {
                    if write.value.is_null() {
                        object.attributes.remove(&write.id);
                    } else {
                        object.attributes.insert(
                            write.id.clone(),
                            AttributeValue {
                                value: write.value.clone(),
                                kind: write.kind,
                            },
                        );
                    }
                }
                Ok(OperationResult::success(operation.clone(), None))
            }
            Operation::Delete { id } => {
                state.deletes += 1;
                let before = state.objects.len();
                state.objects.retain(|o| &o.id != id);
                if state.objects.len() < before {
                    Ok(OperationResult::success(operation.clone(), None))
                } else {
                    Ok(OperationResult::error(
                        operation.clone(),
                        "Not Found".to_string(),
                        Some(404),
                    ))
                }
            }
        }
    }
}
