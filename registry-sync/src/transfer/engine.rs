//! Reconciliation engine: current registry records vs imported records
//!
//! Pure functions only. The caller fetches, applies deletions, then upserts.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::transfer::types::{CurrentRecord, Record};

/// What has to change for one category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Ids sharing a business key with another current item
    pub duplicates: BTreeSet<String>,
    /// Ids whose business key is no longer imported
    pub cancellations: BTreeSet<String>,
    /// Imported records to upsert, in import order
    pub updates: Vec<Record>,
}

impl Plan {
    /// Everything to delete before upserting
    pub fn deletions(&self) -> BTreeSet<String> {
        self.duplicates.union(&self.cancellations).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty() && self.cancellations.is_empty() && self.updates.is_empty()
    }
}

/// Current records grouped by business key; keyless items are left out
fn index_by_key<'a>(
    current: &'a [CurrentRecord],
    key_field: &str,
) -> BTreeMap<String, Vec<&'a CurrentRecord>> {
    let mut index: BTreeMap<String, Vec<&CurrentRecord>> = BTreeMap::new();
    for item in current {
        if let Some(key) = item.record.text(key_field) {
            index.entry(key).or_default().push(item);
        }
    }
    index
}

/// Every id whose key occurs more than once among current records
pub fn find_duplicates(current: &[CurrentRecord], key_field: &str) -> BTreeSet<String> {
    index_by_key(current, key_field)
        .into_values()
        .filter(|items| items.len() > 1)
        .flatten()
        .map(|item| item.id.clone())
        .collect()
}

/// Every id whose key is absent from the import (items without a key included)
pub fn find_cancellations(
    current: &[CurrentRecord],
    imported: &[Record],
    key_field: &str,
) -> BTreeSet<String> {
    let imported_keys: HashSet<String> = imported.iter().filter_map(|r| r.text(key_field)).collect();

    current
        .iter()
        .filter(|item| {
            item.record
                .text(key_field)
                .is_none_or(|key| !imported_keys.contains(&key))
        })
        .map(|item| item.id.clone())
        .collect()
}

/// Imported records that are new, changed, or whose current copies are duplicates
///
/// `excluded` fields (the grouping column) never count as a change.
pub fn compute_updates(
    current: &[CurrentRecord],
    imported: &[Record],
    key_field: &str,
    excluded: &[&str],
) -> Vec<Record> {
    let index = index_by_key(current, key_field);

    imported
        .iter()
        .filter(|record| {
            let Some(key) = record.text(key_field) else {
                return false;
            };
            match index.get(&key).map(Vec::as_slice) {
                // duplicates are all deleted, so the record has to be recreated
                Some([existing]) => !record.same_as(&existing.record, excluded),
                _ => true,
            }
        })
        .cloned()
        .collect()
}

/// Full plan; an empty import never deletes anything
pub fn reconcile(
    current: &[CurrentRecord],
    imported: &[Record],
    key_field: &str,
    excluded: &[&str],
) -> Plan {
    if imported.is_empty() {
        return Plan::default();
    }

    Plan {
        duplicates: find_duplicates(current, key_field),
        cancellations: find_cancellations(current, imported, key_field),
        updates: compute_updates(current, imported, key_field, excluded),
    }
}
