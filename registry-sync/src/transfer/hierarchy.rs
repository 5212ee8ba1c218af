//! Hierarchy resolver: root -> category -> sub-category folders

use std::collections::BTreeSet;

use anyhow::Result;

use crate::api::{Gateway, Lookup, RegistryBackend};
use crate::transfer::types::{Category, RootScope};

/// One descriptor per configured key, in listed order; nothing is created
pub fn ensure_categories(root: &RootScope) -> Vec<Category> {
    root.category_keys
        .iter()
        .map(|key| Category::new(key.clone(), root.id.clone(), root.context.clone()))
        .collect()
}

/// Find or create sub-category folders for `groups` below the category's parent
///
/// Resolved folders are cached on the category. A group whose lookup is
/// ambiguous or whose folder cannot be created stays unresolved and its items
/// are skipped by the caller. Returns the number of newly resolved groups.
pub async fn ensure_subcategories<B, I>(
    gateway: &Gateway<B>,
    category: &mut Category,
    subcategory_class_id: &str,
    groups: I,
) -> Result<usize>
where
    B: RegistryBackend,
    I: IntoIterator<Item = String>,
{
    let pending: BTreeSet<String> = groups
        .into_iter()
        .filter(|group| !category.subcategories.contains_key(group))
        .collect();

    let mut resolved = 0;
    for group in pending {
        let lookup = gateway
            .find_id_by_name(&category.parent_id, subcategory_class_id, &group, true)
            .await?;
        match lookup {
            Lookup::Found(id) | Lookup::Created(id) => {
                category.subcategories.insert(group, id);
                resolved += 1;
            }
            Lookup::Ambiguous(_) => {
                log::warn!("Folder '{}' is ambiguous, its items are skipped", group);
            }
            Lookup::NotFound => {
                log::warn!("Folder '{}' could not be created, its items are skipped", group);
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::InMemoryRegistry;

    fn root(keys: &[&str]) -> RootScope {
        RootScope {
            id: "root".into(),
            category_keys: keys.iter().map(|k| k.to_string()).collect(),
            context: None,
        }
    }

    #[test]
    fn test_categories_follow_key_order() {
        let categories = ensure_categories(&root(&["B", "A"]));
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(categories.iter().all(|c| c.parent_id == "root"));
    }

    #[tokio::test]
    async fn test_subcategories_created_once_and_cached() {
        let registry = InMemoryRegistry::new();
        let root_id = registry.insert("top", "root-class", "Root");
        let existing = registry.insert(&root_id, "folder", "КЖ");
        let gateway = Gateway::new(registry);

        let mut category = Category::new("A", root_id.clone(), None);
        let groups = vec!["КЖ".to_string(), "АР".to_string(), "АР".to_string()];
        let resolved = ensure_subcategories(&gateway, &mut category, "folder", groups)
            .await
            .unwrap();

        assert_eq!(resolved, 2);
        assert_eq!(category.subcategory("КЖ"), Some(existing.as_str()));
        let created = category.subcategory("АР").unwrap().to_string();
        assert_eq!(gateway.backend().parent_of(&created), Some(root_id));
        assert_eq!(gateway.backend().create_count(), 1);

        let searches = gateway.backend().search_count();
        ensure_subcategories(&gateway, &mut category, "folder", vec!["АР".to_string()])
            .await
            .unwrap();
        assert_eq!(gateway.backend().search_count(), searches);
    }

    #[tokio::test]
    async fn test_ambiguous_folder_stays_unresolved() {
        let registry = InMemoryRegistry::new();
        let root_id = registry.insert("top", "root-class", "Root");
        registry.insert(&root_id, "folder", "КЖ");
        registry.insert(&root_id, "folder", "КЖ");
        let gateway = Gateway::new(registry);

        let mut category = Category::new("A", root_id, None);
        ensure_subcategories(&gateway, &mut category, "folder", vec!["КЖ".to_string()])
            .await
            .unwrap();
        assert_eq!(category.subcategory("КЖ"), None);
    }
}
