//! One synchronization run: roots -> categories -> reconcile -> upsert
//!
//! Every category goes through the same steps in order: locate the source
//! file, normalize it, fetch what the registry holds, plan, delete, resolve
//! folders, upsert, archive. A failure anywhere inside a category is logged
//! and the run moves on to the next one.

use anyhow::{Context, Result};
use serde_json::json;

use crate::api::{AttributeWrite, Condition, Gateway, RegistryBackend, RegistryObject, SearchQuery};
use crate::config::Config;
use crate::transfer::codec::{ReferenceResolver, decode_current};
use crate::transfer::engine;
use crate::transfer::excel::read_source_sheet;
use crate::transfer::files::{self, SourceFile};
use crate::transfer::hierarchy::{ensure_categories, ensure_subcategories};
use crate::transfer::modes::{Mode, PrepareContext};
use crate::transfer::normalizer::{RecordLayout, normalize};
use crate::transfer::types::{
    AttributeDeclaration, Category, CurrentRecord, Record, RootScope, Value, wire_type,
};

/// Roots are few; one page is enough
const ROOT_SEARCH_TAKE: u64 = 100;

/// How a category run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Reconciled and archived
    Synced,
    /// No source file for this category
    NoSource,
    /// Source file had no usable rows; archived, registry untouched
    EmptySource,
}

/// Counters for one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReport {
    pub category: String,
    pub outcome: CategoryOutcome,
    pub imported: usize,
    pub current: usize,
    pub updates: usize,
    pub planned_deletions: usize,
    pub deleted: usize,
    pub upserted: usize,
    pub skipped: usize,
    /// Items in scope once the category is done
    pub total_after: Option<u64>,
}

impl CategoryReport {
    fn new(category: &str, outcome: CategoryOutcome) -> Self {
        Self {
            category: category.to_string(),
            outcome,
            imported: 0,
            current: 0,
            updates: 0,
            planned_deletions: 0,
            deleted: 0,
            upserted: 0,
            skipped: 0,
            total_after: None,
        }
    }
}

impl std::fmt::Display for CategoryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            CategoryOutcome::NoSource => write!(f, "{}: no source file", self.category),
            CategoryOutcome::EmptySource => write!(f, "{}: source file is empty", self.category),
            CategoryOutcome::Synced => write!(
                f,
                "{}: imported {}, current {}, updates {}, deleted {}/{}, upserted {}, skipped {}",
                self.category,
                self.imported,
                self.current,
                self.updates,
                self.deleted,
                self.planned_deletions,
                self.upserted,
                self.skipped
            ),
        }
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub roots: usize,
    pub reports: Vec<CategoryReport>,
    pub failed: Vec<String>,
}

/// Drives one run against a registry; holds the per-run reference cache
pub struct Synchronizer<'a, B> {
    gateway: &'a Gateway<B>,
    config: &'a Config,
    mode: Mode,
    declarations: &'a [AttributeDeclaration],
    references: ReferenceResolver<'a, B>,
}

impl<'a, B: RegistryBackend> Synchronizer<'a, B> {
    pub fn new(
        gateway: &'a Gateway<B>,
        config: &'a Config,
        mode: Mode,
        declarations: &'a [AttributeDeclaration],
    ) -> Self {
        Self {
            gateway,
            config,
            mode,
            declarations,
            references: ReferenceResolver::new(gateway, config.create_missing_references),
        }
    }

    fn layout(&self) -> RecordLayout<'a> {
        let config: &'a Config = self.config;
        RecordLayout {
            key_field: &config.key_column_name,
            group_column: &config.level_two_column_name,
            default_group: &config.default_group_label,
        }
    }

    /// Every root object of the configured class that lists category keys
    pub async fn discover_roots(&self) -> Result<Vec<RootScope>> {
        let query = SearchQuery::new()
            .of_class(&self.config.root_class_id)
            .where_attribute_exists(&self.config.config_attribute_id)
            .take(ROOT_SEARCH_TAKE);

        let objects = self
            .gateway
            .search(&query)
            .await
            .context("Failed to search roots")?;

        Ok(objects
            .iter()
            .filter_map(|object| {
                RootScope::from_object(
                    object,
                    &self.config.config_attribute_id,
                    &self.config.object_attribute_id,
                )
            })
            .collect())
    }

    /// Process every category of every root; only root discovery can fail
    pub async fn run(&mut self) -> Result<RunSummary> {
        let roots = self.discover_roots().await?;
        log::info!("Total main roots {}", roots.len());

        let mut summary = RunSummary {
            roots: roots.len(),
            ..Default::default()
        };

        for root in &roots {
            log::info!("Processing main root {}", root.id);
            for mut category in ensure_categories(root) {
                log::info!("Processing level one {}", category.name);
                match self.run_category(&mut category).await {
                    Ok(report) => {
                        log::info!("{}", report);
                        summary.reports.push(report);
                    }
                    Err(e) => {
                        log::error!("Category {} failed: {:#}", category.name, e);
                        summary.failed.push(category.name.clone());
                    }
                }
            }
        }

        log::debug!("Resolved references {}", self.references.cached());
        Ok(summary)
    }

    /// Locate, import and reconcile one category
    pub async fn run_category(&mut self, category: &mut Category) -> Result<CategoryReport> {
        let prefix = self.mode.file_prefix();
        let Some(file) = files::locate(&self.config.files_directory, &category.name, prefix)?
        else {
            log::warn!("File is not found");
            return Ok(CategoryReport::new(&category.name, CategoryOutcome::NoSource));
        };
        log::info!("Source file {}", file.path.display());

        let imported = self
            .import(&file, category)
            .with_context(|| format!("Failed to import {}", file.path.display()))?;

        if imported.is_empty() {
            log::warn!("File is empty");
            files::archive(&file)?;
            return Ok(CategoryReport::new(&category.name, CategoryOutcome::EmptySource));
        }

        let report = self.reconcile_records(category, imported).await?;
        files::archive(&file)?;
        Ok(report)
    }

    fn import(&self, file: &SourceFile, category: &Category) -> Result<Vec<Record>> {
        let rows = read_source_sheet(&file.path, &self.config.source_sheet, self.mode.text_columns())?;
        let context = PrepareContext {
            category: &category.name,
            filtered_categories: &self.config.filtered_categories,
        };
        let rows = self.mode.prepare(rows, &context);
        let normalized = normalize(&rows, self.declarations, &self.layout())?;
        Ok(normalized.records)
    }

    /// Bring the registry in line with `imported` for one category
    pub async fn reconcile_records(
        &mut self,
        category: &mut Category,
        imported: Vec<Record>,
    ) -> Result<CategoryReport> {
        let layout = self.layout();
        let mut report = CategoryReport::new(&category.name, CategoryOutcome::Synced);
        report.imported = imported.len();
        log::info!("Total rows in new input file {}", imported.len());

        let current = self
            .fetch_current(category)
            .await
            .context("Failed to fetch current items")?;
        report.current = current.len();
        log::info!("Total entities in registry at beginning {}", current.len());

        let plan = engine::reconcile(&current, &imported, layout.key_field, &[layout.group_column]);
        report.updates = plan.updates.len();
        if plan.is_empty() {
            log::info!("Registry is up to date");
        } else {
            log::info!("Total entities for update {}", plan.updates.len());
        }

        let deletions = plan.deletions();
        report.planned_deletions = deletions.len();
        log::info!(
            "Total rows for delete {} ({} duplicates, {} cancelled)",
            deletions.len(),
            plan.duplicates.len(),
            plan.cancellations.len()
        );
        for id in &deletions {
            if self.gateway.delete_item(id).await {
                report.deleted += 1;
            }
        }
        if !deletions.is_empty() {
            log::info!("Deleted {}", report.deleted);
        }

        let groups = plan.updates.iter().map(|record| layout.group_of(record));
        ensure_subcategories(
            self.gateway,
            category,
            &self.config.level_two_class_id,
            groups,
        )
        .await
        .context("Failed to resolve folders")?;

        for record in &plan.updates {
            match self.upsert(category, record).await {
                Ok(true) => report.upserted += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    log::warn!("Item is skipped: {:#}", e);
                    report.skipped += 1;
                }
            }
        }

        match self.count_current(category).await {
            Ok(total) => {
                log::info!("Total entities in registry at the end {}", total);
                report.total_after = Some(total);
            }
            Err(e) => log::warn!("Failed to count items: {:#}", e),
        }

        Ok(report)
    }

    /// Items of this category only, when the mode tells categories apart by attribute
    fn category_filter(&self, category: &Category) -> Option<Condition> {
        if !self.mode.scopes_by_category_attribute() {
            return None;
        }
        self.config
            .category_name_attribute()
            .map(|attribute| Condition::attribute_eq(attribute, category.name.as_str()))
    }

    async fn fetch_current(&self, category: &Category) -> Result<Vec<CurrentRecord>> {
        let filter = self.category_filter(category);
        let objects = self
            .gateway
            .search_under(&category.parent_id, &self.config.item_class_id, filter.as_ref())
            .await?;
        Ok(objects.iter().map(|object| self.decode(object)).collect())
    }

    async fn count_current(&self, category: &Category) -> Result<u64> {
        let filter = self.category_filter(category);
        self.gateway
            .count_under(&category.parent_id, &self.config.item_class_id, filter.as_ref())
            .await
    }

    fn decode(&self, object: &RegistryObject) -> CurrentRecord {
        let mut record = Record::new();
        for declaration in self.declarations {
            let value = decode_current(object.attribute(&declaration.attribute_id), declaration);
            record.insert(declaration.destination(), value);
        }
        CurrentRecord::new(object.id.clone(), record)
    }

    /// Find or create the item by key, then overwrite all its attributes
    ///
    /// `Ok(false)` when the item was skipped (folder unresolved, ambiguous
    /// key, rejected create or write).
    async fn upsert(&mut self, category: &Category, record: &Record) -> Result<bool> {
        let layout = self.layout();
        let Some(key) = record.text(layout.key_field) else {
            return Ok(false);
        };

        let group = layout.group_of(record);
        let Some(folder) = category.subcategory(&group) else {
            log::warn!("Item {} is skipped: folder '{}' is not resolved", key, group);
            return Ok(false);
        };

        let name = self
            .mode
            .item_name_column()
            .and_then(|column| record.text(column))
            .unwrap_or_else(|| key.clone());

        let scope = self.category_filter(category);
        let lookup = self
            .gateway
            .find_id_by_key(
                folder,
                &self.config.item_class_id,
                &name,
                &key,
                &self.config.key_attribute_id,
                scope.as_ref(),
            )
            .await?;
        let Some(item_id) = lookup.into_id() else {
            log::warn!("Item {} is skipped", key);
            return Ok(false);
        };

        let payload = self
            .payload(category, record, &key)
            .await
            .with_context(|| format!("Failed to render item {}", key))?;
        Ok(self.gateway.write_attributes(&item_id, payload).await)
    }

    /// Full attribute payload: context first, then every declared attribute
    ///
    /// The key attribute carries `key` exactly as it was looked up.
    async fn payload(
        &mut self,
        category: &Category,
        record: &Record,
        key: &str,
    ) -> Result<Vec<AttributeWrite>> {
        let key_field = self.layout().key_field;
        let mut payload = vec![AttributeWrite::new(
            &self.config.object_attribute_id,
            wire_type::REFERENCE,
            category.context.clone().unwrap_or_default(),
        )];

        if self.mode.scopes_by_category_attribute() {
            if let Some(attribute) = self.config.category_name_attribute() {
                payload.push(AttributeWrite::new(
                    attribute,
                    wire_type::STRING,
                    json!(category.name),
                ));
            }
        }

        let declarations = self.declarations;
        for declaration in declarations {
            let value = match record.get(declaration.destination()) {
                Some(Value::String(_)) if declaration.destination() == key_field => {
                    Value::String(key.to_string())
                }
                Some(value) => value.clone(),
                None => Value::Null,
            };
            let rendered = self.references.render(&value, declaration).await?;
            payload.push(AttributeWrite::new(
                &declaration.attribute_id,
                declaration.wire_type,
                rendered,
            ));
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::InMemoryRegistry;
    use rust_xlsxwriter::Workbook;
    use std::path::Path;

    const KEY_ATTR: &str = "key-attr";
    const QTY_ATTR: &str = "qty-attr";
    const UNIT_ATTR: &str = "unit-attr";
    const CTX_ATTR: &str = "ctx";
    const CFG_ATTR: &str = "cfg";
    const CAT_ATTR: &str = "cat-name";

    fn config(files_directory: &Path) -> Config {
        Config::from_json(
            &json!({
                "url": "https://registry.example/",
                "logs_path": "",
                "attributes_file": "attributes.xlsx",
                "auth_data_file": "auth.txt",
                "files_directory": files_directory,
                "root_class_id": "root-class",
                "config_attribute_id": CFG_ATTR,
                "object_attribute_id": CTX_ATTR,
                "level_two_class_id": "folder",
                "level_two_column_name": "Раздел",
                "item_class_id": "item",
                "key_attribute_id": KEY_ATTR,
                "key_column_name": "Код",
                "level_one_name_attribute_id": CAT_ATTR
            })
            .to_string(),
        )
        .unwrap()
    }

    fn declarations(units_folder: &str) -> Vec<AttributeDeclaration> {
        vec![
            AttributeDeclaration::string("Код", KEY_ATTR),
            AttributeDeclaration::numeric("Количество", QTY_ATTR),
            AttributeDeclaration::reference("Единица", UNIT_ATTR, units_folder, "unit"),
        ]
    }

    fn record(key: &str, qty: f64, group: &str) -> Record {
        Record::new()
            .with("Код", key)
            .with("Количество", qty)
            .with("Единица", "шт")
            .with("Раздел", group)
    }

    struct Fixture {
        gateway: Gateway<InMemoryRegistry>,
        root: String,
        units: String,
    }

    fn fixture() -> Fixture {
        let registry = InMemoryRegistry::new();
        let root = registry.insert("top", "root-class", "Root");
        registry.set_attribute(&root, CFG_ATTR, json!("A"), 2);
        registry.set_attribute(&root, CTX_ATTR, json!({"Id": "site", "Name": "Site"}), 8);
        let units = registry.insert("top", "folder", "Units");
        registry.insert(&units, "unit", "шт");
        Fixture {
            gateway: Gateway::new(registry),
            root,
            units,
        }
    }

    fn item_with_key(gateway: &Gateway<InMemoryRegistry>, key: &str) -> Vec<RegistryObject> {
        gateway
            .backend()
            .objects_of_class("item")
            .into_iter()
            .filter(|o| o.attribute(KEY_ATTR).map(|a| a.value.clone()) == Some(json!(key)))
            .collect()
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);

        let imported = vec![record("K1", 1.0, "КЖ"), record("K2", 2.0, "")];
        let mut category = Category::new("A", f.root.clone(), None);
        let first = sync
            .reconcile_records(&mut category, imported.clone())
            .await
            .unwrap();
        assert_eq!(first.upserted, 2);
        assert_eq!(first.total_after, Some(2));

        let puts = f.gateway.backend().put_count();
        let creates = f.gateway.backend().create_count();
        let searches = f.gateway.backend().search_count();
        let mut category = Category::new("A", f.root.clone(), None);
        let second = sync.reconcile_records(&mut category, imported).await.unwrap();
        assert_eq!(second.updates, 0);
        assert_eq!(second.planned_deletions, 0);
        assert_eq!(f.gateway.backend().put_count(), puts);

        // current items and the closing count only; no folder is looked up
        assert_eq!(f.gateway.backend().create_count(), creates);
        assert_eq!(f.gateway.backend().search_count() - searches, 2);
        assert!(category.subcategories.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_duplicates_cancellations_upserts() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let registry = f.gateway.backend();

        let folder = registry.insert(&f.root, "folder", "Прочее");
        for (key, qty) in [("k1", 1.0), ("k2", 2.0), ("k2", 3.0)] {
            let id = registry.insert(&folder, "item", key);
            registry.set_attribute(&id, KEY_ATTR, json!(key), 2);
            registry.set_attribute(&id, QTY_ATTR, json!(qty), 1);
        }

        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);
        let mut category = Category::new("A", f.root.clone(), None);
        let imported = vec![record("k1", 10.0, ""), record("k3", 3.0, "")];
        let report = sync.reconcile_records(&mut category, imported).await.unwrap();

        assert_eq!(report.planned_deletions, 2);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.updates, 2);
        assert!(item_with_key(&f.gateway, "k2").is_empty());

        let k1 = item_with_key(&f.gateway, "k1");
        assert_eq!(k1.len(), 1);
        assert_eq!(k1[0].attributes[QTY_ATTR].value, json!(10.0));
        assert_eq!(
            k1[0].attributes[UNIT_ATTR].value["Name"],
            json!("шт")
        );
        assert_eq!(item_with_key(&f.gateway, "k3").len(), 1);
    }

    #[tokio::test]
    async fn test_padded_key_keeps_one_item() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);

        for qty in [1.0, 2.0] {
            let mut category = Category::new("A", f.root.clone(), None);
            sync.reconcile_records(&mut category, vec![record(" K1 ", qty, "")])
                .await
                .unwrap();
        }

        let items = f.gateway.backend().objects_of_class("item");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].attributes[KEY_ATTR].value, json!("K1"));
        assert_eq!(items[0].attributes[QTY_ATTR].value, json!(2.0));
    }

    #[tokio::test]
    async fn test_padded_key_in_source_settles() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);

        let mut reports = Vec::new();
        for qty in [1.0, 2.0, 2.0] {
            write_source(&dir.path().join("A_РД.xlsx"), &[(" K1 ", qty)]);
            let mut category = Category::new("A", f.root.clone(), None);
            reports.push(sync.run_category(&mut category).await.unwrap());
        }

        assert_eq!(reports[1].updates, 1);
        assert_eq!(reports[1].planned_deletions, 0);
        assert_eq!(reports[2].updates, 0);
        assert_eq!(reports[2].total_after, Some(1));
        assert_eq!(item_with_key(&f.gateway, "K1").len(), 1);
    }

    #[tokio::test]
    async fn test_categories_sharing_a_key_keep_their_own_items() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Mto, &declarations);

        let mut a = Category::new("A", f.root.clone(), None);
        sync.reconcile_records(&mut a, vec![record("K", 1.0, "")])
            .await
            .unwrap();
        let mut b = Category::new("B", f.root.clone(), None);
        let report = sync
            .reconcile_records(&mut b, vec![record("K", 2.0, "")])
            .await
            .unwrap();
        assert_eq!(report.total_after, Some(1));

        let mut categories: Vec<_> = item_with_key(&f.gateway, "K")
            .iter()
            .map(|item| item.attributes[CAT_ATTR].value.clone())
            .collect();
        categories.sort_by_key(|v| v.to_string());
        assert_eq!(categories, vec![json!("A"), json!("B")]);

        // A still owns its unchanged item
        let mut a = Category::new("A", f.root.clone(), None);
        let again = sync
            .reconcile_records(&mut a, vec![record("K", 1.0, "")])
            .await
            .unwrap();
        assert_eq!(again.current, 1);
        assert_eq!(again.updates, 0);
    }

    #[tokio::test]
    async fn test_category_attribute_scopes_items() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let registry = f.gateway.backend();

        // an item of another category under the same root must survive
        let other = registry.insert(&f.root, "item", "foreign");
        registry.set_attribute(&other, KEY_ATTR, json!("x"), 2);
        registry.set_attribute(&other, CAT_ATTR, json!("B"), 2);

        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Mto, &declarations);
        let mut category = Category::new("A", f.root.clone(), Some(json!({"Id": "site"})));
        let report = sync
            .reconcile_records(&mut category, vec![record("k1", 1.0, "")])
            .await
            .unwrap();

        assert_eq!(report.planned_deletions, 0);
        assert!(registry.object(&other).is_some());
        let created = item_with_key(&f.gateway, "k1");
        assert_eq!(created[0].attributes[CAT_ATTR].value, json!("A"));
        assert_eq!(created[0].attributes[CTX_ATTR].value, json!({"Id": "site"}));
    }

    #[tokio::test]
    async fn test_rejected_writes_are_counted_as_skipped() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);
        let mut category = Category::new("A", f.root.clone(), None);

        f.gateway.backend().reject_operations(true);
        let report = sync
            .reconcile_records(&mut category, vec![record("k1", 1.0, "")])
            .await
            .unwrap();
        assert_eq!(report.upserted, 0);
        assert_eq!(report.skipped, 1);
    }

    fn write_source(path: &Path, rows: &[(&str, f64)]) {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("TDSheet").unwrap();
        for (col, title) in ["Код", "Количество", "Единица", "Обозначение"].iter().enumerate() {
            worksheet.write_string(0, col as u16, *title).unwrap();
        }
        for (i, (key, qty)) in rows.iter().enumerate() {
            let row = (i + 1) as u32;
            worksheet.write_string(row, 0, *key).unwrap();
            worksheet.write_number(row, 1, *qty).unwrap();
            worksheet.write_string(row, 2, "шт").unwrap();
            worksheet.write_string(row, 3, "12-КЖ").unwrap();
        }
        workbook.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_full_run_archives_source() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        write_source(&dir.path().join("A_РД.xlsx"), &[("K1", 1.0), ("K2", 2.0)]);

        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.roots, 1);
        assert!(summary.failed.is_empty());
        assert_eq!(summary.reports[0].outcome, CategoryOutcome::Synced);
        assert_eq!(summary.reports[0].upserted, 2);
        assert!(!dir.path().join("A_РД.xlsx").exists());
        assert!(dir.path().join("prev").join("A_РД_prev.xlsx").exists());

        // items carry the root context
        let item = &item_with_key(&f.gateway, "K1")[0];
        assert_eq!(item.attributes[CTX_ATTR].value["Id"], json!("site"));

        // nothing to read the second time
        let summary = sync.run().await.unwrap();
        assert_eq!(summary.reports[0].outcome, CategoryOutcome::NoSource);
    }

    #[tokio::test]
    async fn test_empty_source_leaves_registry_alone() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);
        let existing = f.gateway.backend().insert(&f.root, "item", "old");
        f.gateway.backend().set_attribute(&existing, KEY_ATTR, json!("old"), 2);
        write_source(&dir.path().join("A_РД.xlsx"), &[]);

        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);
        let mut category = Category::new("A", f.root.clone(), None);
        let report = sync.run_category(&mut category).await.unwrap();

        assert_eq!(report.outcome, CategoryOutcome::EmptySource);
        assert_eq!(f.gateway.backend().delete_count(), 0);
        assert!(dir.path().join("prev").join("A_РД_prev.xlsx").exists());
    }

    #[tokio::test]
    async fn test_bad_number_fails_only_that_category() {
        let f = fixture();
        let registry = f.gateway.backend();
        registry.set_attribute(&f.root, CFG_ATTR, json!("A;B"), 2);
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let declarations = declarations(&f.units);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("TDSheet").unwrap();
        for (col, title) in ["Код", "Количество", "Обозначение"].iter().enumerate() {
            worksheet.write_string(0, col as u16, *title).unwrap();
        }
        worksheet.write_string(1, 0, "K1").unwrap();
        worksheet.write_string(1, 1, "много").unwrap();
        worksheet.write_string(1, 2, "12-КЖ").unwrap();
        workbook.save(dir.path().join("A_РД.xlsx")).unwrap();
        write_source(&dir.path().join("B_РД.xlsx"), &[("K9", 9.0)]);

        let mut sync = Synchronizer::new(&f.gateway, &config, Mode::Appius, &declarations);
        let summary = sync.run().await.unwrap();

        assert_eq!(summary.failed, vec!["A".to_string()]);
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].category, "B");
        assert!(dir.path().join("A_РД.xlsx").exists());
        assert_eq!(
            item_with_key(&f.gateway, "K9")[0].attributes[QTY_ATTR].value,
            json!(9.0)
        );
    }

    #[test]
    fn test_report_display() {
        let mut report = CategoryReport::new("A", CategoryOutcome::Synced);
        report.imported = 3;
        report.deleted = 1;
        report.planned_deletions = 2;
        assert_eq!(
            report.to_string(),
            "A: imported 3, current 0, updates 0, deleted 1/2, upserted 0, skipped 0"
        );
    }
}
