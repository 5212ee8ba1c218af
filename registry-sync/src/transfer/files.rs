//! Source file discovery, archiving and pre-run renames

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

/// Archive folder inside the files directory
pub const ARCHIVE_DIR: &str = "prev";

/// Office lock files carry this marker
const LOCK_MARKER: char = '~';

/// The newest extract for one category, and where it goes once consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub archive_path: PathBuf,
}

/// Newest file in `directory` whose name contains both `category` and `prefix`
pub fn locate(directory: &Path, category: &str, prefix: &str) -> Result<Option<SourceFile>> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("Failed to list files in {}", directory.display()))?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.contains(category) || !name.contains(prefix) || name.contains(LOCK_MARKER) {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let created = metadata.created().or_else(|_| metadata.modified())?;
        if newest.as_ref().is_none_or(|(time, _)| created > *time) {
            newest = Some((created, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| SourceFile {
        path,
        archive_path: directory
            .join(ARCHIVE_DIR)
            .join(format!("{}_{}_prev.xlsx", category, prefix)),
    }))
}

/// Move the consumed file over its previous archived copy
pub fn archive(file: &SourceFile) -> Result<()> {
    if let Some(parent) = file.archive_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if file.archive_path.exists() {
        fs::remove_file(&file.archive_path)
            .with_context(|| format!("Failed to replace {}", file.archive_path.display()))?;
    }
    fs::rename(&file.path, &file.archive_path).with_context(|| {
        format!(
            "Failed to move {} to {}",
            file.path.display(),
            file.archive_path.display()
        )
    })?;
    log::info!("File is moved to {}", file.archive_path.display());
    Ok(())
}

/// Rename files in `directory` per `renames` (old name -> new name)
pub fn apply_renames(directory: &Path, renames: &BTreeMap<String, String>) -> Result<usize> {
    let mut renamed = 0;
    for (from, to) in renames {
        let source = directory.join(from);
        if !source.is_file() {
            continue;
        }
        let target = directory.join(to);
        fs::rename(&source, &target).with_context(|| {
            format!("Failed to rename {} to {}", source.display(), target.display())
        })?;
        log::info!("Renamed {} to {}", from, to);
        renamed += 1;
    }
    Ok(renamed)
}
