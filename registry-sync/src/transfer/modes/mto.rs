//! Material requests

use once_cell::sync::Lazy;
use regex::Regex;

use super::PrepareContext;
use crate::transfer::excel::SourceRow;

pub const ITEM_NAME_COLUMN: &str = "Номенклатурная позиция";
const SPECIFICATION_COLUMN: &str = "Номер спецификации (РД)";
const MEMO_COLUMN: &str = "Номер и дата служебной записки";

pub(super) const TEXT_COLUMNS: &[&str] = &[
    "Код (НСИ)",
    "Потребность.Номер",
    "Потребность.Этап согласования",
];

/// Categories limited to restoration requests unless configured otherwise
pub const DEFAULT_FILTERED_CATEGORIES: &[&str] =
    &["МВЗ000821", "МВЗ001069", "МВЗ004863", "МВЗ004864"];

/// Matched against lowercased text: "восстановление", "вос-ие" and the like
static RESTORATION: Lazy<Regex> =
    Lazy::new(|| Regex::new("вос.*ие").expect("valid restoration regex"));

pub(super) fn prepare(rows: Vec<SourceRow>, context: &PrepareContext<'_>) -> Vec<SourceRow> {
    let filtered = context
        .filtered_categories
        .iter()
        .any(|category| category == context.category);
    if !filtered {
        return rows;
    }

    rows.into_iter().filter(is_restoration).collect()
}

fn is_restoration(row: &SourceRow) -> bool {
    [SPECIFICATION_COLUMN, MEMO_COLUMN].iter().any(|column| {
        row.text(column)
            .is_some_and(|text| RESTORATION.is_match(&text.to_lowercase()))
    })
}
