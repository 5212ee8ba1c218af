//! Design specification extracts

use crate::transfer::excel::{Cell, SourceRow};

const POSITION_COLUMN: &str = "№ поз. по ГП";
const REVISION_COLUMN: &str = "Изм.";
const DESIGNATION_COLUMN: &str = "Обозначение";

pub(super) const TEXT_COLUMNS: &[&str] = &[POSITION_COLUMN, REVISION_COLUMN];

/// Estimate sheets are listed in the extract but are not specification items
const ESTIMATE_MARKER: &str = "ЛСР";
const INITIAL_REVISION: &str = "0";

pub(super) fn prepare(rows: Vec<SourceRow>) -> Vec<SourceRow> {
    rows.into_iter()
        .filter(|row| {
            row.text(DESIGNATION_COLUMN)
                .is_some_and(|designation| !designation.contains(ESTIMATE_MARKER))
        })
        .map(|mut row| {
            if row.get(REVISION_COLUMN).is_blank() {
                row.set(REVISION_COLUMN, Cell::Text(INITIAL_REVISION.to_string()));
            }
            row
        })
        .collect()
}
