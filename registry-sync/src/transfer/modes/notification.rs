//! Arrival notifications

use crate::transfer::excel::{Cell, SourceRow};

const REQUEST_NUMBER_COLUMN: &str = "Потребность.Номер";
const PLANNED_ARRIVAL_COLUMN: &str = "Плановая дата прихода на склад";
const SHIPMENT_COLUMN: &str = "Дата отгрузки";

/// Derived key: request number, shipment date, planned arrival date
const REQUEST_DATES_COLUMN: &str = "Потребность-Дата отгрузки-Дата прихода";
/// Derived grouping: one folder per arrival month
const ARRIVAL_FOLDER_COLUMN: &str = "Папка";
const NO_ARRIVAL_DATE: &str = "Дата прихода не указана";

/// Stands in for a missing date inside the derived key
const NO_DATE: &str = "нет";

pub(super) const TEXT_COLUMNS: &[&str] = &[
    "Потребность.Номенклатура.Код",
    REQUEST_NUMBER_COLUMN,
    PLANNED_ARRIVAL_COLUMN,
    SHIPMENT_COLUMN,
];

pub(super) fn prepare(mut rows: Vec<SourceRow>) -> Vec<SourceRow> {
    for row in &mut rows {
        let arrival = row.text(PLANNED_ARRIVAL_COLUMN);

        let key = match row.text(REQUEST_NUMBER_COLUMN) {
            Some(request) => Cell::Text(format!(
                "{}-{}-{}",
                request,
                row.text(SHIPMENT_COLUMN).as_deref().unwrap_or(NO_DATE),
                arrival.as_deref().unwrap_or(NO_DATE)
            )),
            None => Cell::Empty,
        };
        row.set(REQUEST_DATES_COLUMN, key);
        row.set(
            ARRIVAL_FOLDER_COLUMN,
            Cell::Text(arrival_folder(arrival.as_deref())),
        );
    }
    super::sort_by_text(&mut rows, PLANNED_ARRIVAL_COLUMN);
    rows
}

/// `dd.mm.yyyy` -> `Приход yyyy.mm`; any time of day is ignored
fn arrival_folder(arrival: Option<&str>) -> String {
    let Some(date) = arrival.and_then(|a| a.split_whitespace().next()) else {
        return NO_ARRIVAL_DATE.to_string();
    };
    let chars: Vec<char> = date.chars().collect();
    if chars.len() < 7 {
        return NO_ARRIVAL_DATE.to_string();
    }

    let year: String = chars[chars.len() - 4..].iter().collect();
    let month: String = chars[chars.len() - 7..chars.len() - 5].iter().collect();
    format!("Приход {}.{}", year, month)
}
