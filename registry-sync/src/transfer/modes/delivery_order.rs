//! Delivery orders

use crate::transfer::excel::{Cell, SourceRow};

const ORDER_NUMBER_COLUMN: &str = "Документ заказа.Номер";
const REQUEST_NUMBER_COLUMN: &str = "Потребность.Номер";
/// Derived key: order number and request number
const ORDER_REQUEST_COLUMN: &str = "Заказ-Потребность";

pub(super) const TEXT_COLUMNS: &[&str] = &[
    ORDER_NUMBER_COLUMN,
    "Потребность.Номенклатура.Код",
    REQUEST_NUMBER_COLUMN,
];

pub(super) fn prepare(mut rows: Vec<SourceRow>) -> Vec<SourceRow> {
    for row in &mut rows {
        let key = match (row.text(ORDER_NUMBER_COLUMN), row.text(REQUEST_NUMBER_COLUMN)) {
            (Some(order), Some(request)) => Cell::Text(format!("{}-{}", order, request)),
            _ => Cell::Empty,
        };
        row.set(ORDER_REQUEST_COLUMN, key);
    }
    super::sort_by_text(&mut rows, ORDER_NUMBER_COLUMN);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(order: &str, request: Option<&str>) -> SourceRow {
        let row = SourceRow::new().with(ORDER_NUMBER_COLUMN, Cell::Text(order.into()));
        match request {
            Some(r) => row.with(REQUEST_NUMBER_COLUMN, Cell::Text(r.into())),
            None => row,
        }
    }

    #[test]
    fn test_derives_key_and_sorts_by_order() {
        let prepared = prepare(vec![row("З-2", Some("П-9")), row("З-1", Some("П-7"))]);
        assert_eq!(
            prepared[0].text(ORDER_REQUEST_COLUMN).as_deref(),
            Some("З-1-П-7")
        );
        assert_eq!(
            prepared[1].text(ORDER_REQUEST_COLUMN).as_deref(),
            Some("З-2-П-9")
        );
    }

    #[test]
    fn test_missing_part_leaves_key_empty() {
        let prepared = prepare(vec![row("З-1", None)]);
        assert_eq!(prepared[0].text(ORDER_REQUEST_COLUMN), None);
    }
}
