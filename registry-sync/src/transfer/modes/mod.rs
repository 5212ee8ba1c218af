//! Run modes
//!
//! A mode fixes which extracts are read (file prefix), how their rows are
//! prepared before normalization, and how items are named and scoped in the
//! registry. The set is closed and chosen once at startup.

mod appius;
mod delivery_order;
mod mto;
mod notification;

use clap::ValueEnum;

use crate::transfer::excel::SourceRow;

pub use mto::DEFAULT_FILTERED_CATEGORIES;

/// Item display name column shared by delivery orders and notifications
pub const NOMENCLATURE_NAME_COLUMN: &str = "Потребность.Номенклатура.Наименование";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Mode {
    /// Design specification extracts
    Appius,
    /// Material requests
    Mto,
    /// Delivery orders
    #[value(alias = "delivery_order")]
    DeliveryOrder,
    /// Arrival notifications
    Notification,
}

/// Per-category inputs to [`Mode::prepare`]
#[derive(Debug, Clone, Copy)]
pub struct PrepareContext<'a> {
    pub category: &'a str,
    /// Categories whose material requests are limited to restoration work
    pub filtered_categories: &'a [String],
}

impl Mode {
    /// Marker a source file name must contain
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Mode::Appius => "РД",
            Mode::Mto => "ЗО",
            Mode::DeliveryOrder => "Д",
            Mode::Notification => "У",
        }
    }

    /// Identifier columns read as text whatever the cell type
    pub fn text_columns(&self) -> &'static [&'static str] {
        match self {
            Mode::Appius => appius::TEXT_COLUMNS,
            Mode::Mto => mto::TEXT_COLUMNS,
            Mode::DeliveryOrder => delivery_order::TEXT_COLUMNS,
            Mode::Notification => notification::TEXT_COLUMNS,
        }
    }

    /// Column holding the display name of new items; `None` names items by their key
    pub fn item_name_column(&self) -> Option<&'static str> {
        match self {
            Mode::Appius => None,
            Mode::Mto => Some(mto::ITEM_NAME_COLUMN),
            Mode::DeliveryOrder | Mode::Notification => Some(NOMENCLATURE_NAME_COLUMN),
        }
    }

    /// Whether items of one category are told apart by a category-name attribute
    /// rather than by their position under the root
    pub fn scopes_by_category_attribute(&self) -> bool {
        matches!(self, Mode::Mto)
    }

    /// Filter, complete and order raw rows before they are normalized
    pub fn prepare(&self, rows: Vec<SourceRow>, context: &PrepareContext<'_>) -> Vec<SourceRow> {
        let before = rows.len();
        let rows = match self {
            Mode::Appius => appius::prepare(rows),
            Mode::Mto => mto::prepare(rows, context),
            Mode::DeliveryOrder => delivery_order::prepare(rows),
            Mode::Notification => notification::prepare(rows),
        };
        if rows.len() != before {
            log::debug!(
                "{} of {} rows kept for {}",
                rows.len(),
                before,
                context.category
            );
        }
        rows
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Appius => "appius",
            Mode::Mto => "mto",
            Mode::DeliveryOrder => "delivery_order",
            Mode::Notification => "notification",
        };
        write!(f, "{}", name)
    }
}

/// Stable sort by the text of `column`; rows without it go last
fn sort_by_text(rows: &mut [SourceRow], column: &str) {
    rows.sort_by(|a, b| match (a.text(column), b.text(column)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
