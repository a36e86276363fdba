//! Menu items offered in the poll.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::SheetRow;

/// Expected header of the menu page. The first row is always skipped.
pub const MENU_HEADER: [&str; 2] = ["Item ID", "Item"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
}

/// The ordered set of items currently on offer.
///
/// Rebuilt wholesale on every refresh; item IDs are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuCatalog {
    items: Vec<MenuItem>,
}

impl MenuCatalog {
    /// Builds a catalog, keeping the first item for any repeated ID.
    pub fn new(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let mut unique: Vec<MenuItem> = Vec::new();
        for item in items {
            if unique.iter().any(|existing| existing.id == item.id) {
                warn!(item_id = %item.id, "Duplicate menu item ignored");
                continue;
            }
            unique.push(item);
        }
        Self { items: unique }
    }

    /// Builds a catalog from the menu page: header first, then
    /// `item id | label` rows. Rows missing either cell are skipped.
    pub fn from_rows(rows: &[SheetRow]) -> Self {
        let items = rows.iter().skip(1).filter_map(|row| {
            let id = row.first().map_or("", |c| c.trim());
            let label = row.get(1).map_or("", |c| c.trim());
            if id.is_empty() || label.is_empty() {
                return None;
            }
            Some(MenuItem {
                id: id.to_string(),
                label: label.to_string(),
            })
        });
        Self::new(items)
    }

    pub fn get(&self, id: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
