//! Dated vote ledger pages and the upsert/cancel rules applied to them.
//!
//! A page holds at most one row per user. Updates keep the row in place so a
//! wholesale rewrite of the page produces a minimal diff.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{DateKey, SheetRow};

/// Header row written at the top of every ledger page.
pub const LEDGER_HEADER: [&str; 4] = ["User ID", "Timestamp", "Display Name", "Item Voted"];

const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Formats accepted when reading timestamps back, including the 12-hour
/// forms a spreadsheet may render after a manual edit.
const TIMESTAMP_READ_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

/// A request to record a vote. Never stored as-is; it becomes a [`LedgerRow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAction {
    pub user_id: String,
    pub display_name: String,
    pub item_id: String,
    pub occurred_at: NaiveDateTime,
}

/// One user's vote on a ledger page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub user_id: String,
    pub timestamp: NaiveTime,
    pub display_name: String,
    pub item_id: String,
}

/// Errors raised while decoding a ledger page from spreadsheet rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The timestamp cell could not be parsed as a time of day.
    #[error("row {row}: invalid timestamp {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    /// The row has data but no user ID.
    #[error("row {row}: missing user id")]
    MissingUserId { row: usize },
}

impl LedgerRow {
    /// Builds the row recorded for `action`, truncated to whole seconds.
    pub fn from_action(action: &VoteAction) -> Self {
        let time = action.occurred_at.time();
        Self {
            user_id: action.user_id.clone(),
            timestamp: time.with_nanosecond(0).unwrap_or(time),
            display_name: action.display_name.clone(),
            item_id: action.item_id.clone(),
        }
    }

    /// Encodes the row as spreadsheet cells in header order.
    pub fn to_cells(&self) -> SheetRow {
        vec![
            self.user_id.clone(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.display_name.clone(),
            self.item_id.clone(),
        ]
    }

    /// Decodes a row; `row` is the 1-based sheet row used in error messages.
    ///
    /// Missing trailing cells are treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if the user ID is empty or the timestamp is not a
    /// recognizable time of day.
    pub fn from_cells(row: usize, cells: &[String]) -> Result<Self, PageError> {
        let cell = |i: usize| cells.get(i).map_or("", |c| c.trim());

        let user_id = cell(0);
        if user_id.is_empty() {
            return Err(PageError::MissingUserId { row });
        }

        let raw_time = cell(1);
        let timestamp = TIMESTAMP_READ_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(raw_time, format).ok())
            .ok_or_else(|| PageError::InvalidTimestamp {
                row,
                value: raw_time.to_string(),
            })?;

        Ok(Self {
            user_id: user_id.to_string(),
            timestamp,
            display_name: cell(2).to_string(),
            item_id: cell(3).to_string(),
        })
    }
}

/// The ordered rows of one dated ledger page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPage {
    key: DateKey,
    rows: Vec<LedgerRow>,
}

impl LedgerPage {
    /// An empty page.
    pub fn new(key: DateKey) -> Self {
        Self {
            key,
            rows: Vec::new(),
        }
    }

    /// A page with the given rows, in order.
    pub fn with_rows(key: DateKey, rows: Vec<LedgerRow>) -> Self {
        Self { key, rows }
    }

    pub fn key(&self) -> DateKey {
        self.key
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row recorded for `user_id`, if any.
    pub fn row_for(&self, user_id: &str) -> Option<&LedgerRow> {
        self.rows.iter().find(|row| row.user_id == user_id)
    }

    /// Decodes a page from the raw rows of its sheet.
    ///
    /// A leading header row and blank rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`PageError`] encountered. Rows are never dropped
    /// silently, since the page is rewritten wholesale afterwards.
    pub fn from_sheet_rows(key: DateKey, rows: &[SheetRow]) -> Result<Self, PageError> {
        let mut decoded = Vec::with_capacity(rows.len());
        for (index, cells) in rows.iter().enumerate() {
            if index == 0 && is_header(cells) {
                continue;
            }
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            decoded.push(LedgerRow::from_cells(index + 1, cells)?);
        }
        Ok(Self::with_rows(key, decoded))
    }

    /// Encodes the page as header plus rows, ready for a wholesale write.
    pub fn to_sheet_rows(&self) -> Vec<SheetRow> {
        std::iter::once(header_row())
            .chain(self.rows.iter().map(LedgerRow::to_cells))
            .collect()
    }
}

/// The ledger header as owned cells.
fn header_row() -> SheetRow {
    LEDGER_HEADER.iter().map(ToString::to_string).collect()
}

fn is_header(cells: &[String]) -> bool {
    cells
        .first()
        .is_some_and(|c| c.trim().eq_ignore_ascii_case(LEDGER_HEADER[0]))
}

/// Records `action` on `page`.
///
/// An existing row for the user is updated in place (timestamp, display name
/// and item); otherwise a new row is appended. Catalog membership of the item
/// is not checked here.
#[must_use]
pub fn upsert_vote(mut page: LedgerPage, action: &VoteAction) -> LedgerPage {
    let row = LedgerRow::from_action(action);
    match page.rows.iter_mut().find(|r| r.user_id == action.user_id) {
        Some(existing) => *existing = row,
        None => page.rows.push(row),
    }
    page
}

/// Removes the user's row from `page`.
///
/// Returns the page and whether a row was found. When nothing was found the
/// page is returned untouched.
#[must_use]
pub fn cancel_vote(mut page: LedgerPage, user_id: &str) -> (LedgerPage, bool) {
    let before = page.rows.len();
    page.rows.retain(|r| r.user_id != user_id);
    let found = page.rows.len() != before;
    (page, found)
}
