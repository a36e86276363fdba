//! The tabular store contract and an in-memory implementation.
//!
//! A store is a set of named pages, each an ordered list of rows of string
//! cells. There is no transaction primitive: callers rewrite a page by
//! clearing it and writing the full row set back.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use lunchpoll_core::SheetRow;
use thiserror::Error;
use tracing::instrument;

/// Errors returned by [`TabularStore`] implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The named page does not exist.
    #[error("page not found: {0}")]
    PageNotFound(String),

    /// The backend answered with a non-success status.
    #[error("store request failed ({status}): {body}")]
    Api { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The page changed between read and write.
    ///
    /// Only produced by stores that can detect concurrent writers.
    #[error("page {0} was modified concurrently")]
    Conflict(String),

    /// The configured endpoint is not a usable base URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Internal lock poisoned, indicating concurrent access failure.
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Whether repeating the same idempotent request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Async interface to a spreadsheet-like backend.
///
/// Implementations must be thread-safe (`Send + Sync`); the runtime shares a
/// single store across every page lock.
#[async_trait]
pub trait TabularStore: std::fmt::Debug + Send + Sync {
    /// Reads every row of `page`, header included.
    ///
    /// Returns [`StoreError::PageNotFound`] if the page does not exist.
    async fn get_rows(&self, page: &str) -> Result<Vec<SheetRow>, StoreError>;

    /// Removes every row of `page`, header included.
    async fn clear_rows(&self, page: &str) -> Result<(), StoreError>;

    /// Writes `rows` starting at the first row, overwriting what is there.
    async fn write_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError>;

    /// Appends `rows` after the last non-empty row.
    async fn append_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError>;

    async fn page_exists(&self, page: &str) -> Result<bool, StoreError>;

    /// Creates `page` with `header` as its first row.
    ///
    /// Creating a page that already exists is an error for remote stores;
    /// callers check [`Self::page_exists`] first.
    async fn create_page(&self, page: &str, header: &[String]) -> Result<(), StoreError>;
}

/// In-memory implementation of [`TabularStore`].
///
/// Pages live in a `HashMap` behind a `RwLock`. Used by tests and by
/// `serve --dry-run`.
#[derive(Debug, Default)]
pub struct InMemoryTabularStore {
    pages: RwLock<HashMap<String, Vec<SheetRow>>>,
}

impl InMemoryTabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `pages`.
    pub fn with_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<SheetRow>)>,
        S: Into<String>,
    {
        Self {
            pages: RwLock::new(
                pages
                    .into_iter()
                    .map(|(name, rows)| (name.into(), rows))
                    .collect(),
            ),
        }
    }

    /// Snapshot of a page, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if the lock is poisoned.
    pub fn page(&self, page: &str) -> Result<Option<Vec<SheetRow>>, StoreError> {
        let pages = self.pages.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(pages.get(page).cloned())
    }
}

#[async_trait]
impl TabularStore for InMemoryTabularStore {
    #[instrument(skip(self), fields(page = %page))]
    async fn get_rows(&self, page: &str) -> Result<Vec<SheetRow>, StoreError> {
        self.page(page)?
            .ok_or_else(|| StoreError::PageNotFound(page.to_string()))
    }

    #[instrument(skip(self), fields(page = %page))]
    async fn clear_rows(&self, page: &str) -> Result<(), StoreError> {
        let mut pages = self.pages.write().map_err(|_| StoreError::LockPoisoned)?;
        let rows = pages
            .get_mut(page)
            .ok_or_else(|| StoreError::PageNotFound(page.to_string()))?;
        rows.clear();
        Ok(())
    }

    #[instrument(skip(self, rows), fields(page = %page, rows = rows.len()))]
    async fn write_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError> {
        let mut pages = self.pages.write().map_err(|_| StoreError::LockPoisoned)?;
        let existing = pages
            .get_mut(page)
            .ok_or_else(|| StoreError::PageNotFound(page.to_string()))?;
        for (index, row) in rows.iter().enumerate() {
            match existing.get_mut(index) {
                Some(slot) => slot.clone_from(row),
                None => existing.push(row.clone()),
            }
        }
        Ok(())
    }

    #[instrument(skip(self, rows), fields(page = %page, rows = rows.len()))]
    async fn append_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError> {
        let mut pages = self.pages.write().map_err(|_| StoreError::LockPoisoned)?;
        let existing = pages
            .get_mut(page)
            .ok_or_else(|| StoreError::PageNotFound(page.to_string()))?;
        existing.extend(rows.iter().cloned());
        Ok(())
    }

    async fn page_exists(&self, page: &str) -> Result<bool, StoreError> {
        let pages = self.pages.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(pages.contains_key(page))
    }

    #[instrument(skip(self, header), fields(page = %page))]
    async fn create_page(&self, page: &str, header: &[String]) -> Result<(), StoreError> {
        let mut pages = self.pages.write().map_err(|_| StoreError::LockPoisoned)?;
        if pages.contains_key(page) {
            return Err(StoreError::Api {
                status: 400,
                body: format!("A sheet with the name \"{page}\" already exists."),
            });
        }
        pages.insert(page.to_string(), vec![header.to_vec()]);
        Ok(())
    }
}
