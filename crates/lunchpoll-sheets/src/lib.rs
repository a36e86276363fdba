//! Tabular store adapters for lunchpoll.
//!
//! The runtime talks to storage only through [`TabularStore`]. Two
//! implementations are provided:
//!
//! - [`GoogleSheetsStore`]: one spreadsheet, one sheet per page
//! - [`InMemoryTabularStore`]: process-local pages for tests and dry runs

mod google;
mod store;
mod types;

pub use google::{DEFAULT_SHEETS_ENDPOINT, GoogleSheetsStore};
pub use store::{InMemoryTabularStore, StoreError, TabularStore};
