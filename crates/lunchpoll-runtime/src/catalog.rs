//! The live menu catalog.

use std::sync::{Arc, PoisonError, RwLock};

use lunchpoll_core::MenuCatalog;
use lunchpoll_sheets::{StoreError, TabularStore};
use tracing::info;

/// Shared handle to the current [`MenuCatalog`].
///
/// A refresh builds a new catalog and swaps it in whole; readers holding the
/// previous `Arc` keep a consistent snapshot.
#[derive(Debug)]
pub struct CatalogHandle {
    store: Arc<dyn TabularStore>,
    page: String,
    current: RwLock<Arc<MenuCatalog>>,
}

impl CatalogHandle {
    pub fn new(store: Arc<dyn TabularStore>, page: impl Into<String>) -> Self {
        Self {
            store,
            page: page.into(),
            current: RwLock::new(Arc::new(MenuCatalog::default())),
        }
    }

    pub fn current(&self) -> Arc<MenuCatalog> {
        Arc::clone(&*self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, catalog: MenuCatalog) -> Arc<MenuCatalog> {
        let catalog = Arc::new(catalog);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&catalog);
        catalog
    }

    /// Reloads the catalog from the menu page.
    ///
    /// On failure the previous catalog stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the menu page cannot be read.
    pub async fn refresh(&self) -> Result<Arc<MenuCatalog>, StoreError> {
        let rows = self.store.get_rows(&self.page).await?;
        let catalog = self.replace(MenuCatalog::from_rows(&rows));
        info!(page = %self.page, items = catalog.len(), "Menu refreshed");
        Ok(catalog)
    }
}
