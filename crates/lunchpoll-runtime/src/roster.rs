//! Mirrors community membership into the roster page.

use std::sync::Arc;

use lunchpoll_core::{Member, ROSTER_HEADER, Roster};
use lunchpoll_sheets::{StoreError, TabularStore};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct RosterService {
    store: Arc<dyn TabularStore>,
    page: String,
    lock: Mutex<()>,
}

impl RosterService {
    pub fn new(store: Arc<dyn TabularStore>, page: impl Into<String>) -> Self {
        Self {
            store,
            page: page.into(),
            lock: Mutex::new(()),
        }
    }

    /// Rewrites the roster from a full member listing.
    ///
    /// Returns the number of members written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any store call fails.
    #[instrument(skip_all, fields(page = %self.page))]
    pub async fn sync(&self, members: Vec<Member>) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;
        let roster = Roster::from_members(members);

        self.ensure_page().await?;
        self.store.clear_rows(&self.page).await?;
        self.store.write_rows(&self.page, &roster.to_rows()).await?;

        info!(members = roster.len(), "Roster synchronized");
        Ok(roster.len())
    }

    /// Appends `member` unless it is a bot or already listed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any store call fails.
    #[instrument(skip_all, fields(page = %self.page, user_id = %member.user_id))]
    pub async fn add(&self, member: Member) -> Result<bool, StoreError> {
        if member.bot {
            return Ok(false);
        }
        let _guard = self.lock.lock().await;

        self.ensure_page().await?;
        let roster = Roster::from_rows(&self.store.get_rows(&self.page).await?);
        if roster.contains(&member.user_id) {
            debug!("Member already listed");
            return Ok(false);
        }

        self.store
            .append_rows(&self.page, &[Roster::row_for(&member)])
            .await?;
        info!("Member added to roster");
        Ok(true)
    }

    /// Removes the member's row. No write is issued if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any store call fails.
    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn remove(&self, user_id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;

        let rows = match self.store.get_rows(&self.page).await {
            Ok(rows) => rows,
            Err(StoreError::PageNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let mut roster = Roster::from_rows(&rows);
        if !roster.remove(user_id) {
            debug!("Member not listed");
            return Ok(false);
        }

        self.store.clear_rows(&self.page).await?;
        self.store.write_rows(&self.page, &roster.to_rows()).await?;
        info!("Member removed from roster");
        Ok(true)
    }

    async fn ensure_page(&self) -> Result<(), StoreError> {
        if !self.store.page_exists(&self.page).await? {
            let header: Vec<String> = ROSTER_HEADER.iter().map(ToString::to_string).collect();
            self.store.create_page(&self.page, &header).await?;
        }
        Ok(())
    }
}
