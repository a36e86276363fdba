//! Applies votes and cancellations to dated ledger pages in the store.
//!
//! Every mutation runs the same cycle under the target page's lock:
//! read the rows, compute the new page, clear, write. The store has no
//! transaction, so a failure between clear and write leaves the page in
//! whatever state the last successful call produced; the user is told the
//! vote was not recorded and a retry re-reads the page.

use std::sync::Arc;

use chrono::NaiveDateTime;
use lunchpoll_core::{
    DateKey, LEDGER_HEADER, LedgerPage, OrderingCalendar, PageError, RejectReason, VoteAction,
    VoteOutcome, VotingWindow, cancel_vote, upsert_vote,
};
use lunchpoll_sheets::{StoreError, TabularStore};
use tracing::{debug, error, info, instrument, warn};

use crate::locks::PageLocks;

/// Failure of one ledger read-modify-write cycle.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed ledger page: {0}")]
    Page(#[from] PageError),
}

impl LedgerError {
    fn reason(&self) -> RejectReason {
        match self {
            Self::Store(StoreError::Conflict(_)) => RejectReason::ConcurrentModification,
            Self::Store(_) | Self::Page(_) => RejectReason::StoreUnavailable,
        }
    }
}

/// Records votes on the page chosen by the voting window.
#[derive(Debug)]
pub struct LedgerService {
    store: Arc<dyn TabularStore>,
    window: VotingWindow,
    calendar: OrderingCalendar,
    locks: PageLocks,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn TabularStore>,
        window: VotingWindow,
        calendar: OrderingCalendar,
    ) -> Self {
        Self {
            store,
            window,
            calendar,
            locks: PageLocks::new(),
        }
    }

    /// Records `action` on the page its timestamp resolves to.
    ///
    /// Catalog membership of the item is the caller's concern.
    #[instrument(skip(self, action), fields(user_id = %action.user_id, item_id = %action.item_id))]
    pub async fn cast_vote(&self, action: &VoteAction) -> VoteOutcome {
        let key = match self.window.resolve_target(action.occurred_at, &self.calendar) {
            Ok(key) => key,
            Err(rejected) => {
                debug!(reason = %rejected, "Vote rejected");
                return rejected.into();
            }
        };

        match self.upsert(key, action).await {
            Ok(()) => {
                info!(page = %key, "Vote recorded");
                VoteOutcome::Noted { page: key }
            }
            Err(e) => {
                error!(page = %key, error = %e, "Failed to record vote");
                VoteOutcome::rejected(e.reason())
            }
        }
    }

    /// Removes the user's vote from the page `now` resolves to.
    #[instrument(skip(self))]
    pub async fn cancel_vote(&self, user_id: &str, now: NaiveDateTime) -> VoteOutcome {
        let key = match self.window.resolve_target(now, &self.calendar) {
            Ok(key) => key,
            Err(rejected) => {
                debug!(reason = %rejected, "Cancellation rejected");
                return rejected.into();
            }
        };

        match self.cancel(key, user_id).await {
            Ok(true) => {
                info!(page = %key, "Vote cancelled");
                VoteOutcome::Cancelled { page: key }
            }
            Ok(false) => VoteOutcome::NotFound { page: key },
            Err(e) => {
                error!(page = %key, error = %e, "Failed to cancel vote");
                VoteOutcome::rejected(e.reason())
            }
        }
    }

    /// Reads a page without locking it. Missing pages read as empty.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the store fails or the page is malformed.
    pub async fn read_page(&self, key: DateKey) -> Result<LedgerPage, LedgerError> {
        match self.store.get_rows(&key.page_title()).await {
            Ok(rows) => Ok(LedgerPage::from_sheet_rows(key, &rows)?),
            Err(StoreError::PageNotFound(_)) => Ok(LedgerPage::new(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert(&self, key: DateKey, action: &VoteAction) -> Result<(), LedgerError> {
        let title = key.page_title();
        let _guard = self.locks.acquire(&title).await;

        if !self.store.page_exists(&title).await? {
            let header: Vec<String> = LEDGER_HEADER.iter().map(ToString::to_string).collect();
            self.store.create_page(&title, &header).await?;
            info!(page = %title, "Created ledger page");
        }

        let page = self.read_page(key).await?;
        let page = upsert_vote(page, action);
        self.rewrite(&title, &page).await
    }

    async fn cancel(&self, key: DateKey, user_id: &str) -> Result<bool, LedgerError> {
        let title = key.page_title();
        let _guard = self.locks.acquire(&title).await;

        let page = self.read_page(key).await?;
        let (page, found) = cancel_vote(page, user_id);
        if found {
            self.rewrite(&title, &page).await?;
        }
        Ok(found)
    }

    async fn rewrite(&self, title: &str, page: &LedgerPage) -> Result<(), LedgerError> {
        self.store.clear_rows(title).await?;
        if let Err(e) = self.store.write_rows(title, &page.to_sheet_rows()).await {
            warn!(page = %title, rows = page.len(), "Page cleared but rewrite failed");
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use lunchpoll_core::SheetRow;
    use lunchpoll_sheets::InMemoryTabularStore;

    use super::*;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn action(user: &str, name: &str, item: &str, occurred_at: NaiveDateTime) -> VoteAction {
        VoteAction {
            user_id: user.to_string(),
            display_name: name.to_string(),
            item_id: item.to_string(),
            occurred_at,
        }
    }

    fn row(values: &[&str]) -> SheetRow {
        values.iter().map(ToString::to_string).collect()
    }

    fn header() -> SheetRow {
        row(&LEDGER_HEADER)
    }

    /// Wraps the in-memory store, counting mutations and optionally
    /// suspending inside every call or failing writes.
    #[derive(Debug, Default)]
    struct InstrumentedStore {
        inner: InMemoryTabularStore,
        yield_inside: bool,
        fail_writes_with: Option<fn(&str) -> StoreError>,
        clears: AtomicUsize,
        writes: AtomicUsize,
    }

    impl InstrumentedStore {
        fn wrapping(inner: InMemoryTabularStore) -> Self {
            Self {
                inner,
                ..Self::default()
            }
        }

        fn mutations(&self) -> usize {
            self.clears.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
        }

        async fn pause(&self) {
            if self.yield_inside {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl TabularStore for InstrumentedStore {
        async fn get_rows(&self, page: &str) -> Result<Vec<SheetRow>, StoreError> {
            self.pause().await;
            let rows = self.inner.get_rows(page).await;
            self.pause().await;
            rows
        }

        async fn clear_rows(&self, page: &str) -> Result<(), StoreError> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            self.inner.clear_rows(page).await
        }

        async fn write_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if let Some(fail) = self.fail_writes_with {
                return Err(fail(page));
            }
            self.inner.write_rows(page, rows).await
        }

        async fn append_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError> {
            self.inner.append_rows(page, rows).await
        }

        async fn page_exists(&self, page: &str) -> Result<bool, StoreError> {
            self.pause().await;
            self.inner.page_exists(page).await
        }

        async fn create_page(&self, page: &str, header: &[String]) -> Result<(), StoreError> {
            self.inner.create_page(page, header).await
        }
    }

    fn service(store: &Arc<InMemoryTabularStore>) -> LedgerService {
        LedgerService::new(
            Arc::clone(store) as Arc<dyn TabularStore>,
            VotingWindow::default(),
            OrderingCalendar::default(),
        )
    }

    #[tokio::test]
    async fn test_evening_vote_lands_on_next_page_and_revote_updates_row() {
        let store = Arc::new(InMemoryTabularStore::new());
        let ledger = service(&store);

        // Thursday 15/10/26 evening targets Friday 16/10/26.
        let first = ledger
            .cast_vote(&action("U1", "Alice", "Veg Thali", at(15, 20, 0, 0)))
            .await;
        let page = DateKey::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(first, VoteOutcome::Noted { page });

        let second = ledger
            .cast_vote(&action("U1", "Alice", "Chicken Curry", at(15, 20, 5, 0)))
            .await;
        assert_eq!(second, VoteOutcome::Noted { page });

        assert_eq!(
            store.page("16/10/26").unwrap().unwrap(),
            vec![header(), row(&["U1", "20:05:00", "Alice", "Chicken Curry"])]
        );
    }

    #[tokio::test]
    async fn test_vote_inside_window_is_rejected_without_store_access() {
        let store = Arc::new(InMemoryTabularStore::new());
        let ledger = service(&store);

        let outcome = ledger
            .cast_vote(&action("U1", "Alice", "dal", at(15, 15, 7, 0)))
            .await;

        assert_eq!(outcome, VoteOutcome::rejected(RejectReason::WindowClosed));
        assert!(store.page("15/10/26").unwrap().is_none());
        assert!(store.page("16/10/26").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_morning_vote_targets_today() {
        let store = Arc::new(InMemoryTabularStore::new());
        let ledger = service(&store);

        let outcome = ledger
            .cast_vote(&action("U1", "Alice", "dal", at(15, 8, 59, 59)))
            .await;

        assert_eq!(
            outcome,
            VoteOutcome::Noted {
                page: DateKey::new(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap())
            }
        );
    }

    #[tokio::test]
    async fn test_friday_evening_vote_rolls_to_monday() {
        let store = Arc::new(InMemoryTabularStore::new());
        let ledger = service(&store);

        ledger
            .cast_vote(&action("U1", "Alice", "dal", at(16, 15, 7, 1)))
            .await;

        assert!(store.page("19/10/26").unwrap().is_some());
        assert!(store.page("17/10/26").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_without_row_is_not_found_and_issues_no_write() {
        let existing = vec![header(), row(&["U2", "19:00:00", "Bob", "dal"])];
        let store = Arc::new(InstrumentedStore::wrapping(
            InMemoryTabularStore::with_pages([("16/10/26", existing.clone())]),
        ));
        let ledger = LedgerService::new(
            Arc::clone(&store) as Arc<dyn TabularStore>,
            VotingWindow::default(),
            OrderingCalendar::default(),
        );

        let outcome = ledger.cancel_vote("U1", at(15, 20, 0, 0)).await;

        assert!(matches!(outcome, VoteOutcome::NotFound { .. }));
        assert_eq!(store.mutations(), 0);
        assert_eq!(store.inner.page("16/10/26").unwrap().unwrap(), existing);
    }

    #[tokio::test]
    async fn test_cancel_inside_window_is_rejected() {
        let store = Arc::new(InMemoryTabularStore::with_pages([(
            "15/10/26",
            vec![header(), row(&["U1", "08:00:00", "Alice", "dal"])],
        )]));
        let ledger = service(&store);

        let outcome = ledger.cancel_vote("U1", at(15, 12, 0, 0)).await;

        assert_eq!(outcome, VoteOutcome::rejected(RejectReason::WindowClosed));
        assert_eq!(store.page("15/10/26").unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_targets_currently_resolved_page_only() {
        let store = Arc::new(InMemoryTabularStore::new());
        let ledger = service(&store);
        let friday = DateKey::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        let monday = DateKey::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());

        // Thursday evening vote lands on Friday.
        let voted = ledger
            .cast_vote(&action("U1", "Alice", "dal", at(15, 20, 0, 0)))
            .await;
        assert_eq!(voted, VoteOutcome::Noted { page: friday });

        // Friday after the window resolves to Monday, where nothing was cast.
        let cancelled = ledger.cancel_vote("U1", at(16, 16, 0, 0)).await;

        assert_eq!(cancelled, VoteOutcome::NotFound { page: monday });
        assert_eq!(
            store.page("16/10/26").unwrap().unwrap(),
            vec![header(), row(&["U1", "20:00:00", "Alice", "dal"])]
        );
        assert!(store.page("19/10/26").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_on_absent_page_does_not_create_it() {
        let store = Arc::new(InMemoryTabularStore::new());
        let ledger = service(&store);

        let outcome = ledger.cancel_vote("U1", at(15, 20, 0, 0)).await;

        assert!(matches!(outcome, VoteOutcome::NotFound { .. }));
        assert!(store.page("16/10/26").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_removes_row_and_keeps_others_in_order() {
        let store = Arc::new(InMemoryTabularStore::with_pages([(
            "16/10/26",
            vec![
                header(),
                row(&["U1", "19:00:00", "Alice", "dal"]),
                row(&["U2", "19:01:00", "Bob", "thali"]),
                row(&["U3", "19:02:00", "Cara", "dal"]),
            ],
        )]));
        let ledger = service(&store);

        let first = ledger.cancel_vote("U2", at(15, 20, 0, 0)).await;
        let second = ledger.cancel_vote("U2", at(15, 20, 0, 0)).await;

        assert!(matches!(first, VoteOutcome::Cancelled { .. }));
        assert!(matches!(second, VoteOutcome::NotFound { .. }));
        assert_eq!(
            store.page("16/10/26").unwrap().unwrap(),
            vec![
                header(),
                row(&["U1", "19:00:00", "Alice", "dal"]),
                row(&["U3", "19:02:00", "Cara", "dal"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_votes_on_one_page_are_not_lost() {
        let store = Arc::new(InstrumentedStore {
            yield_inside: true,
            ..InstrumentedStore::default()
        });
        let ledger = Arc::new(LedgerService::new(
            Arc::clone(&store) as Arc<dyn TabularStore>,
            VotingWindow::default(),
            OrderingCalendar::default(),
        ));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    ledger
                        .cast_vote(&action(
                            &format!("U{i}"),
                            &format!("User {i}"),
                            "dal",
                            at(15, 20, 0, i),
                        ))
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(matches!(task.await.unwrap(), VoteOutcome::Noted { .. }));
        }

        let page = ledger
            .read_page(DateKey::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()))
            .await
            .unwrap();
        assert_eq!(page.len(), 20);
        assert_eq!(store.inner.page("16/10/26").unwrap().unwrap().len(), 21);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_as_unavailable() {
        let store = Arc::new(InstrumentedStore {
            fail_writes_with: Some(|_| StoreError::Api {
                status: 503,
                body: "backend down".to_string(),
            }),
            ..InstrumentedStore::default()
        });
        let ledger = LedgerService::new(
            store,
            VotingWindow::default(),
            OrderingCalendar::default(),
        );

        let outcome = ledger
            .cast_vote(&action("U1", "Alice", "dal", at(15, 20, 0, 0)))
            .await;

        assert_eq!(outcome, VoteOutcome::rejected(RejectReason::StoreUnavailable));
    }

    #[tokio::test]
    async fn test_store_conflict_is_reported_as_concurrent_modification() {
        let store = Arc::new(InstrumentedStore {
            fail_writes_with: Some(|page| StoreError::Conflict(page.to_string())),
            ..InstrumentedStore::default()
        });
        let ledger = LedgerService::new(
            store,
            VotingWindow::default(),
            OrderingCalendar::default(),
        );

        let outcome = ledger
            .cast_vote(&action("U1", "Alice", "dal", at(15, 20, 0, 0)))
            .await;

        assert_eq!(
            outcome,
            VoteOutcome::rejected(RejectReason::ConcurrentModification)
        );
    }

    #[tokio::test]
    async fn test_malformed_page_is_reported_as_unavailable() {
        let store = Arc::new(InMemoryTabularStore::with_pages([(
            "16/10/26",
            vec![header(), row(&["U2", "lunchtime", "Bob", "dal"])],
        )]));
        let ledger = service(&store);

        let outcome = ledger
            .cast_vote(&action("U1", "Alice", "dal", at(15, 20, 0, 0)))
            .await;

        assert_eq!(outcome, VoteOutcome::rejected(RejectReason::StoreUnavailable));
        assert_eq!(store.page("16/10/26").unwrap().unwrap().len(), 2);
    }
}
