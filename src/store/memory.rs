//! In-process store.

use super::{ChecklistItem, Ledger, PushAdvance, PushSnapshot, PushStore, StoreResult};
use crate::error::StoreError;
use crate::push::{Push, PushEdit, PushStatus};
use crate::request::{PushId, Request, RequestFields, RequestId, RequestState};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Store holding its ledger in memory.
///
/// Writes can be made to fail on demand to exercise failure handling.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    ledger: Mutex<Ledger>,
    fail_writes: AtomicBool,
    fail_notifications: AtomicBool,
    writes: AtomicUsize,
    write_budget: std::sync::Mutex<Option<usize>>,
}

impl InMemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing ledger
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            ..Self::default()
        }
    }

    /// Make every following write fail as unavailable
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let the next `writes` writes through, then fail every write after them
    pub fn fail_writes_after(&self, writes: usize) {
        *self.budget() = Some(writes);
    }

    /// Make notification delivery fail
    pub fn set_fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    /// Write calls received, including failed ones
    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the current ledger
    pub async fn snapshot(&self) -> Ledger {
        self.ledger.lock().await.clone()
    }

    fn budget(&self) -> std::sync::MutexGuard<'_, Option<usize>> {
        self.write_budget
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_write(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let exhausted = match self.budget().as_mut() {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        };
        if exhausted || self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }
}

impl PushStore for InMemoryStore {
    async fn create_or_update_request(&self, fields: RequestFields, user: &str) -> StoreResult<Request> {
        self.begin_write()?;
        self.ledger.lock().await.create_or_update_request(fields, user)
    }

    async fn fetch_request(&self, id: RequestId) -> StoreResult<Request> {
        self.ledger.lock().await.fetch_request(id)
    }

    async fn transition_request(
        &self,
        push: PushId,
        id: RequestId,
        expected: RequestState,
        target: RequestState,
    ) -> StoreResult<Request> {
        self.begin_write()?;
        self.ledger.lock().await.transition_request(push, id, expected, target)
    }

    async fn advance_push(
        &self,
        push: PushId,
        from: RequestState,
        to: RequestState,
        status: PushStatus,
    ) -> StoreResult<PushAdvance> {
        self.begin_write()?;
        self.ledger.lock().await.advance_push(push, from, to, status)
    }

    async fn transition_push(&self, push: PushId, status: PushStatus) -> StoreResult<Push> {
        self.begin_write()?;
        self.ledger.lock().await.transition_push(push, status)
    }

    async fn create_push(&self, title: &str, branch: &str, pushmaster: &str) -> StoreResult<Push> {
        self.begin_write()?;
        self.ledger.lock().await.create_push(title, branch, pushmaster)
    }

    async fn fetch_push(&self, push: PushId) -> StoreResult<PushSnapshot> {
        self.ledger.lock().await.fetch_push(push)
    }

    async fn list_pushes(&self) -> StoreResult<Vec<Push>> {
        Ok(self.ledger.lock().await.list_pushes())
    }

    async fn edit_push(&self, push: PushId, edit: PushEdit) -> StoreResult<Push> {
        self.begin_write()?;
        self.ledger.lock().await.edit_push(push, edit)
    }

    async fn fetch_push_checklist(
        &self,
        push: PushId,
        is_pushmaster: bool,
    ) -> StoreResult<Vec<ChecklistItem>> {
        self.ledger.lock().await.fetch_push_checklist(push, is_pushmaster)
    }

    async fn toggle_checklist_item(&self, item: u64, complete: bool) -> StoreResult<ChecklistItem> {
        self.begin_write()?;
        self.ledger.lock().await.toggle_checklist_item(item, complete)
    }

    async fn comment_request(&self, id: RequestId, author: &str, text: &str) -> StoreResult<Request> {
        self.begin_write()?;
        self.ledger.lock().await.comment_request(id, author, text)
    }

    async fn notify_users(&self, people: &[String], message: &str) -> StoreResult<()> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "notification service down".to_string(),
            });
        }
        self.ledger.lock().await.notify_users(people, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_write_changes_nothing() {
        let store = InMemoryStore::new();
        let push = store.create_push("p", "deploy", "pm").await.unwrap();
        store.set_fail_writes(true);
        assert!(store.create_push("q", "deploy-2", "pm").await.is_err());
        store.set_fail_writes(false);

        assert_eq!(store.list_pushes().await.unwrap(), vec![push]);
        assert_eq!(store.write_calls(), 2);
    }

    #[tokio::test]
    async fn test_write_budget_runs_out() {
        let store = InMemoryStore::new();
        store.fail_writes_after(1);
        assert!(store.create_push("p", "deploy", "pm").await.is_ok());
        assert!(store.create_push("q", "deploy-2", "pm").await.is_err());
        assert_eq!(store.list_pushes().await.unwrap().len(), 1);
    }
}
