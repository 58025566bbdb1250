//! Backing store for pushes and requests.
//!
//! The store is the only place state is recorded. Every write expresses an
//! intent (a target state) rather than a delta, so re-issuing a call after a
//! timeout is a no-op once it has been applied.

mod checklist;
mod file;
mod ledger;
mod memory;

pub use checklist::{ChecklistItem, required_items};
pub use file::FileStore;
pub use ledger::{Ledger, Notification, RemovalRecord};
pub use memory::InMemoryStore;

use crate::error::StoreError;
use crate::push::{Push, PushEdit, PushStatus};
use crate::request::{PushId, Request, RequestFields, RequestId, RequestState};
use serde::Serialize;
use std::future::Future;

/// Result of a store call
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A push together with the requests its view shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushSnapshot {
    /// The push
    pub push: Push,
    /// Members of the push plus unattached candidates
    pub requests: Vec<Request>,
}

/// Outcome of a push-level section move
#[derive(Debug, Clone, PartialEq)]
pub struct PushAdvance {
    /// Requests moved, in id order
    pub moved: Vec<RequestId>,
    /// The push after the move
    pub push: Push,
}

/// Store operations the push workflow depends on
pub trait PushStore {
    /// Create a request, or update the one named by `fields.id`
    fn create_or_update_request(
        &self,
        fields: RequestFields,
        user: &str,
    ) -> impl Future<Output = StoreResult<Request>> + Send;

    /// Fetch one request
    fn fetch_request(&self, id: RequestId) -> impl Future<Output = StoreResult<Request>> + Send;

    /// Move one request within `push` from `expected` to `target`
    fn transition_request(
        &self,
        push: PushId,
        id: RequestId,
        expected: RequestState,
        target: RequestState,
    ) -> impl Future<Output = StoreResult<Request>> + Send;

    /// Move every member of `push` in `from` to `to` and set its status, as
    /// one write
    fn advance_push(
        &self,
        push: PushId,
        from: RequestState,
        to: RequestState,
        status: PushStatus,
    ) -> impl Future<Output = StoreResult<PushAdvance>> + Send;

    /// Advance the push's aggregate status
    fn transition_push(
        &self,
        push: PushId,
        status: PushStatus,
    ) -> impl Future<Output = StoreResult<Push>> + Send;

    /// Create an open push
    fn create_push(
        &self,
        title: &str,
        branch: &str,
        pushmaster: &str,
    ) -> impl Future<Output = StoreResult<Push>> + Send;

    /// Fetch a push and the requests shown with it
    fn fetch_push(&self, push: PushId) -> impl Future<Output = StoreResult<PushSnapshot>> + Send;

    /// All pushes, newest first
    fn list_pushes(&self) -> impl Future<Output = StoreResult<Vec<Push>>> + Send;

    /// Change title, branch or stage environment
    fn edit_push(
        &self,
        push: PushId,
        edit: PushEdit,
    ) -> impl Future<Output = StoreResult<Push>> + Send;

    /// Checklist items for the requests in `push`
    fn fetch_push_checklist(
        &self,
        push: PushId,
        is_pushmaster: bool,
    ) -> impl Future<Output = StoreResult<Vec<ChecklistItem>>> + Send;

    /// Mark a checklist item complete or not
    fn toggle_checklist_item(
        &self,
        item: u64,
        complete: bool,
    ) -> impl Future<Output = StoreResult<ChecklistItem>> + Send;

    /// Append to a request's comment log
    fn comment_request(
        &self,
        id: RequestId,
        author: &str,
        text: &str,
    ) -> impl Future<Output = StoreResult<Request>> + Send;

    /// Deliver a message to users
    fn notify_users(
        &self,
        people: &[String],
        message: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}
