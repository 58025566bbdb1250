//! Periodic checklist refresh for an open push view.
//!
//! The poller only reads. It runs on its own task, can interleave freely
//! with operator actions, and stops when cancelled.

use crate::request::PushId;
use crate::store::{ChecklistItem, PushStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Latest checklist read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistStatus {
    /// Items from the last successful read
    pub items: Vec<ChecklistItem>,
    /// Error from the last read, cleared on success
    pub last_error: Option<String>,
    /// Time of the last successful read
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ChecklistStatus {
    /// Items still open
    pub fn pending(&self) -> usize {
        self.items.iter().filter(|i| !i.complete).count()
    }
}

/// Background task refreshing one push's checklist
#[derive(Debug)]
pub struct ChecklistPoller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    status: watch::Receiver<ChecklistStatus>,
}

impl ChecklistPoller {
    /// Start polling; the first read happens immediately
    pub fn start<S>(store: Arc<S>, push: PushId, is_pushmaster: bool, interval: Duration) -> Self
    where
        S: PushStore + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(ChecklistStatus::default());
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match store.fetch_push_checklist(push, is_pushmaster).await {
                    Ok(items) => {
                        log::debug!("Checklist for push {}: {} item(s)", push, items.len());
                        tx.send_replace(ChecklistStatus {
                            items,
                            last_error: None,
                            refreshed_at: Some(Utc::now()),
                        });
                    }
                    Err(e) => {
                        log::warn!("Checklist refresh for push {} failed: {}", push, e);
                        tx.send_modify(|status| status.last_error = Some(e.to_string()));
                    }
                }
            }
            log::debug!("Checklist poller for push {} stopped", push);
        });

        Self {
            cancel,
            handle: Some(handle),
            status: rx,
        }
    }

    /// Receiver following every refresh
    pub fn subscribe(&self) -> watch::Receiver<ChecklistStatus> {
        self.status.clone()
    }

    /// Most recent status
    pub fn latest(&self) -> ChecklistStatus {
        self.status.borrow().clone()
    }

    /// Cancel and wait for the task to finish
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            log::warn!("Checklist poller ended abnormally: {}", e);
        }
    }
}

impl Drop for ChecklistPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestForm, RequestState};
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_poller_refreshes_until_stopped() {
        let store = Arc::new(InMemoryStore::new());
        let push = store.create_push("p", "deploy", "pm").await.unwrap().id;
        let fields = RequestForm {
            title: "hoods change".to_string(),
            branch: "hoods".to_string(),
            repo: "main".to_string(),
            tags: "hoods".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let request = store.create_or_update_request(fields, "alice").await.unwrap();

        let poller = ChecklistPoller::start(store.clone(), push, true, Duration::from_millis(20));
        let mut updates = poller.subscribe();
        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().items.is_empty());

        store
            .transition_request(push, request.id, RequestState::Requested, RequestState::Added)
            .await
            .unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                updates.changed().await.unwrap();
                let status = updates.borrow_and_update().clone();
                if !status.items.is_empty() {
                    break status;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(status.items.len(), 4);
        assert_eq!(status.pending(), 4);
        assert!(status.refreshed_at.is_some());

        poller.stop().await;
    }
}
