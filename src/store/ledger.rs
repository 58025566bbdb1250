//! Serializable record of pushes and requests with all write rules.
//!
//! Both store implementations delegate here; they only differ in where the
//! ledger lives between calls.

use super::{ChecklistItem, PushAdvance, PushSnapshot, StoreResult, required_items};
use crate::error::StoreError;
use crate::push::{Push, PushEdit, PushStatus};
use crate::request::{
    PushId, Request, RequestFields, RequestId, RequestState, RequestTransition, TagSet,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entry written whenever a member is removed from a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRecord {
    /// Removed request
    pub request: RequestId,
    /// Push it was removed from
    pub push: PushId,
    /// e.g. `removal after staged`
    pub reason: String,
    /// Pushmaster of the push
    pub pushmaster: String,
    /// When it happened
    pub removed_at: DateTime<Utc>,
}

/// A delivered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipients
    pub recipients: Vec<String>,
    /// Message text
    pub message: String,
    /// Delivery time
    pub sent_at: DateTime<Utc>,
}

/// Full store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    last_request_id: RequestId,
    #[serde(default)]
    last_push_id: PushId,
    #[serde(default)]
    last_checklist_id: u64,
    #[serde(default)]
    requests: BTreeMap<RequestId, Request>,
    #[serde(default)]
    pushes: BTreeMap<PushId, Push>,
    #[serde(default)]
    checklist: BTreeMap<u64, ChecklistItem>,
    #[serde(default)]
    removals: Vec<RemovalRecord>,
    #[serde(default)]
    outbox: Vec<Notification>,
}

fn rejected(reason: impl Into<String>) -> StoreError {
    StoreError::Rejected {
        reason: reason.into(),
    }
}

impl Ledger {
    /// Removal log, oldest first
    pub fn removals(&self) -> &[RemovalRecord] {
        &self.removals
    }

    /// Delivered notifications, oldest first
    pub fn outbox(&self) -> &[Notification] {
        &self.outbox
    }

    /// All requests
    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.requests.values()
    }

    fn push(&self, id: PushId) -> StoreResult<&Push> {
        self.pushes
            .get(&id)
            .ok_or(StoreError::NotFound { entity: "push", id })
    }

    fn request_mut(&mut self, id: RequestId) -> StoreResult<&mut Request> {
        self.requests
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "request", id })
    }

    fn members(&self, push: PushId) -> impl Iterator<Item = &Request> {
        self.requests.values().filter(move |r| r.push == Some(push))
    }

    /// Create a request, or update an existing one
    pub fn create_or_update_request(
        &mut self,
        fields: RequestFields,
        user: &str,
    ) -> StoreResult<Request> {
        if fields.tags.is_l10n_only() && !fields.branch.trim().is_empty() {
            return Err(rejected("requests tagged l10n-only cannot have a branch"));
        }

        let tags = fields.tags.clone();
        let id = match fields.id {
            Some(id) => {
                let request = self.request_mut(id)?;
                fields.apply_to(request, user);
                id
            }
            None => {
                self.last_request_id += 1;
                let id = self.last_request_id;
                self.requests.insert(id, fields.into_request(id, user));
                id
            }
        };
        self.sync_checklist(id, &tags);
        self.fetch_request(id)
    }

    fn sync_checklist(&mut self, request: RequestId, tags: &TagSet) {
        let required = required_items(tags);
        self.checklist.retain(|_, item| {
            item.request != request
                || required
                    .iter()
                    .any(|(kind, target)| *kind == item.kind && *target == item.target)
        });
        for (kind, target) in required {
            let exists = self.checklist.values().any(|item| {
                item.request == request && item.kind == kind && item.target == target
            });
            if !exists {
                self.last_checklist_id += 1;
                let id = self.last_checklist_id;
                self.checklist.insert(
                    id,
                    ChecklistItem {
                        id,
                        request,
                        kind,
                        target: target.to_string(),
                        complete: false,
                    },
                );
            }
        }
    }

    /// Fetch one request
    pub fn fetch_request(&self, id: RequestId) -> StoreResult<Request> {
        self.requests
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "request", id })
    }

    /// Move one request from `expected` to `target`.
    ///
    /// A request already in `target` for this push is left alone; one found
    /// anywhere else, including `target` of another push, is reported as stale.
    pub fn transition_request(
        &mut self,
        push_id: PushId,
        id: RequestId,
        expected: RequestState,
        target: RequestState,
    ) -> StoreResult<Request> {
        let push = self.push(push_id)?;
        let (status, pushmaster) = (push.status, push.pushmaster.clone());
        let request = self.fetch_request(id)?;
        let owner = target.is_push_member().then_some(push_id);
        if request.state == target && request.push == owner {
            return Ok(request);
        }
        if request.state != expected || request.state == target {
            return Err(StoreError::Stale {
                request: id,
                expected,
                actual: request.state,
            });
        }

        let from = request.state;
        let transition = RequestTransition::between(from, target).ok_or_else(|| {
            rejected(format!("request {} cannot move from {} to {}", id, from, target))
        })?;
        if transition.is_bulk() {
            return Err(rejected(format!(
                "{} only happens through its push-level action",
                transition
            )));
        }

        let foreign = request.push.is_some_and(|other| other != push_id);
        match transition {
            RequestTransition::Pickme | RequestTransition::Add => {
                if !status.accepts_requests() {
                    return Err(rejected(format!(
                        "push {} is {} and does not accept requests",
                        push_id, status
                    )));
                }
                if foreign {
                    return Err(rejected(format!(
                        "request {} belongs to another push",
                        id
                    )));
                }
            }
            RequestTransition::Unpickme | RequestTransition::Remove | RequestTransition::Verify => {
                if request.push != Some(push_id) {
                    return Err(rejected(format!("request {} is not in push {}", id, push_id)));
                }
            }
            RequestTransition::Delay | RequestTransition::Discard if foreign => {
                return Err(rejected(format!(
                    "request {} belongs to another push",
                    id
                )));
            }
            _ => {}
        }

        let now = Utc::now();
        let request = self.request_mut(id)?;
        request.state = target;
        request.push = target.is_push_member().then_some(push_id);
        request.modified_at = now;
        let updated = request.clone();

        if transition == RequestTransition::Remove {
            self.removals.push(RemovalRecord {
                request: id,
                push: push_id,
                reason: format!("removal after {}", from),
                pushmaster,
                removed_at: now,
            });
        }
        Ok(updated)
    }

    /// Move every member of a push from one section to the next and leave
    /// the push in `status`.
    ///
    /// Both parts apply together or not at all.
    pub fn advance_push(
        &mut self,
        push_id: PushId,
        from: RequestState,
        to: RequestState,
        status: PushStatus,
    ) -> StoreResult<PushAdvance> {
        let mut next = self.clone();
        let moved = next.move_members(push_id, from, to)?;
        let push = next.transition_push(push_id, status)?;
        *self = next;
        Ok(PushAdvance { moved, push })
    }

    fn move_members(
        &mut self,
        push_id: PushId,
        from: RequestState,
        to: RequestState,
    ) -> StoreResult<Vec<RequestId>> {
        let status = self.push(push_id)?.status;
        match RequestTransition::between(from, to) {
            Some(transition) if transition.is_bulk() => {}
            _ => {
                return Err(rejected(format!(
                    "{} to {} is not a push-level move",
                    from, to
                )));
            }
        }
        if !status.accepts_requests() {
            return Err(rejected(format!("push {} is {}", push_id, status)));
        }

        let ids: Vec<RequestId> = self
            .members(push_id)
            .filter(|r| r.state == from)
            .map(|r| r.id)
            .collect();
        let now = Utc::now();
        for id in &ids {
            let request = self.request_mut(*id)?;
            request.state = to;
            request.modified_at = now;
        }
        Ok(ids)
    }

    /// Advance a push's status
    pub fn transition_push(&mut self, push_id: PushId, status: PushStatus) -> StoreResult<Push> {
        let current = self.push(push_id)?.status;
        if current == status {
            return self.push(push_id).cloned();
        }
        if !current.can_become(status) {
            return Err(rejected(format!(
                "push {} cannot go from {} to {}",
                push_id, current, status
            )));
        }

        match status {
            PushStatus::Live => {
                let undeployed = self
                    .members(push_id)
                    .filter(|r| {
                        matches!(
                            r.state,
                            RequestState::Added | RequestState::Staged | RequestState::Verified
                        )
                    })
                    .count();
                if undeployed > 0 {
                    return Err(rejected(format!(
                        "{} request(s) in push {} have not been deployed",
                        undeployed, push_id
                    )));
                }
            }
            PushStatus::Discarded => {
                let now = Utc::now();
                for request in self.requests.values_mut() {
                    if request.push == Some(push_id) {
                        request.state = RequestState::Requested;
                        request.push = None;
                        request.modified_at = now;
                    }
                }
            }
            _ => {}
        }

        let push = self
            .pushes
            .get_mut(&push_id)
            .ok_or(StoreError::NotFound { entity: "push", id: push_id })?;
        push.status = status;
        push.modified_at = Utc::now();
        Ok(push.clone())
    }

    /// Create an open push
    pub fn create_push(&mut self, title: &str, branch: &str, pushmaster: &str) -> StoreResult<Push> {
        let (title, branch) = (title.trim(), branch.trim());
        if title.is_empty() || branch.is_empty() {
            return Err(rejected("a push needs a title and a branch"));
        }
        self.last_push_id += 1;
        let push = Push::new(self.last_push_id, title, branch, pushmaster);
        self.pushes.insert(push.id, push.clone());
        Ok(push)
    }

    /// A push with its members and the unattached candidates
    pub fn fetch_push(&self, push_id: PushId) -> StoreResult<PushSnapshot> {
        let push = self.push(push_id)?.clone();
        let requests = self
            .requests
            .values()
            .filter(|r| match r.push {
                Some(id) => id == push_id,
                None => matches!(r.state, RequestState::Requested | RequestState::Delayed),
            })
            .cloned()
            .collect();
        Ok(PushSnapshot { push, requests })
    }

    /// All pushes, newest first
    pub fn list_pushes(&self) -> Vec<Push> {
        self.pushes.values().rev().cloned().collect()
    }

    /// Apply an edit under the stage environment rule
    pub fn edit_push(&mut self, push_id: PushId, edit: PushEdit) -> StoreResult<Push> {
        let push = self.push(push_id)?;
        if !push.status.accepts_requests() {
            return Err(rejected(format!("push {} is {}", push_id, push.status)));
        }
        if edit.title.as_deref().is_some_and(|t| t.trim().is_empty())
            || edit.branch.as_deref().is_some_and(|b| b.trim().is_empty())
        {
            return Err(rejected("title and branch cannot be empty"));
        }
        if let Some(env) = edit.stage_env.as_deref() {
            let env = env.trim();
            if env.is_empty() {
                return Err(rejected("stage environment cannot be empty"));
            }
            if env != push.stage_env && self.members(push_id).any(|r| r.state.is_past_added()) {
                return Err(rejected(
                    "stage environment cannot change once requests are past added",
                ));
            }
        }

        let push = self
            .pushes
            .get_mut(&push_id)
            .ok_or(StoreError::NotFound { entity: "push", id: push_id })?;
        edit.apply_to(push);
        Ok(push.clone())
    }

    /// Checklist items of requests merged into a push.
    ///
    /// Pushmasters see every item; anyone else only the open ones.
    pub fn fetch_push_checklist(
        &self,
        push_id: PushId,
        is_pushmaster: bool,
    ) -> StoreResult<Vec<ChecklistItem>> {
        self.push(push_id)?;
        let merged: Vec<RequestId> = self
            .members(push_id)
            .filter(|r| r.state.is_in_push())
            .map(|r| r.id)
            .collect();
        Ok(self
            .checklist
            .values()
            .filter(|item| merged.contains(&item.request))
            .filter(|item| is_pushmaster || !item.complete)
            .cloned()
            .collect())
    }

    /// Set an item's completion
    pub fn toggle_checklist_item(&mut self, item: u64, complete: bool) -> StoreResult<ChecklistItem> {
        let entry = self
            .checklist
            .get_mut(&item)
            .ok_or(StoreError::NotFound { entity: "checklist item", id: item })?;
        entry.complete = complete;
        Ok(entry.clone())
    }

    /// Append a comment
    pub fn comment_request(&mut self, id: RequestId, author: &str, text: &str) -> StoreResult<Request> {
        if text.trim().is_empty() {
            return Err(rejected("comment is empty"));
        }
        let request = self.request_mut(id)?;
        request.append_comment(author, text);
        Ok(request.clone())
    }

    /// Queue a message for delivery
    pub fn notify_users(&mut self, people: &[String], message: &str) -> StoreResult<()> {
        if people.is_empty() {
            return Ok(());
        }
        self.outbox.push(Notification {
            recipients: people.to_vec(),
            message: message.to_string(),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestForm;

    fn fields(title: &str, tags: &str) -> RequestFields {
        RequestForm {
            title: title.to_string(),
            branch: format!("{}_branch", title),
            repo: "main".to_string(),
            tags: tags.to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn setup() -> (Ledger, PushId, RequestId) {
        let mut ledger = Ledger::default();
        let push = ledger.create_push("Morning", "deploy-1", "pm").unwrap().id;
        let request = ledger
            .create_or_update_request(fields("fix", ""), "alice")
            .unwrap()
            .id;
        (ledger, push, request)
    }

    #[test]
    fn test_repeated_transition_is_noop() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Pickme).unwrap();
        let again = ledger.transition_request(push, id, RequestState::Requested, RequestState::Pickme).unwrap();
        assert_eq!(again.state, RequestState::Pickme);
        assert_eq!(again.push, Some(push));
    }

    #[test]
    fn test_stale_expectation_reported() {
        let (mut ledger, push, id) = setup();
        ledger
            .transition_request(push, id, RequestState::Requested, RequestState::Added)
            .unwrap();
        assert!(matches!(
            ledger.transition_request(push, id, RequestState::Requested, RequestState::Pickme),
            Err(StoreError::Stale {
                actual: RequestState::Added,
                ..
            })
        ));
    }

    #[test]
    fn test_bulk_edges_refused_per_request() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Added).unwrap();
        assert!(matches!(
            ledger.transition_request(push, id, RequestState::Added, RequestState::Staged),
            Err(StoreError::Rejected { .. })
        ));
        let staged = ledger
            .advance_push(push, RequestState::Added, RequestState::Staged, PushStatus::DeployedToStage)
            .unwrap();
        assert_eq!(staged.moved, vec![id]);
        assert_eq!(staged.push.status, PushStatus::DeployedToStage);
        assert!(ledger
            .advance_push(push, RequestState::Added, RequestState::Staged, PushStatus::DeployedToStage)
            .unwrap()
            .moved
            .is_empty());
    }

    #[test]
    fn test_advance_applies_nothing_when_status_refused() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Added).unwrap();
        ledger
            .advance_push(push, RequestState::Added, RequestState::Staged, PushStatus::DeployedToStage)
            .unwrap();
        ledger.transition_request(push, id, RequestState::Staged, RequestState::Verified).unwrap();
        ledger
            .advance_push(push, RequestState::Verified, RequestState::Blessed, PushStatus::DeployedToStage)
            .unwrap();
        let late = ledger.create_or_update_request(fields("late", ""), "bob").unwrap().id;
        ledger.transition_request(push, late, RequestState::Requested, RequestState::Added).unwrap();

        assert!(matches!(
            ledger.advance_push(push, RequestState::Blessed, RequestState::Live, PushStatus::Live),
            Err(StoreError::Rejected { .. })
        ));
        assert_eq!(ledger.fetch_request(id).unwrap().state, RequestState::Blessed);
        assert_eq!(ledger.push(push).unwrap().status, PushStatus::DeployedToStage);
    }

    #[test]
    fn test_target_of_another_push_is_stale() {
        let (mut ledger, push, id) = setup();
        let other = ledger.create_push("Evening", "deploy-2", "pm2").unwrap().id;
        ledger.transition_request(other, id, RequestState::Requested, RequestState::Added).unwrap();

        assert!(matches!(
            ledger.transition_request(push, id, RequestState::Requested, RequestState::Added),
            Err(StoreError::Stale {
                expected: RequestState::Requested,
                actual: RequestState::Added,
                ..
            })
        ));
        assert!(matches!(
            ledger.transition_request(push, id, RequestState::Pickme, RequestState::Added),
            Err(StoreError::Stale { .. })
        ));
        assert_eq!(ledger.fetch_request(id).unwrap().push, Some(other));
    }

    #[test]
    fn test_removal_is_logged() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Added).unwrap();
        ledger.advance_push(push, RequestState::Added, RequestState::Staged, PushStatus::DeployedToStage).unwrap();
        let removed = ledger.transition_request(push, id, RequestState::Staged, RequestState::Requested).unwrap();

        assert_eq!(removed.push, None);
        assert_eq!(ledger.removals().len(), 1);
        assert_eq!(ledger.removals()[0].reason, "removal after staged");
        assert_eq!(ledger.removals()[0].pushmaster, "pm");
    }

    #[test]
    fn test_discard_push_releases_members() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Added).unwrap();
        ledger.transition_push(push, PushStatus::Discarded).unwrap();

        let request = ledger.fetch_request(id).unwrap();
        assert_eq!(request.state, RequestState::Requested);
        assert_eq!(request.push, None);
        assert!(ledger.transition_push(push, PushStatus::Open).is_err());
        assert!(matches!(
            ledger.transition_request(push, id, RequestState::Requested, RequestState::Pickme),
            Err(StoreError::Rejected { .. })
        ));
    }

    #[test]
    fn test_live_requires_everything_deployed() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Added).unwrap();
        assert!(ledger.transition_push(push, PushStatus::Live).is_err());
    }

    #[test]
    fn test_stage_env_locked_after_stage() {
        let (mut ledger, push, id) = setup();
        ledger.edit_push(push, PushEdit::stage_env("stagea")).unwrap();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Added).unwrap();
        ledger.advance_push(push, RequestState::Added, RequestState::Staged, PushStatus::DeployedToStage).unwrap();

        assert!(ledger.edit_push(push, PushEdit::stage_env("stageb")).is_err());
        assert!(ledger.edit_push(push, PushEdit::stage_env("stagea")).is_ok());
    }

    #[test]
    fn test_checklist_follows_tags() {
        let (mut ledger, push, _) = setup();
        let tagged = ledger
            .create_or_update_request(fields("plans", "pushplans"), "bob")
            .unwrap();
        ledger.transition_request(push, tagged.id, RequestState::Requested, RequestState::Added).unwrap();
        assert_eq!(ledger.fetch_push_checklist(push, true).unwrap().len(), 2);

        let mut edit = fields("plans", "");
        edit.id = Some(tagged.id);
        ledger.create_or_update_request(edit, "bob").unwrap();
        assert!(ledger.fetch_push_checklist(push, true).unwrap().is_empty());
    }

    #[test]
    fn test_completed_items_hidden_from_others() {
        let (mut ledger, push, _) = setup();
        let tagged = ledger
            .create_or_update_request(fields("plans", "pushplans"), "bob")
            .unwrap();
        ledger.transition_request(push, tagged.id, RequestState::Requested, RequestState::Added).unwrap();
        let first = ledger.fetch_push_checklist(push, true).unwrap()[0].id;
        ledger.toggle_checklist_item(first, true).unwrap();

        assert_eq!(ledger.fetch_push_checklist(push, true).unwrap().len(), 2);
        assert_eq!(ledger.fetch_push_checklist(push, false).unwrap().len(), 1);
    }

    #[test]
    fn test_ledger_survives_json() {
        let (mut ledger, push, id) = setup();
        ledger.transition_request(push, id, RequestState::Requested, RequestState::Pickme).unwrap();
        let json = serde_json::to_string(&ledger).unwrap();
        let restored: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.fetch_request(id).unwrap().state, RequestState::Pickme);
        assert_eq!(restored.list_pushes().len(), 1);
    }
}
