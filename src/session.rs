//! Push session: the context every push operation runs in.
//!
//! A session owns the acknowledged view of one push. Nothing in the view
//! changes until the store has accepted the corresponding write, and every
//! irreversible action goes through the confirm-then-commit protocol.

use crate::config::Settings;
use crate::confirm::{CommandConfirmer, CommandOutcome, ReleaseCommand, run_confirmed_command};
use crate::error::{
    GateViolation, PushError, Result, StoreError, TransitionError, ValidationError,
};
use crate::merge::{MergeSet, MergeSetBuilder};
use crate::notify::{self, RequestEvent};
use crate::poller::ChecklistPoller;
use crate::push::{
    InvolvedUser, Push, PushAction, PushEdit, SectionBoard, SectionCounts, check_stage_env,
    recipients,
};
use crate::request::{PushId, Request, RequestForm, RequestId, RequestState, RequestTransition};
use crate::store::{ChecklistItem, PushStore};
use std::sync::Arc;

/// What a committed transition did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionReport {
    /// Requests moved, in commit order
    pub moved: Vec<RequestId>,
    /// Follow-up failures that did not undo the transition
    pub warnings: Vec<String>,
}

impl TransitionReport {
    fn single(id: RequestId) -> Self {
        Self {
            moved: vec![id],
            warnings: Vec::new(),
        }
    }
}

/// Validate and save a request outside any push view
pub async fn submit_request<S: PushStore>(store: &S, form: &RequestForm, user: &str) -> Result<Request> {
    let fields = form.validate()?;
    let action = match fields.id {
        Some(id) => format!("update request {}", id),
        None => "create request".to_string(),
    };
    let request = store
        .create_or_update_request(fields, user)
        .await
        .map_err(PushError::remote(action))?;
    log::info!("Saved request {} ({})", request.id, request.title);
    Ok(request)
}

/// Create a push owned by `pushmaster`
pub async fn create_push<S: PushStore>(store: &S, title: &str, branch: &str, pushmaster: &str) -> Result<Push> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "title" }.into());
    }
    if branch.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "branch" }.into());
    }
    let push = store
        .create_push(title, branch, pushmaster)
        .await
        .map_err(PushError::remote("create push"))?;
    log::info!("Created push {} on {}", push.id, push.branch);
    Ok(push)
}

/// Append to a request's comment log
pub async fn comment_request<S: PushStore>(store: &S, id: RequestId, author: &str, text: &str) -> Result<Request> {
    if text.trim().is_empty() {
        return Err(ValidationError::MissingField { field: "comment" }.into());
    }
    store
        .comment_request(id, author, text)
        .await
        .map_err(PushError::remote(format!("comment on request {}", id)))
}

/// An operator's view of one push
pub struct PushSession<S, C> {
    confirmer: C,
    ctx: Context<S>,
}

/// Everything a commit continuation may touch
struct Context<S> {
    store: Arc<S>,
    settings: Settings,
    merge: MergeSetBuilder,
    push: Push,
    board: SectionBoard,
}

impl<S: PushStore> Context<S> {
    fn gate(&self, action: PushAction) -> Result<()> {
        action.gate(self.push.status, &self.board.counts())?;
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        let snapshot = self
            .store
            .fetch_push(self.push.id)
            .await
            .map_err(PushError::remote(format!("refresh push {}", self.push.id)))?;
        self.push = snapshot.push;
        self.board.replace_all(snapshot.requests);
        Ok(())
    }

    /// Recorded section of `id`, checked against the transition table
    fn section_for(&self, id: RequestId, transition: RequestTransition) -> Result<RequestState> {
        let from = self.board.section_of(id).ok_or(TransitionError::Conflict {
            request: id,
            expected: transition
                .sources()
                .first()
                .copied()
                .unwrap_or(RequestState::Requested),
            actual: None,
        })?;
        transition.check(id, from)?;
        Ok(from)
    }

    async fn commit_request(
        &mut self,
        id: RequestId,
        from: RequestState,
        transition: RequestTransition,
    ) -> Result<Request> {
        let target = transition.target();
        log::debug!("Request {}: {} -> {}", id, from, target);

        let updated = match self
            .store
            .transition_request(self.push.id, id, from, target)
            .await
        {
            Ok(request) => request,
            Err(StoreError::Stale {
                request,
                expected,
                actual,
            }) => {
                if let Err(e) = self.refresh().await {
                    log::warn!("Could not refresh push {}: {}", self.push.id, e);
                }
                return Err(TransitionError::Conflict {
                    request,
                    expected,
                    actual: Some(actual),
                }
                .into());
            }
            Err(e) => return Err(PushError::remote(format!("{} request {}", transition, id))(e)),
        };

        self.board.move_request(id, from, updated.state)?;
        self.board.insert(updated.clone());
        log::info!("Request {} is now {}", id, updated.state);
        Ok(updated)
    }

    /// Record a push-level action: the section move and the status it
    /// leaves the push in commit together
    async fn commit_bulk(
        &mut self,
        action: PushAction,
        from: RequestState,
        to: RequestState,
    ) -> Result<Vec<RequestId>> {
        let status = action.status_after(self.push.status);
        let advance = self
            .store
            .advance_push(self.push.id, from, to, status)
            .await
            .map_err(PushError::remote(action.as_str()))?;
        if advance.push.status != self.push.status {
            log::info!("Push {} is now {}", self.push.id, advance.push.status);
        }
        self.push = advance.push;

        let ids = advance.moved;
        match self.board.move_many(&ids, from, to) {
            Ok(()) if self.board.count(from) == 0 => {}
            Ok(()) => {
                log::warn!("Push {} view had extra {} requests; refreshing", self.push.id, from);
                self.refresh().await?;
            }
            Err(e) => {
                log::warn!("Push {} view out of date ({}); refreshing", self.push.id, e);
                self.refresh().await?;
            }
        }
        log::info!("Moved {} request(s) from {} to {}", ids.len(), from, to);
        Ok(ids)
    }

    async fn notify(&self, people: Vec<String>, message: String, warnings: &mut Vec<String>) {
        if people.is_empty() {
            return;
        }
        if let Err(e) = self.store.notify_users(&people, &message).await {
            let warning = format!("could not notify {}: {}", people.join(", "), e);
            log::warn!("{}", warning);
            warnings.push(warning);
        }
    }

    async fn notify_requests(&self, event: RequestEvent, ids: &[RequestId], warnings: &mut Vec<String>) {
        for id in ids {
            if let Some(request) = self.board.get(*id) {
                let message = notify::request_message(event, &self.push.pushmaster, &self.push, request);
                self.notify(request.involved_users(), message, warnings).await;
            }
        }
    }

    async fn ping_extra(&self, to_production: bool, warnings: &mut Vec<String>) {
        let message = notify::push_deployed_message(&self.push.pushmaster, to_production);
        self.notify(self.push.extra_pings.clone(), message, warnings).await;
    }

    /// Commit `selected` one request at a time.
    ///
    /// A failure after the first commit still notifies the requests already
    /// moved and returns them in `PushError::Partial`.
    async fn commit_each(
        &mut self,
        selected: Vec<(RequestId, RequestState)>,
        transition: RequestTransition,
        event: RequestEvent,
    ) -> Result<TransitionReport> {
        let mut report = TransitionReport::default();
        for (id, from) in selected {
            if let Err(e) = self.commit_request(id, from, transition).await {
                if report.moved.is_empty() {
                    return Err(e);
                }
                log::warn!(
                    "{} stopped at request {} after {} commit(s): {}",
                    transition,
                    id,
                    report.moved.len(),
                    e
                );
                self.notify_requests(event, &report.moved, &mut report.warnings)
                    .await;
                if let Err(refresh) = self.refresh().await {
                    log::warn!("Could not refresh push {}: {}", self.push.id, refresh);
                }
                return Err(PushError::Partial {
                    action: transition.to_string(),
                    moved: report.moved,
                    source: Box::new(e),
                });
            }
            report.moved.push(id);
        }
        self.notify_requests(event, &report.moved, &mut report.warnings).await;
        Ok(report)
    }

    async fn commit_stage(&mut self) -> Result<TransitionReport> {
        let moved = self
            .commit_bulk(PushAction::DeployToStage, RequestState::Added, RequestState::Staged)
            .await?;
        let mut report = TransitionReport {
            moved,
            warnings: Vec::new(),
        };
        self.notify_requests(RequestEvent::Staged, &report.moved, &mut report.warnings)
            .await;
        self.ping_extra(false, &mut report.warnings).await;
        Ok(report)
    }

    async fn commit_prod(&mut self) -> Result<TransitionReport> {
        let moved = self
            .commit_bulk(PushAction::DeployToProd, RequestState::Verified, RequestState::Blessed)
            .await?;
        let mut report = TransitionReport {
            moved,
            warnings: Vec::new(),
        };
        self.notify_requests(RequestEvent::Blessed, &report.moved, &mut report.warnings)
            .await;
        self.ping_extra(true, &mut report.warnings).await;
        Ok(report)
    }

    async fn commit_certify(&mut self) -> Result<TransitionReport> {
        let moved = self
            .commit_bulk(PushAction::Certify, RequestState::Blessed, RequestState::Live)
            .await?;
        Ok(TransitionReport {
            moved,
            warnings: Vec::new(),
        })
    }

    async fn commit_discard(&mut self) -> Result<TransitionReport> {
        let status = PushAction::Discard.status_after(self.push.status);
        self.push = self
            .store
            .transition_push(self.push.id, status)
            .await
            .map_err(PushError::remote(PushAction::Discard.as_str()))?;
        log::info!("Push {} is now {}", self.push.id, status);

        let mut moved = Vec::new();
        for section in std::iter::once(RequestState::Pickme).chain(RequestState::IN_PUSH) {
            moved.extend(self.board.move_section(section, RequestState::Requested));
        }
        Ok(TransitionReport {
            moved,
            warnings: Vec::new(),
        })
    }
}

impl<S: PushStore, C: CommandConfirmer> PushSession<S, C> {
    /// Open a view of an existing push
    pub async fn open(store: Arc<S>, confirmer: C, settings: Settings, push: PushId) -> Result<Self> {
        let snapshot = store
            .fetch_push(push)
            .await
            .map_err(PushError::remote(format!("open push {}", push)))?;
        log::debug!(
            "Opened push {} with {} request(s)",
            push,
            snapshot.requests.len()
        );
        Ok(Self {
            confirmer,
            ctx: Context {
                merge: MergeSetBuilder::from_settings(&settings),
                store,
                settings,
                push: snapshot.push,
                board: SectionBoard::from_requests(snapshot.requests),
            },
        })
    }

    /// Create a push owned by the acting user and open it
    pub async fn create(
        store: Arc<S>,
        confirmer: C,
        settings: Settings,
        title: &str,
        branch: &str,
    ) -> Result<Self> {
        let push = create_push(&*store, title, branch, &settings.user).await?;
        Self::open(store, confirmer, settings, push.id).await
    }

    /// The push as last acknowledged
    pub fn push(&self) -> &Push {
        &self.ctx.push
    }

    /// Section membership as last acknowledged
    pub fn board(&self) -> &SectionBoard {
        &self.ctx.board
    }

    /// Per-section counts
    pub fn counts(&self) -> SectionCounts {
        self.ctx.board.counts()
    }

    /// Active settings
    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Confirmer prompting for this session
    pub fn confirmer(&self) -> &C {
        &self.confirmer
    }

    /// Backing store
    pub fn store(&self) -> &Arc<S> {
        &self.ctx.store
    }

    /// Whether the acting user owns the push
    pub fn is_pushmaster(&self) -> bool {
        self.ctx.settings.user == self.ctx.push.pushmaster
    }

    /// Re-read the push from the store
    pub async fn refresh(&mut self) -> Result<()> {
        self.ctx.refresh().await
    }

    /// Unique owners and watchers of one section
    pub fn involved_users(&self, section: RequestState) -> Vec<InvolvedUser> {
        self.ctx.board.section_involved_users(section)
    }

    /// Merge set rebuilding the deploy branch with `selected` added
    pub fn merge_set_for(&self, selected: &[RequestId]) -> MergeSet {
        let board = &self.ctx.board;
        let requests = board.in_push().chain(
            selected
                .iter()
                .filter_map(|id| board.get(*id))
                .filter(|r| !r.state.is_in_push()),
        );
        self.ctx.merge.build(requests)
    }

    /// Merge set rebuilding the deploy branch from its current members
    pub fn rebuild_set(&self) -> MergeSet {
        self.ctx.merge.build(self.ctx.board.in_push())
    }

    /// Apply a per-request transition that needs no confirmation
    pub async fn transition(
        &mut self,
        id: RequestId,
        transition: RequestTransition,
    ) -> Result<TransitionReport> {
        if transition.is_bulk()
            || transition.requires_confirmation()
            || transition == RequestTransition::Remove
        {
            return Err(TransitionError::Guarded { transition }.into());
        }
        if transition == RequestTransition::Pickme && !self.ctx.push.status.accepts_requests() {
            return Err(GateViolation::PushStatus {
                action: "pick requests for",
                status: self.ctx.push.status,
            }
            .into());
        }

        let from = self.ctx.section_for(id, transition)?;
        self.ctx.commit_request(id, from, transition).await?;

        let mut report = TransitionReport::single(id);
        match transition {
            RequestTransition::Delay => {
                self.ctx
                    .notify_requests(RequestEvent::Delayed, &[id], &mut report.warnings)
                    .await;
            }
            RequestTransition::Verify if self.ctx.board.count(RequestState::Staged) == 0 => {
                let message = notify::all_verified_message(&self.ctx.push);
                let pushmaster = vec![self.ctx.push.pushmaster.clone()];
                self.ctx.notify(pushmaster, message, &mut report.warnings).await;
            }
            _ => {}
        }
        Ok(report)
    }

    /// requested -> pickme
    pub async fn pickme(&mut self, id: RequestId) -> Result<TransitionReport> {
        self.transition(id, RequestTransition::Pickme).await
    }

    /// pickme -> requested
    pub async fn unpickme(&mut self, id: RequestId) -> Result<TransitionReport> {
        self.transition(id, RequestTransition::Unpickme).await
    }

    /// staged -> verified
    pub async fn verify(&mut self, id: RequestId) -> Result<TransitionReport> {
        self.transition(id, RequestTransition::Verify).await
    }

    /// candidate -> delayed
    pub async fn delay(&mut self, id: RequestId) -> Result<TransitionReport> {
        self.transition(id, RequestTransition::Delay).await
    }

    /// delayed -> requested
    pub async fn undelay(&mut self, id: RequestId) -> Result<TransitionReport> {
        self.transition(id, RequestTransition::Undelay).await
    }

    /// Drop a candidate for good, after confirmation
    pub async fn discard_request(&mut self, id: RequestId) -> Result<CommandOutcome<TransitionReport>> {
        let from = self.ctx.section_for(id, RequestTransition::Discard)?;
        let title = self
            .ctx
            .board
            .get(id)
            .map(|r| r.title.clone())
            .unwrap_or_default();
        let command = ReleaseCommand::DiscardRequest { request: id, title };

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_each(
                vec![(id, from)],
                RequestTransition::Discard,
                RequestEvent::Removed,
            )
            .await
        })
        .await
    }

    /// Merge `ids` into the deploy branch.
    ///
    /// The command rebuilds the branch from every member plus the selection.
    pub async fn add_requests(&mut self, ids: &[RequestId]) -> Result<CommandOutcome<TransitionReport>> {
        self.ctx.gate(PushAction::Merge)?;
        if ids.is_empty() {
            return Ok(CommandOutcome::Skipped);
        }
        let mut selected: Vec<(RequestId, RequestState)> = Vec::new();
        for id in ids {
            let from = self.ctx.section_for(*id, RequestTransition::Add)?;
            if !selected.iter().any(|(seen, _)| seen == id) {
                selected.push((*id, from));
            }
        }
        let command = ReleaseCommand::Merge(self.merge_set_for(ids));

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_each(selected, RequestTransition::Add, RequestEvent::Added)
                .await
        })
        .await
    }

    /// Take `ids` out of the push, rebuilding the branch without them
    pub async fn remove_requests(&mut self, ids: &[RequestId]) -> Result<CommandOutcome<TransitionReport>> {
        self.ctx.gate(PushAction::Remove)?;
        if ids.is_empty() {
            return Ok(CommandOutcome::Skipped);
        }
        let mut selected: Vec<(RequestId, RequestState)> = Vec::new();
        for id in ids {
            let from = self.ctx.section_for(*id, RequestTransition::Remove)?;
            if !selected.iter().any(|(seen, _)| seen == id) {
                selected.push((*id, from));
            }
        }
        let remaining = self
            .ctx
            .board
            .in_push()
            .filter(|r| !ids.contains(&r.id));
        let command = ReleaseCommand::Merge(self.ctx.merge.build(remaining));

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_each(selected, RequestTransition::Remove, RequestEvent::Removed)
                .await
        })
        .await
    }

    /// Show the full rebuild command; nothing is recorded
    pub async fn rebuild(&mut self) -> Result<CommandOutcome<()>> {
        self.ctx.gate(PushAction::Merge)?;
        if self.ctx.board.in_push().next().is_none() {
            return Ok(CommandOutcome::Skipped);
        }
        let command = ReleaseCommand::Merge(self.rebuild_set());
        run_confirmed_command(&self.confirmer, &command, || async { Ok::<(), PushError>(()) }).await
    }

    /// Deploy the branch to stage and mark every added request staged
    pub async fn deploy_to_stage(&mut self) -> Result<CommandOutcome<TransitionReport>> {
        self.ctx.gate(PushAction::DeployToStage)?;
        let stage_env = self
            .ctx
            .push
            .stage_env()
            .ok_or(ValidationError::StageEnvNotSet {
                push: self.ctx.push.id,
            })?
            .to_string();
        let command = ReleaseCommand::DeployStage {
            stage_env,
            branch: self.ctx.push.branch.clone(),
        };

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_stage().await
        })
        .await
    }

    /// Deploy to production and mark every verified request blessed
    pub async fn deploy_to_prod(&mut self) -> Result<CommandOutcome<TransitionReport>> {
        self.ctx.gate(PushAction::DeployToProd)?;
        let stage_env = self
            .ctx
            .push
            .stage_env()
            .ok_or(ValidationError::StageEnvNotSet {
                push: self.ctx.push.id,
            })?
            .to_string();
        let command = ReleaseCommand::DeployProd { stage_env };

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_prod().await
        })
        .await
    }

    /// Merge the deploy branch to master and mark the push live
    pub async fn certify(&mut self) -> Result<CommandOutcome<TransitionReport>> {
        self.ctx.gate(PushAction::Certify)?;
        let command = ReleaseCommand::Certify {
            branch: self.ctx.push.branch.clone(),
        };

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_certify().await
        })
        .await
    }

    /// Delete the deploy branch and abandon the push
    pub async fn discard(&mut self) -> Result<CommandOutcome<TransitionReport>> {
        self.ctx.gate(PushAction::Discard)?;
        let command = ReleaseCommand::DeleteBranch {
            remote: self.ctx.settings.remote.clone(),
            branch: self.ctx.push.branch.clone(),
        };

        let Self { confirmer, ctx } = self;
        run_confirmed_command(&*confirmer, &command, move || async move {
            ctx.commit_discard().await
        })
        .await
    }

    /// Set the stage environment
    pub async fn set_stage_env(&mut self, env: &str) -> Result<()> {
        self.edit_push(PushEdit::stage_env(env)).await
    }

    /// Change title, branch or stage environment
    pub async fn edit_push(&mut self, mut edit: PushEdit) -> Result<()> {
        self.ctx.gate(PushAction::Edit)?;
        if edit.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ValidationError::MissingField { field: "title" }.into());
        }
        if edit.branch.as_deref().is_some_and(|b| b.trim().is_empty()) {
            return Err(ValidationError::MissingField { field: "branch" }.into());
        }
        if let Some(env) = edit.stage_env.take() {
            edit.stage_env = Some(check_stage_env(&self.ctx.push, &self.ctx.board.counts(), &env)?);
        }

        self.ctx.push = self
            .ctx
            .store
            .edit_push(self.ctx.push.id, edit)
            .await
            .map_err(PushError::remote(format!("edit push {}", self.ctx.push.id)))?;
        log::info!("Edited push {}", self.ctx.push.id);
        Ok(())
    }

    /// Validate and save a request, tracking it if this view shows it
    pub async fn create_or_update_request(&mut self, form: &RequestForm) -> Result<Request> {
        let request = submit_request(&*self.ctx.store, form, &self.ctx.settings.user).await?;
        let shown = match request.push {
            Some(push) => push == self.ctx.push.id,
            None => matches!(request.state, RequestState::Requested | RequestState::Delayed),
        };
        if shown {
            self.ctx.board.insert(request.clone());
        }
        Ok(request)
    }

    /// Append to a request's comment log
    pub async fn comment_request(&mut self, id: RequestId, text: &str) -> Result<Request> {
        let request = comment_request(&*self.ctx.store, id, &self.ctx.settings.user, text).await?;
        if self.ctx.board.get(id).is_some() {
            self.ctx.board.insert(request.clone());
        }
        Ok(request)
    }

    /// Message the owners and watchers of one section
    pub async fn message_section(&self, section: RequestState, text: &str) -> Result<Vec<String>> {
        let users = self.ctx.board.section_involved_users(section);
        self.send_message(&users, text, &format!("message {} users", section))
            .await
    }

    /// Message the owners and watchers of every merged request
    pub async fn message_all(&self, text: &str) -> Result<Vec<String>> {
        let users = self.ctx.board.all_involved_users();
        self.send_message(&users, text, "message push users").await
    }

    async fn send_message(&self, users: &[InvolvedUser], text: &str, action: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "message" }.into());
        }
        let people = recipients(users);
        if people.is_empty() {
            return Ok(people);
        }
        self.ctx
            .store
            .notify_users(&people, text.trim())
            .await
            .map_err(PushError::remote(action))?;
        Ok(people)
    }

    /// Current checklist
    pub async fn checklist(&self) -> Result<Vec<ChecklistItem>> {
        self.ctx
            .store
            .fetch_push_checklist(self.ctx.push.id, self.is_pushmaster())
            .await
            .map_err(PushError::remote("fetch checklist"))
    }

    /// Tick a checklist item on or off
    pub async fn toggle_checklist_item(&self, item: u64, complete: bool) -> Result<ChecklistItem> {
        self.ctx
            .store
            .toggle_checklist_item(item, complete)
            .await
            .map_err(PushError::remote(format!("toggle checklist item {}", item)))
    }
}

impl<S, C> PushSession<S, C>
where
    S: PushStore + Send + Sync + 'static,
    C: CommandConfirmer,
{
    /// Start refreshing this push's checklist in the background
    pub fn start_checklist_poller(&self) -> ChecklistPoller {
        ChecklistPoller::start(
            Arc::clone(&self.ctx.store),
            self.ctx.push.id,
            self.is_pushmaster(),
            self.ctx.settings.checklist_interval(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::ScriptedConfirmer;
    use crate::push::PushStatus;
    use crate::store::InMemoryStore;

    async fn submit(store: &InMemoryStore, title: &str, branch: &str, repo: &str) -> RequestId {
        let form = RequestForm {
            title: title.to_string(),
            branch: branch.to_string(),
            repo: repo.to_string(),
            ..Default::default()
        };
        submit_request(store, &form, "alice").await.unwrap().id
    }

    #[tokio::test]
    async fn test_add_rebuilds_from_every_member() {
        let store = Arc::new(InMemoryStore::new());
        let push = create_push(&*store, "p", "deploy", "pm").await.unwrap().id;
        let first = submit(&store, "one", "one", "main").await;
        let second = submit(&store, "two", "two", "bob").await;
        let settings = Settings {
            user: "pm".to_string(),
            ..Settings::default()
        };
        let mut session = PushSession::open(store, ScriptedConfirmer::always_confirm(), settings, push)
            .await
            .unwrap();

        session.add_requests(&[first]).await.unwrap();
        assert_eq!(session.merge_set_for(&[second]).render(), "merge-branches one bob/two");
        assert_eq!(session.rebuild_set().render(), "merge-branches one");
        assert!(session.is_pushmaster());
    }

    #[tokio::test]
    async fn test_empty_selection_skips_prompt() {
        let store = Arc::new(InMemoryStore::new());
        let push = create_push(&*store, "p", "deploy", "pm").await.unwrap().id;
        let mut session = PushSession::open(
            store,
            ScriptedConfirmer::always_confirm(),
            Settings::default(),
            push,
        )
        .await
        .unwrap();

        assert_eq!(session.add_requests(&[]).await.unwrap(), CommandOutcome::Skipped);
        assert_eq!(session.rebuild().await.unwrap(), CommandOutcome::Skipped);
        assert!(session.confirmer().shown().is_empty());
    }

    #[tokio::test]
    async fn test_pickme_refused_once_live() {
        let store = Arc::new(InMemoryStore::new());
        let push = create_push(&*store, "p", "deploy", "pm").await.unwrap().id;
        let id = submit(&store, "one", "one", "main").await;
        store.transition_push(push, PushStatus::Live).await.unwrap();
        let mut session = PushSession::open(
            store,
            ScriptedConfirmer::always_cancel(),
            Settings::default(),
            push,
        )
        .await
        .unwrap();

        let err = session.pickme(id).await.unwrap_err();
        assert!(matches!(
            err,
            PushError::Gate(GateViolation::PushStatus { .. })
        ));
    }
}
