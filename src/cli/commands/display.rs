//! Rendering of pushes, requests and command outcomes.

use crate::cli::RuntimeConfig;
use crate::confirm::{CommandConfirmer, CommandOutcome};
use crate::poller::ChecklistStatus;
use crate::push::{Push, format_involved};
use crate::request::{Request, RequestState};
use crate::session::{PushSession, TransitionReport};
use crate::store::{ChecklistItem, PushStore};

/// Order sections are listed in a push view
const SECTION_ORDER: [RequestState; 9] = [
    RequestState::Pickme,
    RequestState::Requested,
    RequestState::Added,
    RequestState::Staged,
    RequestState::Verified,
    RequestState::Blessed,
    RequestState::Live,
    RequestState::Delayed,
    RequestState::Discarded,
];

pub(super) fn push_line(push: &Push) -> String {
    format!(
        "#{} {} [{}] branch {} by {}",
        push.id, push.title, push.status, push.branch, push.pushmaster
    )
}

pub(super) fn request_line(request: &Request, main_repository: &str) -> String {
    let mut line = format!("#{} {} - {}", request.id, request.title, request.user_string());
    if !request.branch.is_empty() {
        line.push_str(&format!(" ({})", request.cherry_string(main_repository)));
    }
    if !request.tags.is_empty() {
        line.push_str(&format!(" [{}]", request.tags));
    }
    line
}

pub(super) fn show_session<S: PushStore, C: CommandConfirmer>(config: &RuntimeConfig, session: &PushSession<S, C>) {
    let push = session.push();
    let _ = config.output().section(&push_line(push));
    config.println(&format!(
        "Stage environment: {}",
        push.stage_env().unwrap_or("(not set)")
    ));
    if !push.extra_pings.is_empty() {
        config.println(&format!("Extra pings: {}", push.extra_pings.join(", ")));
    }

    let board = session.board();
    let main_repository = &session.settings().main_repository;
    for section in SECTION_ORDER {
        let requests: Vec<&Request> = board.requests_in(section).collect();
        if requests.is_empty() {
            continue;
        }
        config.println(&format!("\n{} ({})", section, requests.len()));
        for request in requests {
            config.indent(&request_line(request, main_repository));
        }
        if section.is_in_push() {
            let users = session.involved_users(section);
            config.indent(&format!("involved: {}", format_involved(&users)));
        }
    }

    let rebuild = session.rebuild_set();
    if !rebuild.is_trivial() {
        config.println(&format!("\nRebuild: {}", rebuild));
    }
}

pub(super) fn checklist(config: &RuntimeConfig, items: &[ChecklistItem]) {
    if items.is_empty() {
        config.println("Checklist is empty");
        return;
    }
    for item in items {
        let mark = if item.complete { "x" } else { " " };
        config.println(&format!(
            "[{}] {:>3}  request #{} {} ({})",
            mark, item.id, item.request, item.kind, item.target
        ));
    }
}

pub(super) fn checklist_status(config: &RuntimeConfig, status: &ChecklistStatus) {
    if let Some(error) = &status.last_error {
        config.warning_println(&format!("Checklist refresh failed: {}", error));
        return;
    }
    if let Some(at) = status.refreshed_at {
        let _ = config.output().section(&format!(
            "Checklist at {} ({} pending)",
            at.format("%H:%M:%S"),
            status.pending()
        ));
    }
    checklist(config, &status.items);
}

pub(super) fn report(config: &RuntimeConfig, action: &str, outcome: CommandOutcome<TransitionReport>) -> i32 {
    match outcome {
        CommandOutcome::Committed(report) => {
            config.success_println(&format!(
                "Recorded {}: {} request(s) moved",
                action,
                report.moved.len()
            ));
            warnings(config, &report.warnings);
            0
        }
        CommandOutcome::Cancelled => {
            config.warning_println(&format!("Cancelled {}; nothing recorded", action));
            0
        }
        CommandOutcome::Skipped => {
            config.println(&format!("Nothing to {}", action));
            0
        }
    }
}

pub(super) fn warnings(config: &RuntimeConfig, warnings: &[String]) {
    for warning in warnings {
        config.warning_println(warning);
    }
}
