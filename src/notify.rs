//! Messages sent to involved users after a transition commits.

use crate::push::Push;
use crate::request::Request;

/// Event a request owner is told about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    /// Accepted into a push
    Added,
    /// Removed from a push
    Removed,
    /// Deployed to stage
    Staged,
    /// Deployed to production
    Blessed,
    /// Delayed by the pushmaster
    Delayed,
}

/// Message for a request's owner and watchers
pub fn request_message(event: RequestEvent, pushmaster: &str, push: &Push, request: &Request) -> String {
    let who = request.user_string();
    let title = &request.title;
    match event {
        RequestEvent::Added => format!(
            "{} has accepted request \"{}\" for {} into push {} ({})",
            pushmaster, title, who, push.id, push.title
        ),
        RequestEvent::Removed => format!(
            "{} has removed request \"{}\" for {} from push {}",
            pushmaster, title, who, push.id
        ),
        RequestEvent::Staged => format!(
            "{} has deployed request \"{}\" for {} to stage.\nPlease verify it on {} (push {})",
            pushmaster,
            title,
            who,
            push.stage_env().unwrap_or("stage"),
            push.id
        ),
        RequestEvent::Blessed => format!(
            "{} has deployed request \"{}\" for {} to production.",
            pushmaster, title, who
        ),
        RequestEvent::Delayed => format!(
            "Request \"{}\" for {} has been marked as delayed by {}, and will not be accepted into pushes until it is marked as requested again.",
            title, who, pushmaster
        ),
    }
}

/// Message for the extra pings of a push after a deploy
pub fn push_deployed_message(pushmaster: &str, to_production: bool) -> String {
    let target = if to_production { "production" } else { "stage" };
    format!("{} has deployed a push to {}.", pushmaster, target)
}

/// Message to the pushmaster once nothing staged is left unverified
pub fn all_verified_message(push: &Push) -> String {
    format!(
        "All currently staged requests in push {} ({}) have been marked as verified.",
        push.id, push.title
    )
}
