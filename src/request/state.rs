//! Request lifecycle states.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of a request.
///
/// Exactly one state holds at any time. The declaration order follows the
/// lifecycle ordering used for gating, with the two side states last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Proposed, not yet a push member
    Requested,
    /// Marked as a priority candidate for a push
    Pickme,
    /// Merged into the push's deploy branch
    Added,
    /// Deployed to the stage environment
    Staged,
    /// Manually checked on stage
    Verified,
    /// Deployed to production
    Blessed,
    /// Merged to master and certified
    Live,
    /// Held back from push candidacy
    Delayed,
    /// Terminally dropped
    Discarded,
}

impl RequestState {
    /// All states, in declaration order
    pub const ALL: [RequestState; 9] = [
        RequestState::Requested,
        RequestState::Pickme,
        RequestState::Added,
        RequestState::Staged,
        RequestState::Verified,
        RequestState::Blessed,
        RequestState::Live,
        RequestState::Delayed,
        RequestState::Discarded,
    ];

    /// Sections that hold merged work (the deploy branch contents)
    pub const IN_PUSH: [RequestState; 5] = [
        RequestState::Added,
        RequestState::Staged,
        RequestState::Verified,
        RequestState::Blessed,
        RequestState::Live,
    ];

    /// Wire name of the state
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Requested => "requested",
            RequestState::Pickme => "pickme",
            RequestState::Added => "added",
            RequestState::Staged => "staged",
            RequestState::Verified => "verified",
            RequestState::Blessed => "blessed",
            RequestState::Live => "live",
            RequestState::Delayed => "delayed",
            RequestState::Discarded => "discarded",
        }
    }

    /// Position in the lifecycle ordering; `None` for the side states
    pub fn rank(self) -> Option<u8> {
        match self {
            RequestState::Requested | RequestState::Pickme => Some(0),
            RequestState::Added => Some(1),
            RequestState::Staged => Some(2),
            RequestState::Verified => Some(3),
            RequestState::Blessed => Some(4),
            RequestState::Live => Some(5),
            RequestState::Delayed | RequestState::Discarded => None,
        }
    }

    /// Candidate for a push, not merged yet
    pub fn is_candidate(self) -> bool {
        matches!(self, RequestState::Requested | RequestState::Pickme)
    }

    /// Merged into the deploy branch (added through live)
    pub fn is_in_push(self) -> bool {
        Self::IN_PUSH.contains(&self)
    }

    /// Belongs to a push: pickme or any merged section
    pub fn is_push_member(self) -> bool {
        self == RequestState::Pickme || self.is_in_push()
    }

    /// Promoted past added (staged and later)
    pub fn is_past_added(self) -> bool {
        self.rank().is_some_and(|rank| rank > 1)
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or(ValidationError::UnknownState {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_ordering() {
        let ranks: Vec<u8> = RequestState::IN_PUSH
            .iter()
            .filter_map(|s| s.rank())
            .collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        assert_eq!(RequestState::Requested.rank(), RequestState::Pickme.rank());
        assert_eq!(RequestState::Delayed.rank(), None);
    }

    #[test]
    fn test_membership_predicates() {
        assert!(RequestState::Pickme.is_push_member());
        assert!(!RequestState::Pickme.is_in_push());
        assert!(!RequestState::Requested.is_push_member());
        assert!(!RequestState::Added.is_past_added());
        assert!(RequestState::Staged.is_past_added());
        assert!(!RequestState::Delayed.is_past_added());
    }

    #[test]
    fn test_parse_state() {
        assert_eq!("Verified".parse::<RequestState>(), Ok(RequestState::Verified));
        assert!("merged".parse::<RequestState>().is_err());
    }
}
