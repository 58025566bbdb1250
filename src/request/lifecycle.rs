//! Legal request transitions.
//!
//! The table here is the single source of truth for which state changes a
//! request may undergo. Sessions consult it before calling the store and
//! stores consult it again before applying a write.

use super::{RequestId, RequestState};
use crate::error::TransitionError;
use serde::{Deserialize, Serialize};

use RequestState::*;

/// A named edge of the request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestTransition {
    /// requested -> pickme
    Pickme,
    /// pickme -> requested
    Unpickme,
    /// candidate -> added, via a confirmed merge
    Add,
    /// any merged section up to blessed -> requested
    Remove,
    /// added -> staged, push-level only
    DeployToStage,
    /// staged -> verified
    Verify,
    /// verified -> blessed, push-level only
    DeployToProd,
    /// blessed -> live, push-level only
    Certify,
    /// candidate -> delayed
    Delay,
    /// delayed -> requested
    Undelay,
    /// candidate -> discarded, terminal
    Discard,
}

impl RequestTransition {
    /// All transitions
    pub const ALL: [RequestTransition; 11] = [
        RequestTransition::Pickme,
        RequestTransition::Unpickme,
        RequestTransition::Add,
        RequestTransition::Remove,
        RequestTransition::DeployToStage,
        RequestTransition::Verify,
        RequestTransition::DeployToProd,
        RequestTransition::Certify,
        RequestTransition::Delay,
        RequestTransition::Undelay,
        RequestTransition::Discard,
    ];

    /// States this transition may start from
    pub fn sources(self) -> &'static [RequestState] {
        match self {
            RequestTransition::Pickme => &[Requested],
            RequestTransition::Unpickme => &[Pickme],
            RequestTransition::Add => &[Requested, Pickme],
            RequestTransition::Remove => &[Added, Staged, Verified, Blessed],
            RequestTransition::DeployToStage => &[Added],
            RequestTransition::Verify => &[Staged],
            RequestTransition::DeployToProd => &[Verified],
            RequestTransition::Certify => &[Blessed],
            RequestTransition::Delay => &[Requested, Pickme],
            RequestTransition::Undelay => &[Delayed],
            RequestTransition::Discard => &[Requested, Pickme],
        }
    }

    /// State this transition ends in
    pub fn target(self) -> RequestState {
        match self {
            RequestTransition::Pickme => Pickme,
            RequestTransition::Unpickme
            | RequestTransition::Remove
            | RequestTransition::Undelay => Requested,
            RequestTransition::Add => Added,
            RequestTransition::DeployToStage => Staged,
            RequestTransition::Verify => Verified,
            RequestTransition::DeployToProd => Blessed,
            RequestTransition::Certify => Live,
            RequestTransition::Delay => Delayed,
            RequestTransition::Discard => Discarded,
        }
    }

    /// Applied to a whole section at once by a push-level action
    pub fn is_bulk(self) -> bool {
        matches!(
            self,
            RequestTransition::DeployToStage
                | RequestTransition::DeployToProd
                | RequestTransition::Certify
        )
    }

    /// Irreversible; the operator has to confirm before it is committed
    pub fn requires_confirmation(self) -> bool {
        matches!(
            self,
            RequestTransition::Add
                | RequestTransition::DeployToStage
                | RequestTransition::DeployToProd
                | RequestTransition::Certify
                | RequestTransition::Discard
        )
    }

    /// Whether the transition may start from `from`
    pub fn allows(self, from: RequestState) -> bool {
        self.sources().contains(&from)
    }

    /// Validate the transition for a request currently in `from`
    pub fn check(self, request: RequestId, from: RequestState) -> Result<RequestState, TransitionError> {
        if self.allows(from) {
            Ok(self.target())
        } else {
            Err(TransitionError::NotAllowed {
                request,
                transition: self,
                from,
            })
        }
    }

    /// The transition leading from `from` to `to`, if one exists
    pub fn between(from: RequestState, to: RequestState) -> Option<RequestTransition> {
        Self::ALL
            .into_iter()
            .find(|t| t.target() == to && t.allows(from))
    }

    /// Human-readable verb
    pub fn as_str(self) -> &'static str {
        match self {
            RequestTransition::Pickme => "pickme",
            RequestTransition::Unpickme => "unpickme",
            RequestTransition::Add => "add",
            RequestTransition::Remove => "remove",
            RequestTransition::DeployToStage => "deploy to stage",
            RequestTransition::Verify => "verify",
            RequestTransition::DeployToProd => "deploy to prod",
            RequestTransition::Certify => "certify",
            RequestTransition::Delay => "delay",
            RequestTransition::Undelay => "undelay",
            RequestTransition::Discard => "discard",
        }
    }
}

impl std::fmt::Display for RequestTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestState::*;

    #[test]
    fn test_between_is_unambiguous() {
        for from in RequestState::ALL {
            for to in RequestState::ALL {
                let matching = RequestTransition::ALL
                    .iter()
                    .filter(|t| t.target() == to && t.allows(from))
                    .count();
                assert!(matching <= 1, "{from} -> {to} matched {matching} transitions");
            }
        }
    }

    #[test]
    fn test_remove_allowed_from_every_promoted_section() {
        for from in [Added, Staged, Verified, Blessed] {
            assert_eq!(RequestTransition::Remove.check(1, from), Ok(Requested));
        }
        assert!(RequestTransition::Remove.check(1, Live).is_err());
        assert!(RequestTransition::Remove.check(1, Pickme).is_err());
    }

    #[test]
    fn test_side_states_only_from_candidates() {
        for from in RequestState::ALL {
            let expected = from.is_candidate();
            assert_eq!(RequestTransition::Delay.allows(from), expected);
            assert_eq!(RequestTransition::Discard.allows(from), expected);
        }
    }

    #[test]
    fn test_not_allowed_reports_context() {
        let err = RequestTransition::Verify.check(7, Added).unwrap_err();
        assert_eq!(
            err,
            TransitionError::NotAllowed {
                request: 7,
                transition: RequestTransition::Verify,
                from: Added,
            }
        );
    }

    #[test]
    fn test_bulk_edges() {
        let bulk: Vec<_> = RequestTransition::ALL
            .into_iter()
            .filter(|t| t.is_bulk())
            .collect();
        assert_eq!(
            bulk,
            vec![
                RequestTransition::DeployToStage,
                RequestTransition::DeployToProd,
                RequestTransition::Certify
            ]
        );
        assert_eq!(
            RequestTransition::between(Verified, Blessed),
            Some(RequestTransition::DeployToProd)
        );
        assert_eq!(RequestTransition::between(Requested, Staged), None);
    }
}
