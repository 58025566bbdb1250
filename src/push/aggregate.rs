//! Push-level actions and the gates that guard them.
//!
//! Every bulk section move is reachable only through one of these actions.
//! Gates are pure checks over the push status and the acknowledged section
//! counts, so they run before any command is shown to the operator.

use super::{Push, PushStatus, SectionCounts};
use crate::error::{GateViolation, Result, ValidationError};
use crate::request::RequestState;

/// Actions that operate on a push as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    /// Merge selected requests into the deploy branch
    Merge,
    /// Remove requests from the push
    Remove,
    /// Deploy the deploy branch to the stage environment
    DeployToStage,
    /// Deploy verified work to production
    DeployToProd,
    /// Merge the deploy branch to master and mark the push live
    Certify,
    /// Delete the deploy branch and abandon the push
    Discard,
    /// Change title, branch or stage environment
    Edit,
}

impl PushAction {
    /// Verb used in messages
    pub fn as_str(self) -> &'static str {
        match self {
            PushAction::Merge => "merge requests into",
            PushAction::Remove => "remove requests from",
            PushAction::DeployToStage => "deploy to stage",
            PushAction::DeployToProd => "deploy to production",
            PushAction::Certify => "certify",
            PushAction::Discard => "discard",
            PushAction::Edit => "edit",
        }
    }

    /// Status the push holds once this action commits
    pub fn status_after(self, current: PushStatus) -> PushStatus {
        match (self, current) {
            (PushAction::DeployToStage, PushStatus::Open) => PushStatus::DeployedToStage,
            (PushAction::Certify, _) => PushStatus::Live,
            (PushAction::Discard, _) => PushStatus::Discarded,
            (_, status) => status,
        }
    }

    /// Check the action against push status and section counts
    pub fn gate(self, status: PushStatus, counts: &SectionCounts) -> std::result::Result<(), GateViolation> {
        if !status.accepts_requests() {
            return Err(GateViolation::PushStatus {
                action: self.as_str(),
                status,
            });
        }

        match self {
            PushAction::DeployToProd => {
                let added = counts.get(RequestState::Added);
                if added > 0 {
                    return Err(GateViolation::UnstagedRequests { count: added });
                }
                let staged = counts.get(RequestState::Staged);
                if staged > 0 {
                    return Err(GateViolation::UnverifiedRequests { count: staged });
                }
            }
            PushAction::Certify => {
                for section in [RequestState::Added, RequestState::Staged, RequestState::Verified] {
                    let count = counts.get(section);
                    if count > 0 {
                        return Err(GateViolation::UndeployedRequests { section, count });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl std::fmt::Display for PushAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a new stage environment for a push.
///
/// The value must be non-empty and can only change while the push accepts
/// requests and nothing has been promoted past added.
pub fn check_stage_env(push: &Push, counts: &SectionCounts, env: &str) -> Result<String> {
    let env = env.trim();
    if env.is_empty() {
        return Err(ValidationError::EmptyStageEnv.into());
    }
    PushAction::Edit.gate(push.status, counts)?;

    if env != push.stage_env {
        let promoted: usize = counts
            .iter()
            .filter(|(section, _)| section.is_past_added())
            .map(|(_, n)| n)
            .sum();
        if promoted > 0 {
            return Err(GateViolation::StageEnvLocked { count: promoted }.into());
        }
    }
    Ok(env.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PushError;
    use crate::push::SectionBoard;
    use crate::request::{Request, RequestFields, TagSet};

    fn board(states: &[RequestState]) -> SectionCounts {
        let requests: Vec<Request> = states
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let mut r = RequestFields {
                    id: None,
                    title: "t".to_string(),
                    branch: "b".to_string(),
                    repo: "main".to_string(),
                    review_id: None,
                    tags: TagSet::default(),
                    comments: String::new(),
                    description: String::new(),
                    watchers: Vec::new(),
                    takeover: false,
                }
                .into_request(i as u64, "u");
                r.state = *state;
                r
            })
            .collect();
        SectionBoard::from_requests(requests).counts()
    }

    #[test]
    fn test_prod_refused_with_single_added() {
        let counts = board(&[RequestState::Added]);
        assert_eq!(
            PushAction::DeployToProd.gate(PushStatus::DeployedToStage, &counts),
            Err(GateViolation::UnstagedRequests { count: 1 })
        );
    }

    #[test]
    fn test_prod_refused_with_staged_regardless_of_verified() {
        let counts = board(&[
            RequestState::Staged,
            RequestState::Verified,
            RequestState::Verified,
            RequestState::Blessed,
        ]);
        assert_eq!(
            PushAction::DeployToProd.gate(PushStatus::DeployedToStage, &counts),
            Err(GateViolation::UnverifiedRequests { count: 1 })
        );
    }

    #[test]
    fn test_prod_allowed_with_only_verified_and_candidates() {
        let counts = board(&[
            RequestState::Verified,
            RequestState::Requested,
            RequestState::Pickme,
        ]);
        assert!(PushAction::DeployToProd
            .gate(PushStatus::DeployedToStage, &counts)
            .is_ok());
    }

    #[test]
    fn test_certify_refused_until_everything_blessed() {
        for blocking in [RequestState::Added, RequestState::Staged, RequestState::Verified] {
            let counts = board(&[RequestState::Blessed, blocking]);
            assert_eq!(
                PushAction::Certify.gate(PushStatus::DeployedToStage, &counts),
                Err(GateViolation::UndeployedRequests {
                    section: blocking,
                    count: 1
                })
            );
        }
        let counts = board(&[RequestState::Blessed, RequestState::Pickme]);
        assert!(PushAction::Certify
            .gate(PushStatus::DeployedToStage, &counts)
            .is_ok());
    }

    #[test]
    fn test_terminal_push_refuses_everything() {
        let counts = SectionCounts::default();
        for status in [PushStatus::Live, PushStatus::Discarded] {
            assert!(matches!(
                PushAction::DeployToStage.gate(status, &counts),
                Err(GateViolation::PushStatus { .. })
            ));
        }
    }

    #[test]
    fn test_status_after() {
        assert_eq!(
            PushAction::DeployToStage.status_after(PushStatus::Open),
            PushStatus::DeployedToStage
        );
        assert_eq!(
            PushAction::DeployToStage.status_after(PushStatus::DeployedToStage),
            PushStatus::DeployedToStage
        );
        assert_eq!(
            PushAction::Merge.status_after(PushStatus::DeployedToStage),
            PushStatus::DeployedToStage
        );
        assert_eq!(PushAction::Certify.status_after(PushStatus::DeployedToStage), PushStatus::Live);
    }

    #[test]
    fn test_stage_env_rules() {
        let push = Push::new(1, "p", "deploy", "pm");
        let empty = SectionCounts::default();
        assert!(matches!(
            check_stage_env(&push, &empty, "  "),
            Err(PushError::Validation(ValidationError::EmptyStageEnv))
        ));
        assert_eq!(check_stage_env(&push, &empty, "stage-b").unwrap(), "stage-b");

        let staged = board(&[RequestState::Staged]);
        assert!(matches!(
            check_stage_env(&push, &staged, "stage-b"),
            Err(PushError::Gate(GateViolation::StageEnvLocked { count: 1 }))
        ));
    }
}
