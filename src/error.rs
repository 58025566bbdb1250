//! Error types for push coordination.
//!
//! Every failure path ends in a typed error with an actionable message:
//! validation and gate errors are raised locally before any store call,
//! remote failures always name the action that failed.

use crate::push::PushStatus;
use crate::request::{RequestId, RequestState, RequestTransition};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for push operations
pub type Result<T> = std::result::Result<T, PushError>;

/// Main error type for all push operations
#[derive(Error, Debug)]
pub enum PushError {
    /// Malformed input rejected before any store call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A push-level action blocked by its precondition
    #[error("Blocked: {0}")]
    Gate(#[from] GateViolation),

    /// Request transition refused or raced by another operator
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// The store call committing a confirmed action failed
    #[error("{action} failed: {source}")]
    Remote {
        /// Action that was being committed
        action: String,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },

    /// A multi-request commit stopped partway; the `moved` requests stay committed
    #[error("{action} stopped after {} request(s): {source}", .moved.len())]
    Partial {
        /// Action that was being committed
        action: String,
        /// Requests committed before the failure
        moved: Vec<RequestId>,
        /// Failure that stopped the commit
        #[source]
        source: Box<PushError>,
    },

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings file parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Review id is not all digits
    #[error("Invalid review # '{value}' - only integer review ids are allowed")]
    InvalidReviewId {
        /// Rejected input
        value: String,
    },

    /// A translation-only request names a branch
    #[error("Requests tagged l10n-only cannot have a branch (got '{branch}')")]
    L10nOnlyWithBranch {
        /// Offending branch
        branch: String,
    },

    /// Required field left empty
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name
        field: &'static str,
    },

    /// Stage environment set to an empty value
    #[error("Stage environment cannot be empty")]
    EmptyStageEnv,

    /// Stage deploy requested before a stage environment was chosen
    #[error("Push {push} has no stage environment; set one before deploying to stage")]
    StageEnvNotSet {
        /// Push id
        push: u64,
    },

    /// State name not recognized
    #[error("Unknown state '{value}'")]
    UnknownState {
        /// Rejected input
        value: String,
    },
}

/// A push-level action refused by its gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateViolation {
    /// Prod deploy with added requests still unstaged
    #[error(
        "There are {count} added request(s) which have not been staged. You must either stage or remove them."
    )]
    UnstagedRequests {
        /// Requests in the added section
        count: usize,
    },

    /// Prod deploy with staged requests still unverified
    #[error(
        "There are {count} staged request(s) which have not been verified. You must either verify or remove them."
    )]
    UnverifiedRequests {
        /// Requests in the staged section
        count: usize,
    },

    /// Certify with requests not yet deployed to production
    #[error(
        "There are {count} {section} request(s) which have not been deployed. You must either remove or deploy them."
    )]
    UndeployedRequests {
        /// First blocking section
        section: RequestState,
        /// Requests in that section
        count: usize,
    },

    /// Action not accepted in the push's current status
    #[error("Cannot {action} a push that is {status}")]
    PushStatus {
        /// Attempted action
        action: &'static str,
        /// Current status
        status: PushStatus,
    },

    /// Stage environment frozen once requests went past added
    #[error(
        "Stage environment is locked: {count} request(s) already promoted past added"
    )]
    StageEnvLocked {
        /// Requests in staged or later sections
        count: usize,
    },
}

/// Request transition errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Recorded section differs from the caller's expectation
    #[error(
        "Invalid transition for request {request}: expected it in {expected}, found {}. Refresh the push and retry.",
        display_section(.actual)
    )]
    Conflict {
        /// Request id
        request: RequestId,
        /// Section the caller believed the request was in
        expected: RequestState,
        /// Section actually recorded
        actual: Option<RequestState>,
    },

    /// Transition not legal from the current state
    #[error("Cannot {transition} request {request} while it is {from}")]
    NotAllowed {
        /// Request id
        request: RequestId,
        /// Attempted transition
        transition: RequestTransition,
        /// Current state
        from: RequestState,
    },

    /// Transition that has to go through its confirmed or push-level action
    #[error("{transition} can only be applied through its confirmed push action")]
    Guarded {
        /// Attempted transition
        transition: RequestTransition,
    },
}

fn display_section(section: &Option<RequestState>) -> String {
    match section {
        Some(state) => state.to_string(),
        None => "no section".to_string(),
    }
}

/// Failures reported by the backing store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Entity does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Entity id
        id: u64,
    },

    /// Store refused the write
    #[error("rejected: {reason}")]
    Rejected {
        /// Reason for the rejection
        reason: String,
    },

    /// Request was no longer where the caller expected it
    #[error("request {request} is {actual}, expected {expected}")]
    Stale {
        /// Request id
        request: RequestId,
        /// Section the caller expected
        expected: RequestState,
        /// Section recorded by the store
        actual: RequestState,
    },

    /// Store could not be reached
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Reason for the error
        reason: String,
    },

    /// Persistence layer failure
    #[error(transparent)]
    State(#[from] StateError),
}

/// State file persistence errors
#[derive(Error, Debug)]
pub enum StateError {
    /// State file corrupted
    #[error("State file corrupted: {reason}")]
    Corrupted {
        /// Reason for the error
        reason: String,
    },

    /// Failed to save state
    #[error("Failed to save state: {reason}")]
    SaveFailed {
        /// Reason for the error
        reason: String,
    },

    /// Failed to load state
    #[error("Failed to load state from {path}: {reason}")]
    LoadFailed {
        /// State file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Lock held by another process past the timeout
    #[error("Timed out waiting for state lock {path}")]
    LockTimeout {
        /// Lock file path
        path: PathBuf,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl PushError {
    /// Wrap a store failure, naming the action it belonged to
    pub fn remote(action: impl Into<String>) -> impl FnOnce(StoreError) -> PushError {
        let action = action.into();
        move |source| PushError::Remote { action, source }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PushError::Validation(ValidationError::InvalidReviewId { .. }) => vec![
                "Enter the numeric review id only, or leave it empty".to_string(),
            ],
            PushError::Validation(ValidationError::L10nOnlyWithBranch { .. }) => vec![
                "Clear the branch field for translation-only requests".to_string(),
                "Or tag the request l10n instead of l10n-only".to_string(),
            ],
            PushError::Validation(ValidationError::StageEnvNotSet { push }) => vec![format!(
                "Set one first: pushmanager push stage-env {} <env>",
                push
            )],
            PushError::Gate(GateViolation::UnstagedRequests { .. }) => vec![
                "Deploy the push to stage, or remove the added requests".to_string(),
            ],
            PushError::Gate(GateViolation::UnverifiedRequests { .. }) => vec![
                "Verify the staged requests on stage, or remove them".to_string(),
            ],
            PushError::Gate(GateViolation::UndeployedRequests { .. }) => vec![
                "Deploy remaining requests to production, or remove them".to_string(),
            ],
            PushError::Transition(TransitionError::Conflict { .. }) => vec![
                "Another operator changed this push; run 'pushmanager push show' and retry"
                    .to_string(),
            ],
            PushError::Remote { action, .. } => vec![
                format!("Nothing was recorded for '{}'; retry the action", action),
                "Check that the state file is readable and not locked".to_string(),
            ],
            PushError::Partial { moved, source, .. } => {
                let ids: Vec<String> = moved.iter().map(|id| format!("#{}", id)).collect();
                let mut suggestions = vec![format!(
                    "Request(s) {} were recorded; retry with the rest only",
                    ids.join(", ")
                )];
                suggestions.extend(source.recovery_suggestions());
                suggestions
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable by retrying or correcting input
    pub fn is_recoverable(&self) -> bool {
        if let PushError::Partial { source, .. } = self {
            return source.is_recoverable();
        }
        !matches!(
            self,
            PushError::Gate(GateViolation::PushStatus { .. })
                | PushError::Remote {
                    source: StoreError::State(StateError::Corrupted { .. }),
                    ..
                }
        )
    }
}
